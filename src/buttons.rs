//! The four keys on the HAT, read with rppal edge interrupts.
//!
//! Interrupt callbacks run on rppal's own thread; they only translate the key
//! into a [`ButtonAction`] and hand it to the controller over a channel.

use anyhow::Context;
use log::{debug, info};
use paper_clock_lib::app::ButtonAction;
use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use tokio::sync::mpsc::UnboundedSender;

/// Keeps the interrupt registrations alive; dropping it disarms the keys.
pub struct Buttons {
    _pins: Vec<InputPin>,
}

impl Buttons {
    /// Arm one interrupt per bound key. `pins` are BCM numbers, top key first.
    pub fn listen(pins: &[u8], actions: UnboundedSender<ButtonAction>) -> anyhow::Result<Self> {
        let gpio = Gpio::new().context("open GPIO for buttons")?;
        let mut armed = Vec::new();

        for (index, &bcm) in pins.iter().enumerate() {
            let Some(action) = ButtonAction::for_key(index) else {
                debug!("Key {} (GPIO {}) unbound", index + 1, bcm);
                continue;
            };
            let mut pin = gpio
                .get(bcm)
                .with_context(|| format!("GPIO {bcm} for key {}", index + 1))?
                .into_input_pullup();
            let tx = actions.clone();
            pin.set_async_interrupt(Trigger::FallingEdge, move |_level: Level| {
                // receiver gone means we are shutting down
                let _ = tx.send(action);
            })
            .with_context(|| format!("interrupt on GPIO {bcm}"))?;
            info!("Key {} on GPIO {} -> {:?}", index + 1, bcm, action);
            armed.push(pin);
        }

        Ok(Self { _pins: armed })
    }
}
