//! Waveshare 2.7" B/W/Red V2 driver
//!
//! Command-level driver for the SSD1680-class controller on the 2.7" B V2
//! panel (176x264, portrait). It follows the Waveshare reference sequence:
//! hardware reset, software reset, RAM window setup, then black RAM (0x24)
//! and red RAM (0x26) uploads and a full refresh (0x22/0x20).
//!
//! The bus and pins are traits so the same driver runs over Linux spidev and
//! GPIO character devices on the Pi, and over recording mocks in tests.

use crate::display::Panel;
use crate::surface::{PANEL_HEIGHT, PANEL_WIDTH};
use log::{debug, warn};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Bytes per physical row.
const ROW_BYTES: usize = PANEL_WIDTH.div_ceil(8) as usize;
/// Bytes per plane.
pub const BUFFER_SIZE: usize = ROW_BYTES * PANEL_HEIGHT as usize;

/// A full refresh takes ~15 s; anything much longer means the panel is stuck.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
const BUSY_POLL: Duration = Duration::from_millis(10);

mod cmd {
    pub const DRIVER_OUTPUT: u8 = 0x01;
    pub const DEEP_SLEEP: u8 = 0x10;
    pub const DATA_ENTRY_MODE: u8 = 0x11;
    pub const SW_RESET: u8 = 0x12;
    pub const TEMPERATURE_SENSOR: u8 = 0x18;
    pub const MASTER_ACTIVATION: u8 = 0x20;
    pub const UPDATE_CONTROL_2: u8 = 0x22;
    pub const WRITE_BLACK: u8 = 0x24;
    pub const WRITE_RED: u8 = 0x26;
    pub const BORDER_WAVEFORM: u8 = 0x3C;
    pub const RAM_X_RANGE: u8 = 0x44;
    pub const RAM_Y_RANGE: u8 = 0x45;
    pub const RAM_X_COUNTER: u8 = 0x4E;
    pub const RAM_Y_COUNTER: u8 = 0x4F;
}

#[derive(Error, Debug)]
pub enum EpdError {
    #[error("SPI: {0}")]
    Spi(String),

    #[error("GPIO: {0}")]
    Gpio(String),

    #[error("panel still busy after {0:?}")]
    BusyTimeout(Duration),

    #[error("frame buffer is {got} bytes, expected {expected}")]
    BufferSize { expected: usize, got: usize },
}

/// Write-only SPI bus; chip select is handled by the bus.
pub trait SpiWrite {
    fn write(&mut self, data: &[u8]) -> Result<(), EpdError>;
}

pub trait OutputPin {
    fn set_high(&mut self) -> Result<(), EpdError>;
    fn set_low(&mut self) -> Result<(), EpdError>;
}

pub trait InputPin {
    fn is_high(&self) -> Result<bool, EpdError>;
}

/// 2.7" B V2 panel on `spi` with data/command, reset and busy lines.
pub struct Epd2in7bV2<SPI, DC, RST, BUSY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    busy_timeout: Duration,
    reset_delay: Duration,
}

impl<SPI, DC, RST, BUSY> Epd2in7bV2<SPI, DC, RST, BUSY>
where
    SPI: SpiWrite,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
{
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            busy_timeout: BUSY_TIMEOUT,
            reset_delay: Duration::from_millis(200),
        }
    }

    /// Override the busy wait limit and the reset pulse timing.
    pub fn with_timing(mut self, busy_timeout: Duration, reset_delay: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self.reset_delay = reset_delay;
        self
    }

    fn reset(&mut self) -> Result<(), EpdError> {
        self.rst.set_high()?;
        thread::sleep(self.reset_delay);
        self.rst.set_low()?;
        thread::sleep(Duration::from_millis(2));
        self.rst.set_high()?;
        thread::sleep(self.reset_delay);
        Ok(())
    }

    fn command(&mut self, command: u8) -> Result<(), EpdError> {
        self.dc.set_low()?;
        self.spi.write(&[command])
    }

    fn data(&mut self, data: &[u8]) -> Result<(), EpdError> {
        self.dc.set_high()?;
        self.spi.write(data)
    }

    fn command_with(&mut self, command: u8, data: &[u8]) -> Result<(), EpdError> {
        self.command(command)?;
        self.data(data)
    }

    /// Busy is active high on this controller.
    fn wait_until_idle(&mut self) -> Result<(), EpdError> {
        let start = Instant::now();
        while self.busy.is_high()? {
            if start.elapsed() > self.busy_timeout {
                warn!("EPD busy for more than {:?}", self.busy_timeout);
                return Err(EpdError::BusyTimeout(self.busy_timeout));
            }
            thread::sleep(BUSY_POLL);
        }
        debug!("EPD idle after {:?}", start.elapsed());
        Ok(())
    }

    fn check_size(buffer: &[u8]) -> Result<(), EpdError> {
        if buffer.len() != BUFFER_SIZE {
            return Err(EpdError::BufferSize {
                expected: BUFFER_SIZE,
                got: buffer.len(),
            });
        }
        Ok(())
    }

    pub fn init(&mut self) -> Result<(), EpdError> {
        debug!("EPD init");
        self.reset()?;
        self.wait_until_idle()?;
        self.command(cmd::SW_RESET)?;
        self.wait_until_idle()?;

        let last_row = (PANEL_HEIGHT - 1) as u16;
        let [row_lo, row_hi] = last_row.to_le_bytes();
        self.command_with(cmd::DRIVER_OUTPUT, &[row_lo, row_hi, 0x00])?;
        self.command_with(cmd::DATA_ENTRY_MODE, &[0x03])?;
        self.command_with(cmd::RAM_X_RANGE, &[0x00, (ROW_BYTES - 1) as u8])?;
        self.command_with(cmd::RAM_Y_RANGE, &[0x00, 0x00, row_lo, row_hi])?;
        self.command_with(cmd::BORDER_WAVEFORM, &[0x05])?;
        self.command_with(cmd::TEMPERATURE_SENSOR, &[0x80])?;
        self.command_with(cmd::RAM_X_COUNTER, &[0x00])?;
        self.command_with(cmd::RAM_Y_COUNTER, &[0x00, 0x00])?;
        self.wait_until_idle()
    }

    /// Upload both planes (cleared bit = ink) and run a full refresh.
    pub fn display(&mut self, black: &[u8], red: &[u8]) -> Result<(), EpdError> {
        Self::check_size(black)?;
        Self::check_size(red)?;

        self.command_with(cmd::WRITE_BLACK, black)?;
        // red RAM wants a set bit for red
        let red: Vec<u8> = red.iter().map(|b| !b).collect();
        self.command_with(cmd::WRITE_RED, &red)?;

        self.command_with(cmd::UPDATE_CONTROL_2, &[0xF7])?;
        self.command(cmd::MASTER_ACTIVATION)?;
        self.wait_until_idle()
    }

    /// Deep sleep; the image stays on the panel. Needs `init` to wake.
    pub fn sleep(&mut self) -> Result<(), EpdError> {
        self.command_with(cmd::DEEP_SLEEP, &[0x01])
    }
}

impl<SPI, DC, RST, BUSY> Panel for Epd2in7bV2<SPI, DC, RST, BUSY>
where
    SPI: SpiWrite + Send,
    DC: OutputPin + Send,
    RST: OutputPin + Send,
    BUSY: InputPin + Send,
{
    type Error = EpdError;

    fn init(&mut self) -> Result<(), EpdError> {
        Epd2in7bV2::init(self)
    }

    fn display(&mut self, black: &[u8], red: &[u8]) -> Result<(), EpdError> {
        Epd2in7bV2::display(self, black, red)
    }

    fn sleep(&mut self) -> Result<(), EpdError> {
        Epd2in7bV2::sleep(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Write {
        Command(u8),
        Data(Vec<u8>),
    }

    #[derive(Clone, Default)]
    struct Bus {
        dc_high: Arc<Mutex<bool>>,
        writes: Arc<Mutex<Vec<Write>>>,
    }

    impl Bus {
        fn writes(&self) -> Vec<Write> {
            self.writes.lock().unwrap().clone()
        }

        fn commands(&self) -> Vec<u8> {
            self.writes()
                .into_iter()
                .filter_map(|w| match w {
                    Write::Command(c) => Some(c),
                    Write::Data(_) => None,
                })
                .collect()
        }

        /// Data written right after `command`.
        fn payload(&self, command: u8) -> Option<Vec<u8>> {
            let writes = self.writes();
            let index = writes.iter().position(|w| *w == Write::Command(command))?;
            match writes.get(index + 1) {
                Some(Write::Data(data)) => Some(data.clone()),
                _ => None,
            }
        }
    }

    impl SpiWrite for Bus {
        fn write(&mut self, data: &[u8]) -> Result<(), EpdError> {
            let write = if *self.dc_high.lock().unwrap() {
                Write::Data(data.to_vec())
            } else {
                assert_eq!(data.len(), 1);
                Write::Command(data[0])
            };
            self.writes.lock().unwrap().push(write);
            Ok(())
        }
    }

    struct DcPin(Arc<Mutex<bool>>);

    impl OutputPin for DcPin {
        fn set_high(&mut self) -> Result<(), EpdError> {
            *self.0.lock().unwrap() = true;
            Ok(())
        }
        fn set_low(&mut self) -> Result<(), EpdError> {
            *self.0.lock().unwrap() = false;
            Ok(())
        }
    }

    struct NoopPin;

    impl OutputPin for NoopPin {
        fn set_high(&mut self) -> Result<(), EpdError> {
            Ok(())
        }
        fn set_low(&mut self) -> Result<(), EpdError> {
            Ok(())
        }
    }

    struct BusyPin(bool);

    impl InputPin for BusyPin {
        fn is_high(&self) -> Result<bool, EpdError> {
            Ok(self.0)
        }
    }

    fn panel(busy: bool) -> (Bus, Epd2in7bV2<Bus, DcPin, NoopPin, BusyPin>) {
        let bus = Bus::default();
        let epd = Epd2in7bV2::new(
            bus.clone(),
            DcPin(Arc::clone(&bus.dc_high)),
            NoopPin,
            BusyPin(busy),
        )
        .with_timing(Duration::from_millis(30), Duration::ZERO);
        (bus, epd)
    }

    #[test]
    fn test_init_sequence() {
        let (bus, mut epd) = panel(false);
        epd.init().unwrap();
        let commands = bus.commands();
        assert_eq!(commands[0], cmd::SW_RESET);
        assert!(commands.contains(&cmd::RAM_X_RANGE));
        assert_eq!(
            bus.payload(cmd::DRIVER_OUTPUT),
            Some(vec![0x07, 0x01, 0x00])
        );
        assert_eq!(bus.payload(cmd::RAM_X_RANGE), Some(vec![0x00, 21]));
        assert_eq!(
            bus.payload(cmd::RAM_Y_RANGE),
            Some(vec![0x00, 0x00, 0x07, 0x01])
        );
    }

    #[test]
    fn test_display_uploads_planes() {
        let (bus, mut epd) = panel(false);
        let mut black = vec![0xFF; BUFFER_SIZE];
        black[0] = 0x7F;
        let mut red = vec![0xFF; BUFFER_SIZE];
        red[1] = 0xFE;
        epd.display(&black, &red).unwrap();

        assert_eq!(bus.payload(cmd::WRITE_BLACK), Some(black));
        let sent_red = bus.payload(cmd::WRITE_RED).unwrap();
        assert_eq!(sent_red[1], 0x01);
        assert_eq!(sent_red.iter().filter(|&&b| b != 0).count(), 1);
        assert_eq!(
            bus.commands()[2..],
            [cmd::UPDATE_CONTROL_2, cmd::MASTER_ACTIVATION]
        );
    }

    #[test]
    fn test_wrong_buffer_size() {
        let (bus, mut epd) = panel(false);
        let result = epd.display(&[0xFF; 10], &vec![0xFF; BUFFER_SIZE]);
        let Err(EpdError::BufferSize { expected, got }) = result else {
            panic!("expected a buffer size error");
        };
        assert_eq!((expected, got), (BUFFER_SIZE, 10));
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn test_busy_timeout() {
        let (_bus, mut epd) = panel(true);
        assert!(matches!(epd.init(), Err(EpdError::BusyTimeout(_))));
    }

    #[test]
    fn test_sleep() {
        let (bus, mut epd) = panel(false);
        Panel::sleep(&mut epd).unwrap();
        assert_eq!(
            bus.writes(),
            vec![Write::Command(cmd::DEEP_SLEEP), Write::Data(vec![0x01])]
        );
    }
}
