//! # Paper Clock Entry Point
//!
//! Parses the command line, loads the configuration and starts the
//! controller. On a Raspberry Pi built with `--features hardware` it drives
//! the Waveshare 2.7" B panel and listens to the HAT keys; everywhere else
//! frames go to the log (or to stdout with `--stdout`).

#[cfg(test)]
mod tests;

#[cfg(all(target_os = "linux", feature = "hardware"))]
mod buttons;
#[cfg(all(target_os = "linux", feature = "hardware"))]
mod gpio_cdev;
#[cfg(all(target_os = "linux", feature = "hardware"))]
mod hw_spi_spidev;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use paper_clock_lib::app::App;
use paper_clock_lib::config::Settings;
use paper_clock_lib::display::Panel;
use paper_clock_lib::mode::DisplayMode;
use paper_clock_lib::preview::{draw_ascii, ConsolePanel};
use paper_clock_lib::weather_data::OpenWeatherMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Print one frame as text and exit
    #[arg(long)]
    stdout: bool,

    /// Refresh the panel once and exit
    #[arg(long)]
    once: bool,

    /// Configuration file (default: ./config.json, then ~/.paperclock)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn load_settings(args: &Args) -> Settings {
    match &args.config {
        Some(path) => Settings::load_from_path(path),
        None => Settings::load(),
    }
}

/// Fetch one forecast up front so single-shot modes have weather to show.
async fn prime_weather<P: Panel + 'static>(app: &App<P>) {
    let settings = app.settings();
    if !settings.weather_enabled() {
        return;
    }
    let fetched = match OpenWeatherMap::new(settings.api_key.clone()) {
        Ok(client) => client.fetch(settings.position, settings.units).await,
        Err(e) => Err(e),
    };
    match fetched {
        Ok(snapshot) => app.publish(snapshot),
        Err(e) => warn!("Weather fetch failed, drawing without weather: {}", e),
    }
}

#[cfg(all(target_os = "linux", feature = "hardware"))]
fn open_panel(settings: &Settings) -> anyhow::Result<impl Panel> {
    use crate::gpio_cdev::{CdevInputPin, CdevOutputPin, GPIO_CHIP};
    use crate::hw_spi_spidev::{SpidevHwSpi, SPI_DEVICE};
    use linux_embedded_hal::gpio_cdev::Chip;
    use paper_clock_lib::epd2in7b::Epd2in7bV2;

    let hw = &settings.hardware;
    info!(
        "Panel on {} (RST {}, DC {}, BUSY {})",
        SPI_DEVICE, hw.rst_pin, hw.dc_pin, hw.busy_pin
    );

    let mut chip = Chip::new(GPIO_CHIP).with_context(|| format!("open {GPIO_CHIP}"))?;
    let dc = CdevOutputPin::new(&mut chip, hw.dc_pin.into()).context("DC line")?;
    let rst = CdevOutputPin::new(&mut chip, hw.rst_pin.into()).context("RST line")?;
    let busy = CdevInputPin::new(&mut chip, hw.busy_pin.into()).context("BUSY line")?;
    let spi = SpidevHwSpi::open(SPI_DEVICE).context("open SPI")?;

    Ok(Epd2in7bV2::new(spi, dc, rst, busy))
}

#[cfg(all(target_os = "linux", feature = "hardware"))]
fn run(args: &Args, settings: Settings, rt: &tokio::runtime::Runtime) -> anyhow::Result<()> {
    use crate::buttons::Buttons;

    let button_pins = settings.hardware.buttons.clone();
    let app = App::new(settings.clone(), open_panel(&settings)?)?;

    if args.once {
        return rt.block_on(async {
            prime_weather(&app).await;
            let outcome = app.renderer().refresh().await?;
            info!("Single refresh: {:?}", outcome);
            Ok::<(), anyhow::Error>(())
        });
    }

    // Interrupt callbacks need a runtime-independent sender.
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let _buttons = Buttons::listen(&button_pins, tx).context("arm HAT keys")?;
    rt.block_on(app.run(rx));
    Ok(())
}

#[cfg(not(all(target_os = "linux", feature = "hardware")))]
fn run(args: &Args, settings: Settings, rt: &tokio::runtime::Runtime) -> anyhow::Result<()> {
    warn!("Built without the `hardware` feature, logging frames");
    let app = App::new(settings, ConsolePanel::new())?;

    if args.once {
        return rt.block_on(async {
            prime_weather(&app).await;
            let outcome = app.renderer().refresh().await?;
            info!("Single refresh: {:?}", outcome);
            Ok::<(), anyhow::Error>(())
        });
    }

    // No keys without the HAT: keep the sender alive so the channel stays open.
    let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
    rt.block_on(app.run(rx));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let settings = load_settings(&args);

    let rt = tokio::runtime::Runtime::new().context("start tokio runtime")?;

    // Development mode: one text frame, no panel
    if args.stdout {
        let app = App::new(settings, ConsolePanel::new())?;
        rt.block_on(prime_weather(&app));
        draw_ascii(&app.renderer().render(DisplayMode::Default));
        return Ok(());
    }

    run(&args, settings, &rt)
}
