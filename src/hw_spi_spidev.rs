//! Kernel SPI (`/dev/spidev0.0`) as the panel bus.

use linux_embedded_hal::spidev::{SpiModeFlags, Spidev, SpidevOptions};
use paper_clock_lib::epd2in7b::{EpdError, SpiWrite};
use std::io::Write;

pub const SPI_DEVICE: &str = "/dev/spidev0.0";

/// spidev caps a single transfer at one page by default.
const MAX_TRANSFER: usize = 4096;

pub struct SpidevHwSpi {
    dev: Spidev,
}

impl SpidevHwSpi {
    pub fn open(path: &str) -> Result<Self, EpdError> {
        let mut dev = Spidev::open(path).map_err(|e| EpdError::Spi(format!("{path}: {e}")))?;

        let opts = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(4_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        dev.configure(&opts)
            .map_err(|e| EpdError::Spi(e.to_string()))?;
        Ok(Self { dev })
    }
}

impl SpiWrite for SpidevHwSpi {
    fn write(&mut self, data: &[u8]) -> Result<(), EpdError> {
        for chunk in data.chunks(MAX_TRANSFER) {
            self.dev
                .write_all(chunk)
                .map_err(|e| EpdError::Spi(e.to_string()))?;
        }
        Ok(())
    }
}
