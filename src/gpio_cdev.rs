//! Panel control lines over the GPIO character device.

use linux_embedded_hal::gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use paper_clock_lib::epd2in7b::{EpdError, InputPin, OutputPin};

pub const GPIO_CHIP: &str = "/dev/gpiochip0";
const CONSUMER: &str = "paper-clock";

fn gpio_error(e: impl std::fmt::Display) -> EpdError {
    EpdError::Gpio(e.to_string())
}

fn request(chip: &mut Chip, offset: u32, flags: LineRequestFlags) -> Result<LineHandle, EpdError> {
    chip.get_line(offset)
        .map_err(gpio_error)?
        .request(flags, 0, CONSUMER)
        .map_err(gpio_error)
}

pub struct CdevOutputPin {
    line: LineHandle,
}

impl CdevOutputPin {
    pub fn new(chip: &mut Chip, offset: u32) -> Result<Self, EpdError> {
        Ok(Self {
            line: request(chip, offset, LineRequestFlags::OUTPUT)?,
        })
    }
}

pub struct CdevInputPin {
    line: LineHandle,
}

impl CdevInputPin {
    pub fn new(chip: &mut Chip, offset: u32) -> Result<Self, EpdError> {
        Ok(Self {
            line: request(chip, offset, LineRequestFlags::INPUT)?,
        })
    }
}

impl OutputPin for CdevOutputPin {
    fn set_high(&mut self) -> Result<(), EpdError> {
        self.line.set_value(1).map_err(gpio_error)
    }

    fn set_low(&mut self) -> Result<(), EpdError> {
        self.line.set_value(0).map_err(gpio_error)
    }
}

impl InputPin for CdevInputPin {
    fn is_high(&self) -> Result<bool, EpdError> {
        Ok(self.line.get_value().map_err(gpio_error)? == 1)
    }
}
