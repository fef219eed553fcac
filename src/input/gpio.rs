use super::{LineLevel, LineReader};
#[cfg(not(target_os = "linux"))]
use crate::Error;
use crate::Result;

/// Button input pin with pull-up; stubbed on non-Linux platforms.
#[cfg(target_os = "linux")]
pub struct GpioLine {
    pin: rppal::gpio::InputPin,
    active_low: bool,
}

#[cfg(target_os = "linux")]
impl GpioLine {
    pub fn new(pin: u8, active_low: bool) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(map_gpio_err)?;
        let input = gpio.get(pin).map_err(map_gpio_err)?.into_input_pullup();
        log::debug!("button on gpio {pin} (active {})", if active_low { "low" } else { "high" });
        Ok(Self {
            pin: input,
            active_low,
        })
    }
}

#[cfg(target_os = "linux")]
impl LineReader for GpioLine {
    fn read_level(&mut self) -> LineLevel {
        level_from_pin(self.pin.is_low(), self.active_low)
    }
}

#[cfg(target_os = "linux")]
fn map_gpio_err(err: rppal::gpio::Error) -> crate::Error {
    crate::Error::Hardware(format!("gpio: {err}"))
}

#[cfg(not(target_os = "linux"))]
pub struct GpioLine;

#[cfg(not(target_os = "linux"))]
impl GpioLine {
    pub fn new(_pin: u8, _active_low: bool) -> Result<Self> {
        Err(Error::Hardware("gpio unsupported on this platform".into()))
    }
}

#[cfg(not(target_os = "linux"))]
impl LineReader for GpioLine {
    fn read_level(&mut self) -> LineLevel {
        LineLevel::Inactive
    }
}

/// Map a raw pin reading through the configured polarity.
pub fn level_from_pin(pin_low: bool, active_low: bool) -> LineLevel {
    if pin_low == active_low {
        LineLevel::Active
    } else {
        LineLevel::Inactive
    }
}
