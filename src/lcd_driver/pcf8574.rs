use crate::{lcd_driver::I2cBus, Error, Result};

/// Addresses a PCF8574 backpack can be strapped to, most common first.
pub const CANDIDATE_ADDRS: [u8; 8] = [0x27, 0x26, 0x25, 0x24, 0x23, 0x22, 0x21, 0x20];
pub const DEFAULT_I2C_ADDR: u8 = 0x27;

#[cfg(target_os = "linux")]
fn map_i2c_err(err: rppal::i2c::Error) -> Error {
    Error::Hardware(format!("i2c: {err}"))
}

/// Linux implementation using rppal's I2C.
#[cfg(target_os = "linux")]
pub struct RppalBus {
    inner: rppal::i2c::I2c,
}

#[cfg(target_os = "linux")]
impl RppalBus {
    /// Open a specific bus by number (e.g., bus 1 => /dev/i2c-1).
    pub fn new_with_bus(bus: u8) -> Result<Self> {
        let inner = rppal::i2c::I2c::with_bus(bus).map_err(map_i2c_err)?;
        Ok(Self { inner })
    }

    /// First candidate that acknowledges a write, or `fallback`.
    pub fn detect_address(&mut self, candidates: &[u8], fallback: u8) -> u8 {
        for &addr in candidates {
            if self.inner.set_slave_address(u16::from(addr)).is_ok()
                && self.inner.block_write(0, &[]).is_ok()
            {
                return addr;
            }
        }
        log::warn!("no pcf8574 answered on 0x20-0x27, using 0x{fallback:02x}");
        fallback
    }
}

#[cfg(target_os = "linux")]
impl I2cBus for RppalBus {
    fn write_byte(&mut self, addr: u8, byte: u8) -> Result<()> {
        self.inner
            .set_slave_address(addr.into())
            .map_err(map_i2c_err)?;
        self.inner.block_write(byte, &[]).map_err(map_i2c_err)
    }
}

/// Non-Linux stub to satisfy builds on dev hosts; returns errors at runtime.
#[cfg(not(target_os = "linux"))]
pub struct RppalBus;

#[cfg(not(target_os = "linux"))]
impl RppalBus {
    pub fn new_with_bus(_bus: u8) -> Result<Self> {
        Err(unsupported())
    }

    pub fn detect_address(&mut self, _candidates: &[u8], fallback: u8) -> u8 {
        fallback
    }
}

#[cfg(not(target_os = "linux"))]
impl I2cBus for RppalBus {
    fn write_byte(&mut self, _addr: u8, _byte: u8) -> Result<()> {
        Err(unsupported())
    }
}

#[cfg(not(target_os = "linux"))]
fn unsupported() -> Error {
    Error::Hardware("i2c is only available on Linux targets".into())
}
