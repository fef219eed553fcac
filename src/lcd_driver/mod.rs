//! HD44780 character LCD behind a PCF8574 I2C backpack, driven in 4-bit mode.

use std::time::Duration;

use crate::Result;

pub mod pcf8574;

/// Backlight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backlight {
    On,
    Off,
}

/// Minimal trait to allow swapping the I2C backend (for tests or rppal).
pub trait I2cBus {
    fn write_byte(&mut self, addr: u8, byte: u8) -> Result<()>;
}

/// HD44780 driver that targets a PCF8574 backpack in 4-bit mode.
pub struct Hd44780<B: I2cBus> {
    bus: B,
    addr: u8,
    cols: u8,
    rows: u8,
    backlight: Backlight,
}

// PCF8574 pin layout on the common backpacks.
const MASK_RS: u8 = 0x01;
const MASK_E: u8 = 0x04;
const SHIFT_BACKLIGHT: u8 = 3;
const SHIFT_DATA: u8 = 4;

const LCD_CLR: u8 = 0x01;
const LCD_HOME: u8 = 0x02;
const LCD_ENTRY_MODE: u8 = 0x04;
const LCD_ENTRY_INC: u8 = 0x02;
const LCD_ON_CTRL: u8 = 0x08;
const LCD_ON_DISPLAY: u8 = 0x04;
const LCD_FUNCTION: u8 = 0x20;
const LCD_FUNCTION_2LINES: u8 = 0x08;
const LCD_FUNCTION_RESET: u8 = 0x30;
const LCD_DDRAM: u8 = 0x80;

impl<B: I2cBus> Hd44780<B> {
    /// Create and initialize the display. Defaults backlight to on.
    pub fn new(bus: B, addr: u8, cols: u8, rows: u8) -> Result<Self> {
        let mut driver = Hd44780 {
            bus,
            addr,
            cols: cols.clamp(1, 40),
            rows: rows.clamp(1, 4),
            backlight: Backlight::On,
        };

        driver.bus.write_byte(driver.addr, 0)?;
        sleep_ms(20);
        // Three reset nibbles force 8-bit mode from any state, then drop to 4-bit.
        driver.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(5);
        driver.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(1);
        driver.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(1);
        driver.write_init_nibble(LCD_FUNCTION)?;
        sleep_ms(1);

        let mut cmd = LCD_FUNCTION;
        if driver.rows > 1 {
            cmd |= LCD_FUNCTION_2LINES;
        }
        driver.write_command(cmd)?;
        driver.display_off()?;
        driver.clear()?;
        driver.write_command(LCD_ENTRY_MODE | LCD_ENTRY_INC)?;
        driver.display_on()?;
        Ok(driver)
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    /// Clear display and home cursor. Requires the longer delay.
    pub fn clear(&mut self) -> Result<()> {
        self.write_command(LCD_CLR)?;
        self.write_command(LCD_HOME)
    }

    pub fn display_on(&mut self) -> Result<()> {
        self.write_command(LCD_ON_CTRL | LCD_ON_DISPLAY)
    }

    pub fn display_off(&mut self) -> Result<()> {
        self.write_command(LCD_ON_CTRL)
    }

    pub fn backlight_on(&mut self) -> Result<()> {
        self.backlight = Backlight::On;
        self.bus.write_byte(self.addr, 1 << SHIFT_BACKLIGHT)
    }

    pub fn backlight_off(&mut self) -> Result<()> {
        self.backlight = Backlight::Off;
        self.bus.write_byte(self.addr, 0)
    }

    pub fn move_to(&mut self, col: u8, row: u8) -> Result<()> {
        let row = row % self.rows;
        let mut addr = col.min(self.cols - 1) & 0x3f;
        if row & 1 == 1 {
            addr += 0x40;
        }
        if row & 2 == 2 {
            addr += self.cols;
        }
        self.write_command(LCD_DDRAM | addr)
    }

    /// Overwrite a whole row. Text is padded with spaces or cut to the row
    /// width so stale characters never survive and nothing wraps.
    pub fn write_line(&mut self, row: u8, text: &str) -> Result<()> {
        self.move_to(0, row)?;
        let mut chars = text.chars().map(lcd_byte);
        for _ in 0..self.cols {
            self.write_data(chars.next().unwrap_or(b' '))?;
        }
        Ok(())
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn write_init_nibble(&mut self, nibble: u8) -> Result<()> {
        let byte = ((nibble >> 4) & 0x0f) << SHIFT_DATA;
        self.bus.write_byte(self.addr, byte | MASK_E)?;
        self.bus.write_byte(self.addr, byte)?;
        Ok(())
    }

    fn write_command(&mut self, cmd: u8) -> Result<()> {
        self.write_nibble(cmd, false)?;
        self.write_nibble(cmd << 4, false)?;
        if cmd <= 3 {
            // HOME/CLEAR need extra delay.
            sleep_ms(5);
        }
        Ok(())
    }

    fn write_data(&mut self, data: u8) -> Result<()> {
        self.write_nibble(data, true)?;
        self.write_nibble(data << 4, true)
    }

    fn write_nibble(&mut self, nibble: u8, is_data: bool) -> Result<()> {
        let mut byte = self.backlight_mask();
        if is_data {
            byte |= MASK_RS;
        }
        byte |= (nibble >> 4) << SHIFT_DATA;

        self.bus.write_byte(self.addr, byte | MASK_E)?;
        self.bus.write_byte(self.addr, byte)?;
        Ok(())
    }

    fn backlight_mask(&self) -> u8 {
        match self.backlight {
            Backlight::On => 1 << SHIFT_BACKLIGHT,
            Backlight::Off => 0,
        }
    }
}

/// The controller's ROM only matches ASCII in the printable range.
fn lcd_byte(ch: char) -> u8 {
    if ch.is_ascii() && !ch.is_ascii_control() {
        ch as u8
    } else {
        b'?'
    }
}

fn sleep_ms(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}
