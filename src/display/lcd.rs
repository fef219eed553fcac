use log::info;

use super::{fit_row, Renderer};
use crate::config::I2cAddr;
use crate::lcd_driver::pcf8574::{RppalBus, CANDIDATE_ADDRS, DEFAULT_I2C_ADDR};
use crate::lcd_driver::{Hd44780, I2cBus};
use crate::Result;

/// Puts the three rows on the first three lines of a character LCD.
/// Rows that did not change since the last frame are not rewritten, which
/// keeps a held button from saturating the bus.
pub struct LcdRenderer<B: I2cBus> {
    driver: Hd44780<B>,
    shown: [Option<String>; 3],
}

impl LcdRenderer<RppalBus> {
    pub fn open(i2c_bus: u8, addr: I2cAddr, cols: u8, rows: u8) -> Result<Self> {
        let mut bus = RppalBus::new_with_bus(i2c_bus)?;
        let addr = match addr {
            I2cAddr::Auto => bus.detect_address(&CANDIDATE_ADDRS, DEFAULT_I2C_ADDR),
            I2cAddr::Addr(a) => a,
        };
        info!("lcd {cols}x{rows} on i2c-{i2c_bus} at 0x{addr:02x}");
        let driver = Hd44780::new(bus, addr, cols, rows)?;
        Ok(Self::with_driver(driver))
    }
}

impl<B: I2cBus> LcdRenderer<B> {
    pub fn with_driver(driver: Hd44780<B>) -> Self {
        Self {
            driver,
            shown: [None, None, None],
        }
    }

    pub fn driver(&self) -> &Hd44780<B> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut Hd44780<B> {
        &mut self.driver
    }
}

impl<B: I2cBus + Send> Renderer for LcdRenderer<B> {
    fn render(&mut self, top: &str, middle: &str, bottom: &str) -> Result<()> {
        let width = usize::from(self.driver.cols());
        for (row, text) in [top, middle, bottom].into_iter().enumerate() {
            let line = fit_row(text, width);
            if self.shown[row].as_deref() == Some(line.as_str()) {
                continue;
            }
            self.driver.write_line(row as u8, &line)?;
            self.shown[row] = Some(line);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.driver.clear()?;
        let blank = fit_row("", usize::from(self.driver.cols()));
        self.shown = [Some(blank.clone()), Some(blank.clone()), Some(blank)];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd_driver::tests::MockBus;

    fn renderer() -> LcdRenderer<MockBus> {
        let mut driver = Hd44780::new(MockBus::default(), 0x27, 8, 4).unwrap();
        driver.bus_mut().reset_decoder();
        LcdRenderer::with_driver(driver)
    }

    #[test]
    fn renders_three_padded_rows() {
        let mut lcd = renderer();
        lcd.render("host", "10.0.0.2", "CPU: 3% | MEM: 9%").unwrap();
        assert_eq!(
            lcd.driver_mut().bus_mut().take_text(),
            "host    10.0.0.2CPU: 3% "
        );
    }

    #[test]
    fn unchanged_rows_are_skipped() {
        let mut lcd = renderer();
        lcd.render("a", "b", "c").unwrap();
        lcd.driver_mut().bus_mut().take_text();
        let before = lcd.driver().bus().writes.len();
        lcd.render("a", "b", "c").unwrap();
        assert_eq!(lcd.driver().bus().writes.len(), before);
        lcd.render("a", "x", "c").unwrap();
        assert_eq!(lcd.driver_mut().bus_mut().take_text(), "x       ");
    }

    #[test]
    fn clear_then_blank_render_writes_nothing() {
        let mut lcd = renderer();
        lcd.render("a", "b", "c").unwrap();
        lcd.clear().unwrap();
        lcd.driver_mut().bus_mut().take_text();
        let before = lcd.driver().bus().writes.len();
        lcd.render("", "", "").unwrap();
        assert_eq!(lcd.driver().bus().writes.len(), before);
        lcd.render("a", "", "").unwrap();
        assert_eq!(lcd.driver_mut().bus_mut().take_text(), "a       ");
    }
}
