//! Three text rows on a small monochrome OLED.

use std::fmt;

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};

use super::Renderer;
use crate::{Error, Result};

/// Where the SSD1306 usually answers; `0x3d` when the SA0 strap is high.
pub const DEFAULT_SSD1306_ADDR: u8 = 0x3c;

const MARGIN_X: i32 = 1;
const FIRST_ROW_Y: i32 = 1;
const ROW_PITCH: i32 = 10;

/// A frame-buffered monochrome panel. Drawing goes to the buffer;
/// `flush_frame` pushes it to the glass.
pub trait FramePanel: DrawTarget<Color = BinaryColor> + Send {
    fn flush_frame(&mut self) -> Result<()>;
}

/// Draws the rows in a 6x10 font, one frame per change.
pub struct Ssd1306Renderer<P: FramePanel> {
    panel: P,
    cols: usize,
    shown: Option<[String; 3]>,
}

impl<P: FramePanel> Ssd1306Renderer<P> {
    pub fn new(panel: P) -> Self {
        let width = panel.bounding_box().size.width;
        let cols = width.saturating_sub(MARGIN_X as u32) / FONT_6X10.character_size.width;
        Self {
            panel,
            cols: cols as usize,
            shown: None,
        }
    }

    /// Characters that fit on one row.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }
}

impl<P> Ssd1306Renderer<P>
where
    P: FramePanel,
    P::Error: fmt::Debug,
{
    fn draw(&mut self, rows: [String; 3]) -> Result<()> {
        if self.shown.as_ref() == Some(&rows) {
            return Ok(());
        }
        self.panel.clear(BinaryColor::Off).map_err(draw_err)?;
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        for (row, text) in rows.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let origin = Point::new(MARGIN_X, FIRST_ROW_Y + row as i32 * ROW_PITCH);
            Text::with_baseline(text, origin, style, Baseline::Top)
                .draw(&mut self.panel)
                .map_err(draw_err)?;
        }
        self.panel.flush_frame()?;
        self.shown = Some(rows);
        Ok(())
    }
}

impl<P> Renderer for Ssd1306Renderer<P>
where
    P: FramePanel,
    P::Error: fmt::Debug,
{
    fn render(&mut self, top: &str, middle: &str, bottom: &str) -> Result<()> {
        let cols = self.cols;
        let rows = [top, middle, bottom].map(|text| text.chars().take(cols).collect::<String>());
        self.draw(rows)
    }

    fn clear(&mut self) -> Result<()> {
        self.draw(Default::default())
    }
}

fn draw_err<E: fmt::Debug>(err: E) -> Error {
    Error::Hardware(format!("oled: {err:?}"))
}

#[cfg(target_os = "linux")]
mod panel {
    use linux_embedded_hal::I2cdev;
    use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

    use super::FramePanel;
    use crate::{Error, Result};

    pub(super) type Ssd1306Panel =
        Ssd1306<I2CInterface<I2cdev>, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>;

    impl FramePanel for Ssd1306Panel {
        fn flush_frame(&mut self) -> Result<()> {
            self.flush()
                .map_err(|e| Error::Hardware(format!("ssd1306: {e:?}")))
        }
    }

    pub(super) fn open_panel(i2c_bus: u8, addr: u8, rotate_180: bool) -> Result<Ssd1306Panel> {
        let path = format!("/dev/i2c-{i2c_bus}");
        let i2c = I2cdev::new(&path)
            .map_err(|e| Error::Hardware(format!("i2c: cannot open {path}: {e}")))?;
        let rotation = if rotate_180 {
            DisplayRotation::Rotate180
        } else {
            DisplayRotation::Rotate0
        };
        let interface = I2CDisplayInterface::new_custom_address(i2c, addr);
        let mut display =
            Ssd1306::new(interface, DisplaySize128x32, rotation).into_buffered_graphics_mode();
        display
            .init()
            .map_err(|e| Error::Hardware(format!("ssd1306 at 0x{addr:02x}: {e:?}")))?;
        Ok(display)
    }
}

/// Open a 128x32 SSD1306 on `/dev/i2c-<i2c_bus>`.
#[cfg(target_os = "linux")]
pub fn open(
    i2c_bus: u8,
    addr: crate::config::I2cAddr,
    rotate_180: bool,
) -> Result<Box<dyn Renderer>> {
    let addr = match addr {
        crate::config::I2cAddr::Auto => DEFAULT_SSD1306_ADDR,
        crate::config::I2cAddr::Addr(a) => a,
    };
    let panel = panel::open_panel(i2c_bus, addr, rotate_180)?;
    log::info!("ssd1306 128x32 on i2c-{i2c_bus} at 0x{addr:02x}");
    Ok(Box::new(Ssd1306Renderer::new(panel)))
}

#[cfg(not(target_os = "linux"))]
pub fn open(
    _i2c_bus: u8,
    _addr: crate::config::I2cAddr,
    _rotate_180: bool,
) -> Result<Box<dyn Renderer>> {
    Err(Error::Hardware("ssd1306 requires Linux i2c-dev".into()))
}
