//! Display content, the renderer seam, and the auto-clear scheduler.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::Result;

pub mod lcd;
pub mod oled;
pub mod scheduler;

pub use scheduler::{DisplayScheduler, PendingClear, ScreenUpdate};

/// The three text rows currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayContent {
    pub top: String,
    pub middle: String,
    pub bottom: String,
}

impl DisplayContent {
    pub fn new(top: impl Into<String>, middle: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self {
            top: top.into(),
            middle: middle.into(),
            bottom: bottom.into(),
        }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.top.is_empty() && self.middle.is_empty() && self.bottom.is_empty()
    }

    pub fn rows(&self) -> [&str; 3] {
        [&self.top, &self.middle, &self.bottom]
    }
}

/// Output device for three rows of text. Calls are synchronous; errors
/// surface to whoever asked for the update.
pub trait Renderer: Send {
    fn render(&mut self, top: &str, middle: &str, bottom: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// What a [`MemoryRenderer`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    Render(DisplayContent),
    Clear,
}

/// Records every call. Clones share the same log, so a test can hand one
/// clone to the scheduler and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryRenderer {
    ops: Arc<Mutex<Vec<RenderOp>>>,
}

impl MemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<RenderOp> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Content as it would appear on a real screen after all recorded calls.
    pub fn visible(&self) -> DisplayContent {
        match self.ops().last() {
            Some(RenderOp::Render(content)) => content.clone(),
            Some(RenderOp::Clear) | None => DisplayContent::blank(),
        }
    }

    pub fn clear_count(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, RenderOp::Clear))
            .count()
    }

    pub fn render_count(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, RenderOp::Render(_)))
            .count()
    }
}

impl Renderer for MemoryRenderer {
    fn render(&mut self, top: &str, middle: &str, bottom: &str) -> Result<()> {
        self.ops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RenderOp::Render(DisplayContent::new(top, middle, bottom)));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.ops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RenderOp::Clear);
        Ok(())
    }
}

/// Draws a framed text panel on a terminal. Used by demo mode; repeated
/// identical frames are skipped so a held button does not flood the output.
pub struct ConsoleRenderer<W: Write + Send> {
    out: W,
    width: usize,
    last: Option<DisplayContent>,
}

impl ConsoleRenderer<std::io::Stdout> {
    pub fn stdout(width: u8) -> Self {
        Self::new(std::io::stdout(), width)
    }
}

impl<W: Write + Send> ConsoleRenderer<W> {
    pub fn new(out: W, width: u8) -> Self {
        Self {
            out,
            width: usize::from(width),
            last: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, content: DisplayContent) -> Result<()> {
        if self.last.as_ref() == Some(&content) {
            return Ok(());
        }
        let border = format!("+{}+", "-".repeat(self.width));
        writeln!(self.out, "{border}")?;
        for row in content.rows() {
            writeln!(self.out, "|{}|", fit_row(row, self.width))?;
        }
        writeln!(self.out, "{border}")?;
        self.out.flush()?;
        self.last = Some(content);
        Ok(())
    }
}

impl<W: Write + Send> Renderer for ConsoleRenderer<W> {
    fn render(&mut self, top: &str, middle: &str, bottom: &str) -> Result<()> {
        self.draw(DisplayContent::new(top, middle, bottom))
    }

    fn clear(&mut self) -> Result<()> {
        self.draw(DisplayContent::blank())
    }
}

/// Truncate or pad `text` to exactly `width` characters.
pub fn fit_row(text: &str, width: usize) -> String {
    let mut row: String = text.chars().take(width).collect();
    let len = row.chars().count();
    row.extend(std::iter::repeat(' ').take(width - len));
    row
}
