//! Gesture vocabulary shared by the input monitor, the handler and the
//! display scheduler.

use std::time::Duration;

use crate::{Error, Result};

mod handler;

pub use handler::{GestureHandler, MessageStyle, PowerRequest};

/// Classified button interaction, produced once per sample at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    Press,
    /// Held seconds, including the `hold_time` offset.
    HoldTick(u32),
    ShortRelease,
    LongRelease(u32),
}

/// Which gesture owns the screen. At most one at a time; `Cleared` after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Cleared,
    Press,
    Hold,
    Release,
}

/// Rotating press counter in `[0, 3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PressCounter(u8);

impl PressCounter {
    pub const MODULUS: u8 = 3;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = (self.0 + 1) % Self::MODULUS;
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Gesture flags that live under the display scheduler's lock so a reset
/// clears them in the same step as the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GestureSession {
    pub mode: DisplayMode,
    pub presses: PressCounter,
}

impl GestureSession {
    pub fn reset(&mut self) {
        self.mode = DisplayMode::Cleared;
        self.presses.reset();
    }
}

/// Result of the threshold cascade for a held duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThresholdBand {
    Below,
    Restart,
    Shutdown,
    Cancel,
}

impl ThresholdBand {
    pub fn label(self) -> &'static str {
        match self {
            ThresholdBand::Below => "none",
            ThresholdBand::Restart => "restart",
            ThresholdBand::Shutdown => "shutdown",
            ThresholdBand::Cancel => "cancel",
        }
    }
}

pub const DEFAULT_HOLD_TIME: Duration = Duration::from_secs(1);
pub const DEFAULT_TIME_TO_RESTART: Duration = Duration::from_secs(3);
pub const DEFAULT_TIME_TO_SHUTDOWN: Duration = Duration::from_secs(6);
pub const DEFAULT_TIME_TO_CANCEL: Duration = Duration::from_secs(9);

/// Cumulative hold thresholds. Ordering is checked at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    hold_time: Duration,
    time_to_restart: Duration,
    time_to_shutdown: Duration,
    time_to_cancel: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            hold_time: DEFAULT_HOLD_TIME,
            time_to_restart: DEFAULT_TIME_TO_RESTART,
            time_to_shutdown: DEFAULT_TIME_TO_SHUTDOWN,
            time_to_cancel: DEFAULT_TIME_TO_CANCEL,
        }
    }
}

impl Thresholds {
    pub fn new(
        hold_time: Duration,
        time_to_restart: Duration,
        time_to_shutdown: Duration,
        time_to_cancel: Duration,
    ) -> Result<Self> {
        if hold_time.is_zero() {
            return Err(Error::Thresholds("hold_time must be greater than zero".into()));
        }
        if hold_time > time_to_restart {
            return Err(Error::Thresholds(format!(
                "hold_time ({}) must not exceed time_to_restart ({})",
                humantime::format_duration(hold_time),
                humantime::format_duration(time_to_restart)
            )));
        }
        if time_to_restart > time_to_shutdown {
            return Err(Error::Thresholds(format!(
                "time_to_restart ({}) must not exceed time_to_shutdown ({})",
                humantime::format_duration(time_to_restart),
                humantime::format_duration(time_to_shutdown)
            )));
        }
        if time_to_shutdown > time_to_cancel {
            return Err(Error::Thresholds(format!(
                "time_to_shutdown ({}) must not exceed time_to_cancel ({})",
                humantime::format_duration(time_to_shutdown),
                humantime::format_duration(time_to_cancel)
            )));
        }
        Ok(Self {
            hold_time,
            time_to_restart,
            time_to_shutdown,
            time_to_cancel,
        })
    }

    /// Convenience for whole-second thresholds.
    pub fn from_secs(hold: u64, restart: u64, shutdown: u64, cancel: u64) -> Result<Self> {
        Self::new(
            Duration::from_secs(hold),
            Duration::from_secs(restart),
            Duration::from_secs(shutdown),
            Duration::from_secs(cancel),
        )
    }

    pub fn hold_time(&self) -> Duration {
        self.hold_time
    }

    pub fn time_to_restart(&self) -> Duration {
        self.time_to_restart
    }

    pub fn time_to_shutdown(&self) -> Duration {
        self.time_to_shutdown
    }

    pub fn time_to_cancel(&self) -> Duration {
        self.time_to_cancel
    }

    /// Highest threshold reached by `held_secs`, most severe first.
    pub fn band(&self, held_secs: u32) -> ThresholdBand {
        let held = Duration::from_secs(u64::from(held_secs));
        if held >= self.time_to_cancel {
            ThresholdBand::Cancel
        } else if held >= self.time_to_shutdown {
            ThresholdBand::Shutdown
        } else if held >= self.time_to_restart {
            ThresholdBand::Restart
        } else {
            ThresholdBand::Below
        }
    }

    /// Next band above the current one and the whole seconds left until it.
    pub fn next_band(&self, held_secs: u32) -> Option<(ThresholdBand, u64)> {
        let held = u64::from(held_secs);
        let (band, at) = match self.band(held_secs) {
            ThresholdBand::Below => (ThresholdBand::Restart, self.time_to_restart),
            ThresholdBand::Restart => (ThresholdBand::Shutdown, self.time_to_shutdown),
            ThresholdBand::Shutdown => (ThresholdBand::Cancel, self.time_to_cancel),
            ThresholdBand::Cancel => return None,
        };
        let at_secs = at.as_secs() + u64::from(at.subsec_nanos() > 0);
        Some((band, at_secs.saturating_sub(held)))
    }
}
