//! Button sampling: raw line levels in, gesture events out.

use std::time::{Duration, Instant};

use crate::gesture::GestureEvent;

pub mod debounce;
pub mod gpio;
pub mod scripted;

pub use debounce::Debouncer;
pub use gpio::GpioLine;
pub use scripted::ScriptedLine;

/// Electrical state of the button line, already mapped through the active
/// polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Active,
    Inactive,
}

impl LineLevel {
    pub fn is_active(self) -> bool {
        matches!(self, LineLevel::Active)
    }
}

/// Polled, non-blocking line read.
pub trait LineReader: Send {
    fn read_level(&mut self) -> LineLevel;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    Pressed,
    Held,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Pressed { since: Instant },
    Held { since: Instant },
}

/// Press/hold/release state machine. Advances by at most one transition and
/// emits at most one event per sample.
#[derive(Debug, Clone)]
pub struct InputMonitor {
    phase: Phase,
    hold_time: Duration,
}

impl InputMonitor {
    pub fn new(hold_time: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            hold_time,
        }
    }

    pub fn state(&self) -> ButtonState {
        match self.phase {
            Phase::Idle => ButtonState::Idle,
            Phase::Pressed { .. } => ButtonState::Pressed,
            Phase::Held { .. } => ButtonState::Held,
        }
    }

    pub fn sample(&mut self, level: LineLevel, now: Instant) -> Option<GestureEvent> {
        match (self.phase, level) {
            (Phase::Idle, LineLevel::Active) => {
                self.phase = Phase::Pressed { since: now };
                Some(GestureEvent::Press)
            }
            (Phase::Idle, LineLevel::Inactive) => None,
            (Phase::Pressed { since }, LineLevel::Active) => {
                if now.saturating_duration_since(since) > self.hold_time {
                    // Hold time counts from the press, not from this sample.
                    self.phase = Phase::Held { since };
                    Some(GestureEvent::HoldTick(self.held_seconds(since, now)))
                } else {
                    None
                }
            }
            (Phase::Pressed { .. }, LineLevel::Inactive) => {
                self.phase = Phase::Idle;
                Some(GestureEvent::ShortRelease)
            }
            (Phase::Held { since }, LineLevel::Active) => {
                Some(GestureEvent::HoldTick(self.held_seconds(since, now)))
            }
            (Phase::Held { since }, LineLevel::Inactive) => {
                self.phase = Phase::Idle;
                Some(GestureEvent::LongRelease(self.held_seconds(since, now)))
            }
        }
    }

    /// Rounded seconds since the hold started plus the whole seconds of
    /// `hold_time`. The offset is intentional; thresholds are tuned to it.
    fn held_seconds(&self, since: Instant, now: Instant) -> u32 {
        let elapsed = now
            .saturating_duration_since(since)
            .as_secs_f64()
            .round_ties_even();
        let offset = u32::try_from(self.hold_time.as_secs()).unwrap_or(u32::MAX);
        (elapsed.min(f64::from(u32::MAX)) as u32).saturating_add(offset)
    }
}
