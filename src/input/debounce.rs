use std::time::{Duration, Instant};

use super::LineLevel;

/// Accepts a level change only after it has held steady for `window`.
/// A zero window passes every sample through unchanged.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    stable: LineLevel,
    candidate: Option<(LineLevel, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stable: LineLevel::Inactive,
            candidate: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero()
    }

    pub fn filter(&mut self, raw: LineLevel, now: Instant) -> LineLevel {
        if !self.is_enabled() {
            self.stable = raw;
            return raw;
        }
        if raw == self.stable {
            self.candidate = None;
            return self.stable;
        }
        match self.candidate {
            Some((level, since)) if level == raw => {
                if now.saturating_duration_since(since) >= self.window {
                    self.stable = raw;
                    self.candidate = None;
                }
            }
            _ => self.candidate = Some((raw, now)),
        }
        self.stable
    }
}
