use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{LineLevel, LineReader};
use crate::clock::Clock;

/// Plays back a timeline of line levels against a clock. The timeline starts
/// at the first read. Once it runs out the line stays inactive and the
/// optional stop flag is cleared.
pub struct ScriptedLine {
    clock: Arc<dyn Clock>,
    steps: Vec<(LineLevel, Duration)>,
    started: Option<Instant>,
    finished: Arc<AtomicBool>,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl ScriptedLine {
    pub fn new(clock: Arc<dyn Clock>, steps: Vec<(LineLevel, Duration)>) -> Self {
        Self {
            clock,
            steps,
            started: None,
            finished: Arc::new(AtomicBool::new(false)),
            stop_flag: None,
        }
    }

    /// Clear `running` when the script ends.
    pub fn stop_on_finish(mut self, running: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(running);
        self
    }

    pub fn finished_flag(&self) -> Arc<AtomicBool> {
        self.finished.clone()
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|(_, d)| *d).sum()
    }

    fn level_at(&self, offset: Duration) -> Option<LineLevel> {
        let mut end = Duration::ZERO;
        for (level, length) in &self.steps {
            end += *length;
            if offset < end {
                return Some(*level);
            }
        }
        None
    }
}

impl LineReader for ScriptedLine {
    fn read_level(&mut self) -> LineLevel {
        let now = self.clock.now();
        let started = *self.started.get_or_insert(now);
        match self.level_at(now.saturating_duration_since(started)) {
            Some(level) => level,
            None => {
                if !self.finished.swap(true, Ordering::SeqCst) {
                    if let Some(running) = &self.stop_flag {
                        running.store(false, Ordering::SeqCst);
                    }
                }
                LineLevel::Inactive
            }
        }
    }
}
