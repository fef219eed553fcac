//! Owns what is on screen and what will clear it.
//!
//! Every mutation of the content, the pending auto-clear and the gesture
//! session happens under one mutex, together with the render call. A new
//! `show`/`show_then_clear` bumps the generation before anything else, so an
//! auto-clear scheduled earlier can never match again, even when its deadline
//! has already passed and the display loop has not looked yet.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, trace};

use super::{DisplayContent, Renderer};
use crate::clock::Clock;
use crate::gesture::GestureSession;
use crate::Result;

/// A scheduled revert. Only fires while `generation` is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingClear {
    pub deadline: Instant,
    pub revert_to: DisplayContent,
    pub generation: u64,
}

struct SchedulerState {
    renderer: Box<dyn Renderer>,
    content: DisplayContent,
    pending: Option<PendingClear>,
    generation: u64,
    session: GestureSession,
}

impl SchedulerState {
    fn cancel_pending(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(old) = self.pending.take() {
            trace!("auto-clear (generation {}) superseded", old.generation);
        }
    }

    fn present(&mut self, content: DisplayContent) -> Result<()> {
        self.content = content;
        let [top, middle, bottom] = self.content.rows();
        self.renderer.render(top, middle, bottom)
    }

    fn schedule_clear(&mut self, deadline: Instant) {
        self.cancel_pending();
        self.pending = Some(PendingClear {
            deadline,
            revert_to: DisplayContent::blank(),
            generation: self.generation,
        });
    }

    fn reset_to(&mut self, revert_to: DisplayContent) -> Result<()> {
        self.cancel_pending();
        self.session.reset();
        if revert_to.is_blank() {
            self.content = revert_to;
            self.renderer.clear()
        } else {
            self.present(revert_to)
        }
    }
}

/// The locked scheduler, lent to one [`DisplayScheduler::update`] call.
/// Session changes and screen writes made through it land together; the
/// display loop cannot fire an auto-clear in between.
pub struct ScreenUpdate<'a> {
    state: &'a mut SchedulerState,
    now: Instant,
}

impl ScreenUpdate<'_> {
    pub fn session(&mut self) -> &mut GestureSession {
        &mut self.state.session
    }

    pub fn show(&mut self, content: DisplayContent) -> Result<()> {
        self.state.cancel_pending();
        self.state.present(content)
    }

    pub fn show_then_clear(&mut self, content: DisplayContent, duration: Duration) -> Result<()> {
        self.state.schedule_clear(self.now + duration);
        self.state.present(content)
    }
}

/// Cloneable handle; all clones drive the same screen.
#[derive(Clone)]
pub struct DisplayScheduler {
    state: Arc<Mutex<SchedulerState>>,
    clock: Arc<dyn Clock>,
}

impl DisplayScheduler {
    pub fn new<R: Renderer + 'static>(renderer: R, clock: Arc<dyn Clock>) -> Self {
        Self::from_boxed(Box::new(renderer), clock)
    }

    /// For a renderer picked at runtime.
    pub fn from_boxed(renderer: Box<dyn Renderer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                renderer,
                content: DisplayContent::blank(),
                pending: None,
                generation: 0,
                session: GestureSession::default(),
            })),
            clock,
        }
    }

    /// Replace the screen now; any pending auto-clear is dropped.
    pub fn show(&self, content: DisplayContent) -> Result<()> {
        self.update(|screen| screen.show(content))
    }

    /// Replace the screen now and blank it after `duration` unless a newer
    /// call arrives first.
    pub fn show_then_clear(&self, content: DisplayContent, duration: Duration) -> Result<()> {
        self.update(|screen| screen.show_then_clear(content, duration))
    }

    /// Run `f` with the scheduler locked. Build anything slow (metrics,
    /// formatting) before calling; `f` must not call back into `self`.
    pub fn update<T>(&self, f: impl FnOnce(&mut ScreenUpdate<'_>) -> Result<T>) -> Result<T> {
        let now = self.clock.now();
        let mut state = self.lock();
        f(&mut ScreenUpdate {
            state: &mut *state,
            now,
        })
    }

    /// Fire the pending auto-clear if its deadline has passed. Returns whether
    /// a reset happened.
    pub fn tick(&self) -> Result<bool> {
        let now = self.clock.now();
        let mut state = self.lock();
        let due = match &state.pending {
            Some(pending) => pending.generation == state.generation && now >= pending.deadline,
            None => false,
        };
        if !due {
            return Ok(false);
        }
        let Some(pending) = state.pending.take() else {
            return Ok(false);
        };
        debug!("auto-clear fired (generation {})", pending.generation);
        state.reset_to(pending.revert_to)?;
        Ok(true)
    }

    /// Blank the screen and clear gesture flags and the press counter.
    pub fn reset(&self) -> Result<()> {
        self.lock().reset_to(DisplayContent::blank())
    }

    pub fn content(&self) -> DisplayContent {
        self.lock().content.clone()
    }

    pub fn pending(&self) -> Option<PendingClear> {
        self.lock().pending.clone()
    }

    pub fn pending_deadline(&self) -> Option<Instant> {
        self.lock().pending.as_ref().map(|p| p.deadline)
    }

    pub fn session(&self) -> GestureSession {
        self.lock().session
    }

    /// Run `f` against the gesture session while holding the display lock.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut GestureSession) -> T) -> T {
        f(&mut self.lock().session)
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::display::{MemoryRenderer, RenderOp};
    use crate::gesture::DisplayMode;

    fn scheduler() -> (DisplayScheduler, MemoryRenderer, ManualClock) {
        let renderer = MemoryRenderer::new();
        let clock = ManualClock::new();
        let sched = DisplayScheduler::new(renderer.clone(), Arc::new(clock.clone()));
        (sched, renderer, clock)
    }

    fn msg(top: &str) -> DisplayContent {
        DisplayContent::new(top, "", "")
    }

    #[test]
    fn show_renders_immediately_without_pending() {
        let (sched, renderer, _) = scheduler();
        sched.show(msg("hello")).unwrap();
        assert_eq!(sched.content(), msg("hello"));
        assert_eq!(renderer.visible(), msg("hello"));
        assert!(sched.pending().is_none());
    }

    #[test]
    fn auto_clear_fires_at_deadline_not_before() {
        let (sched, renderer, clock) = scheduler();
        sched
            .show_then_clear(msg("status"), Duration::from_secs(5))
            .unwrap();
        clock.advance_ms(4_999);
        assert!(!sched.tick().unwrap());
        assert_eq!(renderer.visible(), msg("status"));
        clock.advance_ms(1);
        assert!(sched.tick().unwrap());
        assert!(sched.content().is_blank());
        assert!(renderer.visible().is_blank());
        assert!(sched.pending().is_none());
    }

    #[test]
    fn show_supersedes_pending_clear() {
        let (sched, renderer, clock) = scheduler();
        sched
            .show_then_clear(msg("old"), Duration::from_secs(5))
            .unwrap();
        clock.advance_ms(4_000);
        sched.show(msg("new")).unwrap();
        clock.advance_ms(10_000);
        assert!(!sched.tick().unwrap());
        assert_eq!(renderer.visible(), msg("new"));
        assert_eq!(renderer.clear_count(), 0);
    }

    #[test]
    fn overdue_clear_is_cancelled_by_newer_show() {
        let (sched, renderer, clock) = scheduler();
        sched
            .show_then_clear(msg("old"), Duration::from_millis(10))
            .unwrap();
        // Deadline passed, but the display loop has not ticked yet.
        clock.advance_ms(50);
        sched.show(msg("newer")).unwrap();
        assert!(!sched.tick().unwrap());
        assert_eq!(sched.content(), msg("newer"));
        assert_eq!(renderer.clear_count(), 0);
    }

    #[test]
    fn clears_do_not_stack() {
        let (sched, _, clock) = scheduler();
        sched
            .show_then_clear(msg("first"), Duration::from_secs(2))
            .unwrap();
        clock.advance_ms(1_500);
        sched
            .show_then_clear(msg("second"), Duration::from_secs(2))
            .unwrap();
        // First deadline passes; only the second clear is live.
        clock.advance_ms(1_000);
        assert!(!sched.tick().unwrap());
        assert_eq!(sched.content(), msg("second"));
        clock.advance_ms(1_000);
        assert!(sched.tick().unwrap());
        assert!(sched.content().is_blank());
    }

    #[test]
    fn fired_clear_does_not_fire_twice() {
        let (sched, renderer, clock) = scheduler();
        sched
            .show_then_clear(msg("once"), Duration::from_millis(100))
            .unwrap();
        clock.advance_ms(100);
        assert!(sched.tick().unwrap());
        assert!(!sched.tick().unwrap());
        assert_eq!(renderer.clear_count(), 1);
    }

    #[test]
    fn auto_clear_resets_session() {
        let (sched, _, clock) = scheduler();
        sched.with_session(|s| {
            s.mode = DisplayMode::Release;
            s.presses.increment();
        });
        sched
            .show_then_clear(msg("bye"), Duration::from_millis(1))
            .unwrap();
        clock.advance_ms(1);
        sched.tick().unwrap();
        assert_eq!(sched.session(), GestureSession::default());
    }

    #[test]
    fn reset_is_idempotent() {
        let (sched, renderer, _) = scheduler();
        sched.show(msg("x")).unwrap();
        sched.with_session(|s| {
            s.mode = DisplayMode::Press;
            s.presses.increment();
        });
        sched.reset().unwrap();
        let once = (sched.content(), sched.session(), sched.pending());
        sched.reset().unwrap();
        let twice = (sched.content(), sched.session(), sched.pending());
        assert_eq!(once, twice);
        assert!(once.0.is_blank());
        assert_eq!(once.1, GestureSession::default());
        assert!(renderer.visible().is_blank());
    }

    #[test]
    fn update_applies_session_and_screen_together() {
        let (sched, renderer, clock) = scheduler();
        sched
            .update(|screen| {
                screen.session().mode = DisplayMode::Release;
                screen.show_then_clear(msg("released"), Duration::from_secs(2))
            })
            .unwrap();
        assert_eq!(sched.session().mode, DisplayMode::Release);
        assert_eq!(renderer.visible(), msg("released"));
        clock.advance_ms(2_000);
        assert!(sched.tick().unwrap());
        assert_eq!(sched.session(), GestureSession::default());
    }

    #[test]
    fn render_order_is_recorded() {
        let (sched, renderer, clock) = scheduler();
        sched.show(msg("a")).unwrap();
        sched
            .show_then_clear(msg("b"), Duration::from_millis(5))
            .unwrap();
        clock.advance_ms(5);
        sched.tick().unwrap();
        assert_eq!(
            renderer.ops(),
            vec![
                RenderOp::Render(msg("a")),
                RenderOp::Render(msg("b")),
                RenderOp::Clear
            ]
        );
    }
}
