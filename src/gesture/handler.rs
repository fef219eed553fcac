use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{DisplayMode, GestureEvent, ThresholdBand, Thresholds};
use crate::display::{DisplayContent, DisplayScheduler};
use crate::metrics::SystemMetrics;
use crate::Result;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Which set of screens the handler draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStyle {
    /// Host identity and load on release, restart/shutdown prompts on hold.
    #[default]
    Status,
    /// Press count on release and plain hold timers.
    Counter,
}

impl FromStr for MessageStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "status" => Ok(MessageStyle::Status),
            "counter" => Ok(MessageStyle::Counter),
            other => Err(format!("unknown message style '{other}' (expected status or counter)")),
        }
    }
}

impl fmt::Display for MessageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStyle::Status => f.write_str("status"),
            MessageStyle::Counter => f.write_str("counter"),
        }
    }
}

/// Power action a long release asks for. Carrying it out is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerRequest {
    Restart,
    Shutdown,
}

impl fmt::Display for PowerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerRequest::Restart => f.write_str("restart"),
            PowerRequest::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Turns gesture events into screens.
pub struct GestureHandler<M: SystemMetrics> {
    scheduler: DisplayScheduler,
    metrics: M,
    thresholds: Thresholds,
    display_duration: Duration,
    style: MessageStyle,
}

impl<M: SystemMetrics> GestureHandler<M> {
    pub fn new(
        scheduler: DisplayScheduler,
        metrics: M,
        thresholds: Thresholds,
        display_duration: Duration,
    ) -> Self {
        Self {
            scheduler,
            metrics,
            thresholds,
            display_duration,
            style: MessageStyle::default(),
        }
    }

    pub fn with_style(mut self, style: MessageStyle) -> Self {
        self.style = style;
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn scheduler(&self) -> &DisplayScheduler {
        &self.scheduler
    }

    pub fn handle(&mut self, event: GestureEvent) -> Result<Option<PowerRequest>> {
        match event {
            GestureEvent::Press => {
                self.on_press();
                Ok(None)
            }
            GestureEvent::HoldTick(held) => {
                self.on_hold(held)?;
                Ok(None)
            }
            GestureEvent::ShortRelease => {
                self.on_short_release()?;
                Ok(None)
            }
            GestureEvent::LongRelease(held) => self.on_long_release(held),
        }
    }

    fn on_press(&mut self) {
        self.scheduler
            .with_session(|session| session.mode = DisplayMode::Press);
    }

    fn on_hold(&mut self, held: u32) -> Result<()> {
        let content = self.hold_content(held);
        self.scheduler.update(|screen| {
            let session = screen.session();
            session.mode = DisplayMode::Hold;
            session.presses.reset();
            screen.show(content)
        })
    }

    fn on_short_release(&mut self) -> Result<()> {
        // Metrics can be slow; query them before taking the display lock.
        let status = match self.style {
            MessageStyle::Status => Some(self.status_content()),
            MessageStyle::Counter => None,
        };
        let duration = self.display_duration;
        self.scheduler.update(|screen| {
            let session = *screen.session();
            let content = status.unwrap_or_else(|| {
                DisplayContent::new(format!("Pressed {} times", session.presses.value()), "", "")
            });
            screen.show_then_clear(content, duration)?;
            if session.mode == DisplayMode::Press {
                screen.session().presses.increment();
            }
            Ok(())
        })
    }

    fn on_long_release(&mut self, held: u32) -> Result<Option<PowerRequest>> {
        let band = self.thresholds.band(held);
        let content = match (self.style, band) {
            (MessageStyle::Counter, _) => {
                DisplayContent::new(format!("Released after {held}s"), "", "")
            }
            (MessageStyle::Status, ThresholdBand::Below) => self.status_content(),
            (MessageStyle::Status, band) => {
                DisplayContent::new(release_verb(band), format!("held {held}s"), "")
            }
        };
        let duration = self.display_duration;
        self.scheduler.update(|screen| {
            screen.session().mode = DisplayMode::Release;
            screen.show_then_clear(content, duration)
        })?;
        let request = match band {
            ThresholdBand::Restart => Some(PowerRequest::Restart),
            ThresholdBand::Shutdown => Some(PowerRequest::Shutdown),
            ThresholdBand::Below | ThresholdBand::Cancel => None,
        };
        match request {
            Some(request) => info!("released after {held}s: {request} requested"),
            None => debug!("released after {held}s ({} band)", band.label()),
        }
        Ok(request)
    }

    /// Screen shown on every hold tick.
    pub fn hold_content(&self, held: u32) -> DisplayContent {
        if self.style == MessageStyle::Counter {
            return DisplayContent::new(format!("Holding for {held}s"), "", "");
        }
        let progress = progress_indicator(held);
        let band = self.thresholds.band(held);
        if band == ThresholdBand::Below {
            return DisplayContent::new(progress, "", "");
        }
        let countdown = self
            .thresholds
            .next_band(held)
            .map(|(next, secs)| format!("{} in {secs}s", next.label()))
            .unwrap_or_default();
        DisplayContent::new(progress, hold_prompt(band), countdown)
    }

    /// Hostname, address and load.
    pub fn status_content(&mut self) -> DisplayContent {
        let hostname = self.metrics.hostname();
        let ip = self.metrics.ip_address();
        let load = format!(
            "CPU: {} | MEM: {}",
            self.metrics.cpu_load(),
            self.metrics.memory_usage()
        );
        DisplayContent::new(hostname, ip, load)
    }
}

fn hold_prompt(band: ThresholdBand) -> &'static str {
    match band {
        ThresholdBand::Cancel => "release to cancel",
        ThresholdBand::Shutdown => "release to shutdown",
        ThresholdBand::Restart => "release to restart",
        ThresholdBand::Below => "",
    }
}

fn release_verb(band: ThresholdBand) -> &'static str {
    match band {
        ThresholdBand::Cancel => "cancelling shutdown...",
        ThresholdBand::Shutdown => "shutting down...",
        ThresholdBand::Restart => "restarting...",
        ThresholdBand::Below => "",
    }
}

fn progress_indicator(held: u32) -> String {
    let spin = SPINNER[held as usize % SPINNER.len()];
    format!("Holding {held}s {spin}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::display::MemoryRenderer;
    use crate::gesture::GestureSession;
    use crate::metrics::StaticMetrics;
    use std::sync::Arc;

    struct Fixture {
        handler: GestureHandler<StaticMetrics>,
        renderer: MemoryRenderer,
        clock: ManualClock,
    }

    fn fixture(style: MessageStyle) -> Fixture {
        let renderer = MemoryRenderer::new();
        let clock = ManualClock::new();
        let scheduler = DisplayScheduler::new(renderer.clone(), Arc::new(clock.clone()));
        let handler = GestureHandler::new(
            scheduler,
            StaticMetrics::default(),
            Thresholds::from_secs(1, 3, 6, 9).unwrap(),
            Duration::from_secs(5),
        )
        .with_style(style);
        Fixture {
            handler,
            renderer,
            clock,
        }
    }

    fn status_rows() -> DisplayContent {
        DisplayContent::new("raspberrypi", "192.168.1.20", "CPU: 7% | MEM: 31%")
    }

    #[test]
    fn hold_cascade_selects_prompt() {
        let f = fixture(MessageStyle::Status);
        assert_eq!(f.handler.hold_content(2).middle, "");
        assert_eq!(f.handler.hold_content(2).bottom, "");
        assert!(f.handler.hold_content(2).top.starts_with("Holding 2s"));
        assert_eq!(f.handler.hold_content(3).middle, "release to restart");
        assert_eq!(f.handler.hold_content(4).middle, "release to restart");
        assert_eq!(f.handler.hold_content(6).middle, "release to shutdown");
        assert_eq!(f.handler.hold_content(9).middle, "release to cancel");
    }

    #[test]
    fn hold_shows_countdown_to_next_band() {
        let f = fixture(MessageStyle::Status);
        assert_eq!(f.handler.hold_content(4).bottom, "shutdown in 2s");
        assert_eq!(f.handler.hold_content(8).bottom, "cancel in 1s");
        assert_eq!(f.handler.hold_content(12).bottom, "");
    }

    #[test]
    fn progress_indicator_rotates() {
        let f = fixture(MessageStyle::Status);
        let frames: Vec<String> = (0..4).map(|t| f.handler.hold_content(t).top).collect();
        assert_eq!(frames[0], "Holding 0s |");
        assert_eq!(frames[1], "Holding 1s /");
        assert_eq!(frames[3], "Holding 3s \\");
    }

    #[test]
    fn hold_tick_shows_without_auto_clear() {
        let mut f = fixture(MessageStyle::Status);
        f.handler.handle(GestureEvent::Press).unwrap();
        f.handler.handle(GestureEvent::HoldTick(6)).unwrap();
        let sched = f.handler.scheduler();
        assert!(sched.pending().is_none());
        assert_eq!(sched.content().middle, "release to shutdown");
        assert_eq!(sched.session().mode, DisplayMode::Hold);
    }

    #[test]
    fn press_draws_nothing() {
        let mut f = fixture(MessageStyle::Status);
        f.handler.handle(GestureEvent::Press).unwrap();
        assert!(f.renderer.ops().is_empty());
        assert_eq!(f.handler.scheduler().session().mode, DisplayMode::Press);
    }

    #[test]
    fn short_release_shows_status_then_clears() {
        let mut f = fixture(MessageStyle::Status);
        f.handler.handle(GestureEvent::Press).unwrap();
        f.handler.handle(GestureEvent::ShortRelease).unwrap();
        assert_eq!(f.renderer.visible(), status_rows());
        f.clock.advance_ms(5_000);
        assert!(f.handler.scheduler().tick().unwrap());
        assert!(f.renderer.visible().is_blank());
        assert_eq!(f.handler.scheduler().session(), GestureSession::default());
    }

    #[test]
    fn plain_presses_rotate_counter() {
        let mut f = fixture(MessageStyle::Counter);
        let mut shown = Vec::new();
        for _ in 0..4 {
            f.handler.handle(GestureEvent::Press).unwrap();
            f.handler.handle(GestureEvent::ShortRelease).unwrap();
            shown.push(f.renderer.visible().top);
        }
        assert_eq!(
            shown,
            vec![
                "Pressed 0 times",
                "Pressed 1 times",
                "Pressed 2 times",
                "Pressed 0 times"
            ]
        );
    }

    #[test]
    fn status_style_tracks_counter_without_rendering_it() {
        let mut f = fixture(MessageStyle::Status);
        f.handler.handle(GestureEvent::Press).unwrap();
        f.handler.handle(GestureEvent::ShortRelease).unwrap();
        f.handler.handle(GestureEvent::Press).unwrap();
        f.handler.handle(GestureEvent::ShortRelease).unwrap();
        assert_eq!(f.handler.scheduler().session().presses.value(), 2);
        assert_eq!(f.renderer.visible(), status_rows());
    }

    #[test]
    fn hold_resets_counter() {
        let mut f = fixture(MessageStyle::Counter);
        f.handler.handle(GestureEvent::Press).unwrap();
        f.handler.handle(GestureEvent::ShortRelease).unwrap();
        f.handler.handle(GestureEvent::Press).unwrap();
        f.handler.handle(GestureEvent::HoldTick(2)).unwrap();
        assert_eq!(f.handler.scheduler().session().presses.value(), 0);
        assert_eq!(f.renderer.visible().top, "Holding for 2s");
        f.handler.handle(GestureEvent::LongRelease(2)).unwrap();
        assert_eq!(f.renderer.visible().top, "Released after 2s");
        assert_eq!(f.handler.scheduler().session().mode, DisplayMode::Release);
    }

    #[test]
    fn short_release_after_reset_does_not_count() {
        let mut f = fixture(MessageStyle::Counter);
        f.handler.handle(GestureEvent::Press).unwrap();
        f.handler.scheduler().reset().unwrap();
        f.handler.handle(GestureEvent::ShortRelease).unwrap();
        assert_eq!(f.handler.scheduler().session().presses.value(), 0);
    }

    #[test]
    fn long_release_below_restart_falls_back_to_status() {
        let mut f = fixture(MessageStyle::Status);
        let request = f.handler.handle(GestureEvent::LongRelease(2)).unwrap();
        assert_eq!(request, None);
        assert_eq!(f.renderer.visible(), status_rows());
        assert!(f.handler.scheduler().pending().is_some());
    }

    #[test]
    fn long_release_cascade_and_power_requests() {
        let mut f = fixture(MessageStyle::Status);
        let cases = [
            (3, "restarting...", Some(PowerRequest::Restart)),
            (7, "shutting down...", Some(PowerRequest::Shutdown)),
            (9, "cancelling shutdown...", None),
        ];
        for (held, verb, expected) in cases {
            let request = f.handler.handle(GestureEvent::LongRelease(held)).unwrap();
            assert_eq!(request, expected);
            let visible = f.renderer.visible();
            assert_eq!(visible.top, verb);
            assert_eq!(visible.middle, format!("held {held}s"));
        }
    }

    #[test]
    fn new_hold_cancels_release_auto_clear() {
        let mut f = fixture(MessageStyle::Status);
        f.handler.handle(GestureEvent::LongRelease(7)).unwrap();
        f.clock.advance_ms(1_000);
        f.handler.handle(GestureEvent::Press).unwrap();
        f.handler.handle(GestureEvent::HoldTick(2)).unwrap();
        f.clock.advance_ms(10_000);
        assert!(!f.handler.scheduler().tick().unwrap());
        assert_eq!(f.renderer.visible().top, "Holding 2s -");
    }

    /// Metrics that let the display loop run while the handler is between
    /// reading the session and drawing.
    struct TickingMetrics {
        inner: StaticMetrics,
        scheduler: DisplayScheduler,
    }

    impl SystemMetrics for TickingMetrics {
        fn hostname(&mut self) -> String {
            self.scheduler.tick().unwrap();
            self.inner.hostname()
        }

        fn ip_address(&mut self) -> String {
            self.inner.ip_address()
        }

        fn cpu_load(&mut self) -> String {
            self.inner.cpu_load()
        }

        fn memory_usage(&mut self) -> String {
            self.inner.memory_usage()
        }

        fn uptime(&mut self) -> String {
            self.inner.uptime()
        }
    }

    fn ticking_fixture() -> (GestureHandler<TickingMetrics>, MemoryRenderer, ManualClock) {
        let renderer = MemoryRenderer::new();
        let clock = ManualClock::new();
        let scheduler = DisplayScheduler::new(renderer.clone(), Arc::new(clock.clone()));
        let metrics = TickingMetrics {
            inner: StaticMetrics::default(),
            scheduler: scheduler.clone(),
        };
        let handler = GestureHandler::new(
            scheduler,
            metrics,
            Thresholds::from_secs(1, 3, 6, 9).unwrap(),
            Duration::from_secs(5),
        );
        (handler, renderer, clock)
    }

    #[test]
    fn overdue_clear_during_metrics_query_is_not_lost() {
        let (mut handler, renderer, clock) = ticking_fixture();
        handler.handle(GestureEvent::Press).unwrap();
        handler.handle(GestureEvent::ShortRelease).unwrap();
        assert_eq!(handler.scheduler().session().presses.value(), 1);

        handler.handle(GestureEvent::Press).unwrap();
        clock.advance_ms(6_000);
        // The first clear is overdue and fires from inside hostname().
        handler.handle(GestureEvent::ShortRelease).unwrap();

        let session = handler.scheduler().session();
        assert_eq!(session.presses.value(), 0);
        assert_eq!(session.mode, DisplayMode::Cleared);
        assert_eq!(renderer.visible(), status_rows());
        assert!(handler.scheduler().pending().is_some());
        assert_eq!(renderer.clear_count(), 1);
    }

    #[test]
    fn long_release_mode_survives_overdue_clear() {
        let (mut handler, renderer, clock) = ticking_fixture();
        handler.handle(GestureEvent::Press).unwrap();
        handler.handle(GestureEvent::ShortRelease).unwrap();
        clock.advance_ms(6_000);
        handler.handle(GestureEvent::LongRelease(2)).unwrap();

        assert_eq!(handler.scheduler().session().mode, DisplayMode::Release);
        assert_eq!(renderer.visible(), status_rows());
        clock.advance_ms(5_000);
        assert!(handler.scheduler().tick().unwrap());
        assert!(renderer.visible().is_blank());
    }

    #[test]
    fn parses_message_style() {
        assert_eq!("Counter".parse::<MessageStyle>(), Ok(MessageStyle::Counter));
        assert!("fancy".parse::<MessageStyle>().is_err());
    }
}
