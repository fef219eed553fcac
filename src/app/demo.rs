use std::sync::Arc;
use std::time::Duration;

use log::info;

use super::lifecycle::create_shutdown_flag;
use super::loops::{run_until_stopped, InputLoop};
use super::AppConfig;
use crate::clock::{Clock, MonotonicClock};
use crate::display::{ConsoleRenderer, DisplayScheduler};
use crate::gesture::{GestureHandler, Thresholds};
use crate::input::{Debouncer, InputMonitor, LineLevel, ScriptedLine};
use crate::metrics::StaticMetrics;
use crate::Result;

const SHORT_PRESS: Duration = Duration::from_millis(300);
const SETTLE: Duration = Duration::from_millis(500);
const ROUNDING_MARGIN: Duration = Duration::from_millis(600);

/// A short press, a hold that lands in the restart band, and a release,
/// each followed by enough idle time to watch the screen auto-clear.
pub fn demo_script(thresholds: &Thresholds, display_duration: Duration) -> Vec<(LineLevel, Duration)> {
    let hold_time = thresholds.hold_time();
    let short_press = SHORT_PRESS.min(hold_time / 2);
    // Reported hold seconds already include hold_time's whole seconds.
    let restart_after = thresholds
        .time_to_restart()
        .saturating_sub(Duration::from_secs(hold_time.as_secs()));
    let long_press = restart_after.max(hold_time) + ROUNDING_MARGIN;
    let idle = display_duration + SETTLE;
    vec![
        (LineLevel::Inactive, SETTLE),
        (LineLevel::Active, short_press),
        (LineLevel::Inactive, idle),
        (LineLevel::Active, long_press),
        (LineLevel::Inactive, idle),
    ]
}

/// Play the scripted tour on the terminal with canned metrics.
pub fn run_demo(config: &AppConfig) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock);
    let scheduler = DisplayScheduler::new(ConsoleRenderer::stdout(config.cols), clock.clone());
    let running = create_shutdown_flag()?;
    let line = ScriptedLine::new(
        clock.clone(),
        demo_script(&config.thresholds, config.display_duration),
    )
    .stop_on_finish(running.clone());
    info!(
        "demo: playing a {} button tour (ctrl-c to stop)",
        humantime::format_duration(line.total_duration())
    );

    let handler = GestureHandler::new(
        scheduler.clone(),
        StaticMetrics::default(),
        config.thresholds,
        config.display_duration,
    )
    .with_style(config.message_style);
    let input = InputLoop::new(
        line,
        Debouncer::new(config.debounce),
        InputMonitor::new(config.thresholds.hold_time()),
        handler,
        clock,
    );
    let requests = run_until_stopped(input, scheduler, config.poll_interval, running)?;
    info!("demo finished with {} power request(s)", requests.len());
    Ok(())
}
