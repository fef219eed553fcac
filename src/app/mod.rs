use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::{
    cli::RunOptions,
    clock::{Clock, MonotonicClock},
    config::{Config, DisplayKind, I2cAddr},
    display::{lcd::LcdRenderer, oled, DisplayScheduler, Renderer},
    gesture::{GestureHandler, MessageStyle, Thresholds},
    input::{Debouncer, GpioLine, InputMonitor},
    metrics::{SysinfoMetrics, SystemMetrics},
    Result,
};

mod demo;
mod lifecycle;
pub mod logger;
pub mod loops;

use demo::run_demo;
use lifecycle::create_shutdown_flag;
pub use demo::demo_script;
pub use logger::{LogLevel, Logger};
pub use loops::{run_until_stopped, AppEvent, InputLoop};

/// Settings for one run, after the CLI has been layered over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub button_gpio_pin: u8,
    pub button_active_low: bool,
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub display_duration: Duration,
    pub thresholds: Thresholds,
    pub message_style: MessageStyle,
    pub display: DisplayKind,
    pub i2c_bus: u8,
    pub display_addr: I2cAddr,
    pub rotate_180: bool,
    pub cols: u8,
    pub rows: u8,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    pub demo: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Defaults always satisfy the threshold ordering.
        Self::from_config(Config::default(), Thresholds::default())
    }
}

impl AppConfig {
    pub fn from_sources(config: Config, opts: RunOptions) -> Result<Self> {
        let thresholds = Thresholds::new(
            opts.hold_time.unwrap_or(config.hold_time),
            config.time_to_restart,
            config.time_to_shutdown,
            config.time_to_cancel,
        )?;
        let log_file = logger::resolve_log_path(opts.log_file, config.log_file.clone());
        let mut merged = Self::from_config(config, thresholds);
        if let Some(pin) = opts.pin {
            merged.button_gpio_pin = pin;
        }
        if let Some(duration) = opts.display_duration {
            merged.display_duration = duration;
        }
        if let Some(level) = opts.log_level {
            merged.log_level = level;
        }
        merged.log_file = log_file;
        merged.demo = opts.demo;
        Ok(merged)
    }

    fn from_config(config: Config, thresholds: Thresholds) -> Self {
        Self {
            button_gpio_pin: config.button_gpio_pin,
            button_active_low: config.button_active_low,
            poll_interval: config.poll_interval,
            debounce: config.debounce,
            display_duration: config.display_duration,
            thresholds,
            message_style: config.message_style,
            display: config.display,
            i2c_bus: config.i2c_bus,
            display_addr: config.display_addr,
            rotate_180: config.rotate_180,
            cols: config.cols,
            rows: config.rows,
            log_level: config.log_level,
            log_file: config.log_file,
            demo: false,
        }
    }
}

pub struct App {
    config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let cfg_file = match &opts.config {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load_or_default()?,
        };
        let merged = AppConfig::from_sources(cfg_file, opts)?;
        Ok(Self::new(merged))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn run(self) -> Result<()> {
        Logger::new(self.config.log_level, self.config.log_file.clone())?.install()?;
        if self.config.demo {
            info!("demo mode: console display, scripted button");
            return run_demo(&self.config);
        }
        self.run_daemon()
    }

    fn run_daemon(&self) -> Result<()> {
        let config = &self.config;
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock);
        let renderer = open_renderer(config)?;
        let line = GpioLine::new(config.button_gpio_pin, config.button_active_low)?;
        let mut metrics = SysinfoMetrics::new();
        info!(
            "infobutton {} on {} ({}), up {}",
            env!("CARGO_PKG_VERSION"),
            metrics.hostname(),
            metrics.ip_address(),
            metrics.uptime()
        );

        let running = create_shutdown_flag()?;
        let scheduler = DisplayScheduler::from_boxed(renderer, clock.clone());
        scheduler.reset()?;
        let handler = GestureHandler::new(
            scheduler.clone(),
            metrics,
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
        info!(
            "watching gpio {} every {}, hold after {}",
            config.button_gpio_pin,
            humantime::format_duration(config.poll_interval),
            humantime::format_duration(config.thresholds.hold_time())
        );
        let requests = run_until_stopped(input, scheduler, config.poll_interval, running)?;
        info!("stopped after {} power request(s)", requests.len());
        Ok(())
    }
}

fn open_renderer(config: &AppConfig) -> Result<Box<dyn Renderer>> {
    match config.display {
        DisplayKind::Ssd1306 => oled::open(config.i2c_bus, config.display_addr, config.rotate_180),
        DisplayKind::Hd44780 => {
            let lcd = LcdRenderer::open(config.i2c_bus, config.display_addr, config.cols, config.rows)?;
            Ok(Box::new(lcd))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config_file() {
        let config = Config {
            button_gpio_pin: 5,
            log_level: LogLevel::Warn,
            ..Config::default()
        };
        let opts = RunOptions {
            pin: Some(21),
            hold_time: Some(Duration::from_secs(2)),
            display_duration: Some(Duration::from_secs(9)),
            log_level: Some(LogLevel::Trace),
            log_file: Some(PathBuf::from("/tmp/ib.log")),
            demo: true,
            ..RunOptions::default()
        };
        let merged = AppConfig::from_sources(config, opts).unwrap();
        assert_eq!(merged.button_gpio_pin, 21);
        assert_eq!(merged.thresholds.hold_time(), Duration::from_secs(2));
        assert_eq!(merged.display_duration, Duration::from_secs(9));
        assert_eq!(merged.log_level, LogLevel::Trace);
        assert_eq!(merged.log_file, Some(PathBuf::from("/tmp/ib.log")));
        assert!(merged.demo);
    }

    #[test]
    fn config_values_survive_without_cli() {
        let config = Config {
            button_gpio_pin: 5,
            message_style: MessageStyle::Counter,
            display: DisplayKind::Hd44780,
            rotate_180: false,
            ..Config::default()
        };
        let merged = AppConfig::from_sources(config, RunOptions::default()).unwrap();
        assert_eq!(merged.button_gpio_pin, 5);
        assert_eq!(merged.message_style, MessageStyle::Counter);
        assert_eq!(merged.display, DisplayKind::Hd44780);
        assert!(!merged.rotate_180);
        assert_eq!(merged.thresholds, Thresholds::default());
        assert!(!merged.demo);
    }

    #[test]
    fn hold_time_override_is_checked_against_thresholds() {
        let opts = RunOptions {
            hold_time: Some(Duration::from_secs(4)),
            ..RunOptions::default()
        };
        let err = AppConfig::from_sources(Config::default(), opts).unwrap_err();
        assert!(matches!(err, crate::Error::Thresholds(_)));
    }

    #[test]
    fn default_matches_default_config() {
        let app = AppConfig::default();
        assert_eq!(app.button_gpio_pin, 20);
        assert_eq!(app.poll_interval, Duration::from_millis(1));
        assert_eq!(app.display_duration, Duration::from_secs(5));
        assert_eq!(app.display, DisplayKind::Ssd1306);
        assert_eq!(app.display_addr, I2cAddr::Auto);
        assert!(app.rotate_180);
    }
}
