use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::LogLevel;
use crate::gesture::{MessageStyle, Thresholds};
use crate::{Error, Result};

pub mod loader;

pub const DEFAULT_BUTTON_PIN: u8 = 20;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_secs(5);
pub const DEFAULT_I2C_BUS: u8 = 1;
pub const DEFAULT_COLS: u8 = 20;
pub const DEFAULT_ROWS: u8 = 4;
const CONFIG_DIR_NAME: &str = "infobutton";
const CONFIG_FILE_NAME: &str = "config.toml";

/// I2C address of the display, or `auto` for the usual one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum I2cAddr {
    #[default]
    Auto,
    Addr(u8),
}

impl std::str::FromStr for I2cAddr {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("auto") {
            return Ok(I2cAddr::Auto);
        }
        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u8::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u8>().ok(),
        };
        parsed
            .map(I2cAddr::Addr)
            .ok_or_else(|| format!("expected 'auto' or an address like 0x27, got '{raw}'"))
    }
}

impl TryFrom<String> for I2cAddr {
    type Error = String;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<I2cAddr> for String {
    fn from(addr: I2cAddr) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for I2cAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            I2cAddr::Auto => f.write_str("auto"),
            I2cAddr::Addr(a) => write!(f, "{a:#04x}"),
        }
    }
}

/// Which panel the daemon drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    /// 128x32 SSD1306 OLED.
    #[default]
    Ssd1306,
    /// HD44780 character LCD on a PCF8574 backpack; sized by `cols`/`rows`.
    Hd44780,
}

impl fmt::Display for DisplayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayKind::Ssd1306 => f.write_str("ssd1306"),
            DisplayKind::Hd44780 => f.write_str("hd44780"),
        }
    }
}

/// User-supplied settings loaded from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub button_gpio_pin: u8,
    pub button_active_low: bool,
    #[serde(with = "duration_str")]
    pub poll_interval: Duration,
    #[serde(with = "duration_str")]
    pub debounce: Duration,
    #[serde(with = "duration_str")]
    pub display_duration: Duration,
    #[serde(with = "duration_str")]
    pub hold_time: Duration,
    #[serde(with = "duration_str")]
    pub time_to_restart: Duration,
    #[serde(with = "duration_str")]
    pub time_to_shutdown: Duration,
    #[serde(with = "duration_str")]
    pub time_to_cancel: Duration,
    pub message_style: MessageStyle,
    pub display: DisplayKind,
    pub i2c_bus: u8,
    pub display_addr: I2cAddr,
    /// SSD1306 only: mount the panel upside down.
    pub rotate_180: bool,
    pub cols: u8,
    pub rows: u8,
    pub log_level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            button_gpio_pin: DEFAULT_BUTTON_PIN,
            button_active_low: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce: Duration::ZERO,
            display_duration: DEFAULT_DISPLAY_DURATION,
            hold_time: thresholds.hold_time(),
            time_to_restart: thresholds.time_to_restart(),
            time_to_shutdown: thresholds.time_to_shutdown(),
            time_to_cancel: thresholds.time_to_cancel(),
            message_style: MessageStyle::default(),
            display: DisplayKind::default(),
            i2c_bus: DEFAULT_I2C_BUS,
            display_addr: I2cAddr::Auto,
            rotate_180: true,
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            log_level: LogLevel::default(),
            log_file: None,
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_or_create(path: &Path) -> Result<Self> {
        loader::load_or_create(path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        loader::parse(raw)
    }

    pub fn to_toml(&self) -> Result<String> {
        loader::render(self)
    }

    pub fn thresholds(&self) -> Result<Thresholds> {
        Thresholds::new(
            self.hold_time,
            self.time_to_restart,
            self.time_to_shutdown,
            self.time_to_cancel,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !(8..=40).contains(&self.cols) {
            return Err(Error::Config(format!(
                "cols must be between 8 and 40 (got {})",
                self.cols
            )));
        }
        if !(3..=4).contains(&self.rows) {
            return Err(Error::Config(format!(
                "rows must be 3 or 4 (got {})",
                self.rows
            )));
        }
        if self.poll_interval.is_zero() || self.poll_interval > MAX_POLL_INTERVAL {
            return Err(Error::Config(format!(
                "poll_interval must be greater than 0 and at most 100ms (got {})",
                humantime::format_duration(self.poll_interval)
            )));
        }
        self.thresholds().map(|_| ())
    }
}

/// Durations as humantime strings ("1s", "250ms").
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
