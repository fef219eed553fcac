pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod display;
pub mod gesture;
pub mod input;
pub mod lcd_driver;
pub mod metrics;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("invalid thresholds: {0}")]
    Thresholds(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
