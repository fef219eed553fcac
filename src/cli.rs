use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::app::LogLevel;
use crate::{Error, Result};

/// Push-button status display daemon.
#[derive(Debug, Parser)]
#[command(
    name = "infobutton",
    version,
    about = "Push-button status display for Raspberry Pi",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    run: RunOptions,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Watch the button and drive the display (default).
    Run(RunOptions),
    /// Load and validate the config file, then print the effective settings.
    CheckConfig(CheckConfigArgs),
}

/// Options for the daemon. Anything left unset falls back to the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct RunOptions {
    /// Config file to use instead of the per-user default.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// BCM GPIO pin the button is wired to.
    #[arg(long, value_name = "GPIO")]
    pub pin: Option<u8>,
    /// How long release screens stay up, e.g. "5s".
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub display_duration: Option<Duration>,
    /// How long a press must last to count as a hold, e.g. "1s".
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub hold_time: Option<Duration>,
    /// error, warn, info, debug or trace.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
    /// Append log lines to this file as well as stderr.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
    /// Play a scripted button tour on the terminal instead of using hardware.
    #[arg(long)]
    pub demo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct CheckConfigArgs {
    /// Config file to check instead of the per-user default.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Bare invocation means `run`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run(self.run))
    }
}

impl Command {
    pub fn from_env() -> Self {
        Cli::parse().into_command()
    }

    /// Parse without exiting the process; help and version requests come
    /// back as errors carrying clap's rendered text.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Cli::try_parse_from(args)
            .map(Cli::into_command)
            .map_err(|e| Error::InvalidArgs(e.to_string()))
    }
}
