use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::info;

use crate::{Error, Result};

use super::{Config, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

const HEADER: &str = "# infobutton config\n";

/// `<config_dir>/infobutton/config.toml` for the current user.
pub fn default_path() -> Result<PathBuf> {
    ProjectDirs::from("", "", CONFIG_DIR_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .ok_or_else(|| Error::Config("could not determine a config directory".into()))
}

pub fn load_or_default() -> Result<Config> {
    load_or_create(&default_path()?)
}

/// Load `path`, writing a default file there first if it does not exist.
pub fn load_or_create(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        save_to_path(&cfg, path)?;
        info!("wrote default config to {}", path.display());
        return Ok(cfg);
    }
    load_from_path(path)
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)?;
    parse(&raw).map_err(|err| match err {
        Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render(config)?)?;
    Ok(())
}

pub fn render(config: &Config) -> Result<String> {
    let body = toml::to_string(config).map_err(|e| Error::Config(e.to_string()))?;
    Ok(format!("{HEADER}{body}"))
}

pub fn parse(raw: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(raw).map_err(|e| Error::Config(e.message().to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}
