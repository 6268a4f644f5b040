use std::{env, path::PathBuf, str::FromStr};

use log::LevelFilter;

use super::schema::Settings;
use crate::apply::OverwriteMode;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `MSUPACK__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("MSUPACK")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.apply.non_interactive_resolution == OverwriteMode::Ask {
            return Err("apply.non_interactive_resolution must be overwrite or skip".to_string());
        }
        if self.log_level().is_none() {
            return Err(format!("logging.level {:?} is not a log level", self.logging.level));
        }
        Ok(())
    }

    /// Parsed `logging.level`, `None` when it is not a known level name.
    pub fn log_level(&self) -> Option<LevelFilter> {
        LevelFilter::from_str(self.logging.level.trim()).ok()
    }

    /// Render the effective settings as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Resolve the config path from `MSUPACK_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("MSUPACK_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/msupack/config.toml`
/// or `~/.config/msupack/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else if let Some(home) = env::var_os("HOME") {
        Some(PathBuf::from(home).join(".config"))
    } else {
        None
    };

    config_home.map(|d| d.join("msupack").join("config.toml"))
}
