use std::path::Path;

use serde::Deserialize;

use crate::diagnostics::FuserError;

/// Environment variable that overrides `[log] filter`.
pub const LOG_ENV: &str = "FUSER_LOG";

/// Contents of `fuser.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub printer: PrinterSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrinterSettings {
    /// Prefix each printed statement with its arena index.
    pub show_ids: bool,
    /// Spaces before each expr line.
    pub indent: usize,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self { show_ids: true, indent: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

impl Settings {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, FuserError> {
        toml::from_str(content)
            .map_err(|e| FuserError::config(format!("fuser.toml: invalid config: {e}"), path.to_path_buf()))
    }

    pub fn load(path: &Path) -> Result<Self, FuserError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FuserError::config(format!("fuser.toml: could not read file: {e}"), path.to_path_buf())
        })?;
        Self::from_toml(&content, path)
    }

    /// Filter directive to log with: `FUSER_LOG` if set, else the config value.
    pub fn log_filter(&self) -> String {
        std::env::var(LOG_ENV).unwrap_or_else(|_| self.log.filter.clone())
    }
}
