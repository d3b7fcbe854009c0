
use {
    crate::{root::RootConfig, vsync_source::VsyncSourceKind},
    log::Level,
    serde::Deserialize,
    std::{io, path::Path, time::Duration},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {0}")]
    Read(String, #[source] io::Error),
    #[error("Could not parse the config")]
    Parse(#[source] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WmConfig {
    pub refresh_period_ms: u64,
    pub vsync_source: VsyncSourceKind,
    pub trace_frames: bool,
    pub buffers_per_window: usize,
    pub log_level: LogLevel,
}

impl Default for WmConfig {
    fn default() -> Self {
        Self {
            refresh_period_ms: 16,
            vsync_source: VsyncSourceKind::Auto,
            trace_frames: false,
            buffers_per_window: 2,
            log_level: LogLevel::Info,
        }
    }
}

impl WmConfig {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
        Self::parse(&s)
    }

    pub fn root_config(&self) -> RootConfig {
        RootConfig {
            vsync_source: self.vsync_source,
            refresh_period: Duration::from_millis(self.refresh_period_ms.max(1)),
            trace_frames: self.trace_frames,
            buffers_per_window: self.buffers_per_window.max(1),
        }
    }
}
