use serde::Deserialize;

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info",
    /// "relay_server=debug,info")
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
    /// Extra diagnostics for request debugging
    #[serde(default)]
    pub debug_options: DebugOptions,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            debug_options: DebugOptions::default(),
        }
    }
}

fn default_level() -> String {
    "info".to_owned()
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Extra diagnostics for request debugging
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOptions {
    /// Log inbound request bodies at trace level
    #[serde(default)]
    pub log_request_body: bool,
    /// Log upstream response headers at trace level
    #[serde(default)]
    pub log_response_headers: bool,
}
