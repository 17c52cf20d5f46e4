//! # parley-telemetry
//!
//! Subscriber setup for Parley binaries.
//!
//! Both initializers honour `RUST_LOG` (default `info`) and are safe to call
//! more than once: only the first call installs a subscriber.
//!
//! ```rust,ignore
//! parley_telemetry::init_telemetry("parley-server");
//! tracing::info!("ready");
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected 'text' or 'json'")),
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a human-readable subscriber.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_telemetry(service_name: &str) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    if installed {
        tracing::info!(service.name = service_name, "telemetry initialized");
    }
    installed
}

/// Install a JSON-lines subscriber for log aggregation.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_json_telemetry(service_name: &str) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_current_span(true).with_span_list(false))
        .try_init()
        .is_ok();
    if installed {
        tracing::info!(service.name = service_name, format = "json", "telemetry initialized");
    }
    installed
}

/// Install the subscriber matching `format`.
pub fn init_with_format(service_name: &str, format: LogFormat) -> bool {
    match format {
        LogFormat::Text => init_telemetry(service_name),
        LogFormat::Json => init_json_telemetry(service_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init_telemetry("test");
        assert!(!init_json_telemetry("test"));
        assert!(!init_telemetry("test"));
    }

    #[test]
    fn log_format_parses() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
