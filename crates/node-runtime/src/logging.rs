//! Global tracing subscriber from `log.{format, level}`.

use anyhow::{anyhow, bail, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::container::config::LogConfig;

/// Output selected by `log.format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines; `text` and `fmt` are synonyms.
    Text,
    Json,
    /// No subscriber at all.
    Silent,
}

impl LogFormat {
    pub fn parse(format: &str) -> Result<Self> {
        match format {
            "text" | "fmt" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "none" => Ok(LogFormat::Silent),
            other => bail!("unknown log.format '{}'", other),
        }
    }
}

/// `EnvFilter` for `log.level`; `none` turns every event off.
fn level_filter(level: &str) -> Result<EnvFilter> {
    let directive = match level {
        "none" => "off",
        other => other,
    };
    EnvFilter::try_new(directive).map_err(|e| anyhow!("log.level '{}': {}", level, e))
}

/// Install the global subscriber. `none` installs nothing.
pub fn init_logging(log: &LogConfig) -> Result<()> {
    let format = LogFormat::parse(&log.format)?;
    let filter = level_filter(&log.level)?;
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Silent => {}
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_configured_format_is_accepted() {
        assert_eq!(LogFormat::parse("text").unwrap(), LogFormat::Text);
        assert_eq!(LogFormat::parse("fmt").unwrap(), LogFormat::Text);
        assert_eq!(LogFormat::parse("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("none").unwrap(), LogFormat::Silent);
        assert_eq!(LogFormat::parse("").unwrap(), LogFormat::Text);
        assert!(LogFormat::parse("xml").is_err());
    }

    #[test]
    fn test_every_configured_level_builds_a_filter() {
        for level in ["debug", "info", "error", "none"] {
            assert!(level_filter(level).is_ok(), "level {}", level);
        }
    }

    #[test]
    fn test_silent_format_installs_nothing() {
        let log = LogConfig {
            format: "none".to_string(),
            level: "info".to_string(),
        };
        init_logging(&log).unwrap();
        init_logging(&log).unwrap();
    }
}
