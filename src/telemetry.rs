use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

use crate::util::env::{env_opt, init_env};

/// Used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event, with file/line locations.
    Full,
    Compact,
}

impl LogFormat {
    /// `LOG_FORMAT=compact` selects [`LogFormat::Compact`]; anything else is full.
    /// Reads `.env` first.
    pub fn from_env() -> Self {
        Self::parse(env_opt("LOG_FORMAT").as_deref())
    }

    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("compact") => LogFormat::Compact,
            _ => LogFormat::Full,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str, format: LogFormat) -> Result<(), anyhow::Error> {
    init_env();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Full => builder.with_file(true).with_line_number(true).try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_is_case_insensitive() {
        assert_eq!(LogFormat::parse(Some(" Compact ")), LogFormat::Compact);
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Full);
        assert_eq!(LogFormat::parse(None), LogFormat::Full);
    }

    #[test]
    fn from_env_sees_values_loaded_after_dotenv() {
        init_env();
        std::env::set_var("LOG_FORMAT", "compact");
        assert_eq!(LogFormat::from_env(), LogFormat::Compact);
        std::env::remove_var("LOG_FORMAT");
    }
}
