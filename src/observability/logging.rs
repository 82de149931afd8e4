//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level so a single run can be made
//! verbose without editing the config file.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global tracing subscriber.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

fn default_filter(level: &str) -> String {
    format!("dropship_core={level},dropship_cli={level},warn")
}

/// Show only the head of a secret value.
pub fn mask(value: &str) -> String {
    const VISIBLE: usize = 8;
    if value.chars().count() <= VISIBLE {
        return "***".to_string();
    }
    let head: String = value.chars().take(VISIBLE).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask("v^1.1#i^1#p^3#r^1#f^0#I^3#t^H4s"), "v^1.1#i^...");
        assert_eq!(mask("short"), "***");
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter("debug"),
            "dropship_core=debug,dropship_cli=debug,warn"
        );
    }
}
