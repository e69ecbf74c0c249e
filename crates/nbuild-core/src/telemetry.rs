//! Tracing initialisation for the nbuild binary.
//!
//! Logs go to stderr so they never interleave with the progress line or the
//! diagnostics report on stdout.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json` - emit newline-delimited JSON log lines.
/// * `level` - default verbosity when `RUST_LOG` is not set or unparsable.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let filter = filter_for(level, std::env::var("RUST_LOG").ok().as_deref());

    let (text_layer, json_layer) = if json {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .json();
        (None, Some(layer))
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(console::colors_enabled_stderr());
        (Some(layer), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .is_ok()
}

/// `RUST_LOG` directives when given and valid, otherwise `level`.
fn filter_for(level: Level, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level.as_str()))
}

/// Parse a level name, case-insensitively.
pub fn parse_level(name: &str) -> Option<Level> {
    name.parse::<Level>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("WARN"), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_filter_falls_back_to_level() {
        assert_eq!(filter_for(Level::WARN, None).to_string(), "warn");
    }

    #[test]
    fn test_filter_prefers_rust_log() {
        assert_eq!(
            filter_for(Level::WARN, Some("nbuild_core=debug")).to_string(),
            "nbuild_core=debug"
        );
    }

    #[test]
    fn test_second_init_is_ignored() {
        init_tracing(false, Level::INFO);
        assert!(!init_tracing(true, Level::DEBUG));
    }
}
