//! Logging initialization module
//!
//! Provides a single initialization point for the logging facility.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Compact human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// Per-test captured output, shown only for failing tests
    Test,
}

impl Profile {
    /// Filter applied when `RUST_LOG` is not set
    fn default_filter(self) -> &'static str {
        match self {
            Profile::Development => "tabwrap=debug",
            Profile::Production => "tabwrap=info",
            Profile::Test => "tabwrap=trace",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Call once at application startup. Subsequent calls are no-ops.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        match profile {
            Profile::Development => builder.compact().init(),
            Profile::Production => builder.json().init(),
            Profile::Test => builder.with_test_writer().init(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_per_profile() {
        assert_eq!(Profile::Development.default_filter(), "tabwrap=debug");
        assert_eq!(Profile::Production.default_filter(), "tabwrap=info");
        assert_eq!(Profile::Test.default_filter(), "tabwrap=trace");
    }

    #[test]
    fn test_init_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
        init(Profile::Test);
    }
}
