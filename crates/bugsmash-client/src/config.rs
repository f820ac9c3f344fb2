//! Client configuration loaded from environment variables.
//!
//! Everything has a default so the client starts with zero configuration
//! for local development.

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whether to seed the demo fixtures into empty collections on startup.
    /// Env: `BUGSMASH_SEED_FIXTURES` (true/false)
    /// Default: `true`
    pub seed_fixtures: bool,

    /// How many bugs the dashboard's "recently reported" panel shows.
    /// Env: `BUGSMASH_RECENT_LIMIT`
    /// Default: `5`
    pub recent_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            seed_fixtures: true,
            recent_limit: 5,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("BUGSMASH_SEED_FIXTURES") {
            match val.as_str() {
                "true" | "1" => config.seed_fixtures = true,
                "false" | "0" => config.seed_fixtures = false,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid BUGSMASH_SEED_FIXTURES, using default"
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("BUGSMASH_RECENT_LIMIT") {
            if let Ok(n) = val.parse::<usize>() {
                config.recent_limit = n;
            } else {
                tracing::warn!(
                    value = %val,
                    "Invalid BUGSMASH_RECENT_LIMIT, using default"
                );
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_need_no_environment() {
        let config = ClientConfig::default();
        assert!(config.seed_fixtures);
        assert_eq!(config.recent_limit, 5);
    }

    // The only test touching these variables, so no cross-test interference.
    #[test]
    fn from_env_applies_overrides_and_keeps_defaults_on_junk() {
        std::env::set_var("BUGSMASH_SEED_FIXTURES", "false");
        std::env::set_var("BUGSMASH_RECENT_LIMIT", "9");
        let config = ClientConfig::from_env();
        assert!(!config.seed_fixtures);
        assert_eq!(config.recent_limit, 9);

        std::env::set_var("BUGSMASH_SEED_FIXTURES", "maybe");
        std::env::set_var("BUGSMASH_RECENT_LIMIT", "many");
        let config = ClientConfig::from_env();
        assert!(config.seed_fixtures);
        assert_eq!(config.recent_limit, 5);

        std::env::remove_var("BUGSMASH_SEED_FIXTURES");
        std::env::remove_var("BUGSMASH_RECENT_LIMIT");
    }
}
