use std::env;

/// Name of the environment variable selecting the active config section.
pub const ENV_VAR: &str = "APP_ENV";

/// Active environment name, defaulting to `development`.
pub fn current() -> String {
    env::var(ENV_VAR).unwrap_or_else(|_| "development".to_string())
}
