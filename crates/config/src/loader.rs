use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::environment;
use crate::types::Config;

/// Loads configuration from a JSON file keyed by environment name, selecting
/// the section named by `APP_ENV`.
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read config file {}", path.display()))?;
    let env = environment::current();
    from_str(&raw, &env)
}

/// Parses an environment-sectioned config document.
pub fn from_str(raw: &str, env: &str) -> Result<Config> {
    let doc: BTreeMap<String, Value> =
        serde_json::from_str(raw).context("config file is not a JSON object")?;
    let Some(section) = doc.get(env) else {
        bail!("no config for env: {env}");
    };
    let config = serde_json::from_value(section.clone())
        .with_context(|| format!("invalid config section for env {env}"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
        "development": {
            "server": {"port": 3002, "cors": {"origin": "http://localhost:3002"}},
            "api": {
                "paths": {"/": "spec/product-api-spec.json", "acc": "spec/account-api-spec.json"},
                "path_prefix": "/api"
            }
        },
        "production": {
            "server": {"port": 8080}
        }
    }"#;

    #[test]
    fn selects_environment_section() {
        let config = from_str(RAW, "development").unwrap();
        assert_eq!(config.server.port, 3002);
        assert_eq!(config.api.paths.len(), 2);
        assert_eq!(
            config.server.cors.origin.as_deref(),
            Some("http://localhost:3002")
        );

        let prod = from_str(RAW, "production").unwrap();
        assert_eq!(prod.server.port, 8080);
        assert!(prod.api.paths.is_empty());
    }

    #[test]
    fn missing_environment_fails() {
        let err = from_str(RAW, "staging").unwrap_err();
        assert!(err.to_string().contains("no config for env: staging"));
    }
}
