use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the server and the query pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub orm: OrmConfig,
    #[serde(default)]
    pub db: Option<DbConfig>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::port")]
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Upper bound on query-string parameters per request.
    #[serde(default = "defaults::max_params")]
    pub max_params: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            cors: CorsConfig::default(),
            max_params: defaults::max_params(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origin; any origin when absent.
    #[serde(default)]
    pub origin: Option<String>,
}

/// Settings for the API surface and the filter grammar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Mount key to specification file. The root mount key is `/`.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    #[serde(default = "defaults::path_prefix")]
    pub path_prefix: String,
    /// Per-operation filter grammar, keyed by CRUD letter.
    #[serde(default = "defaults::filter_grammar")]
    pub filters: BTreeMap<String, String>,
    /// Maximum filter clauses per query.
    #[serde(default = "defaults::max_filters")]
    pub max_filters: usize,
    /// LIMIT applied to reads when the request does not set one.
    #[serde(default = "defaults::default_limit")]
    pub default_limit: u64,
    /// Ceiling any requested LIMIT is clamped to.
    #[serde(default = "defaults::max_limit")]
    pub max_limit: u64,
    /// Header carrying the bearer token for protected entities.
    #[serde(default = "defaults::auth_header")]
    pub auth_header: String,
    /// Query parameter accepted as a token fallback.
    #[serde(default = "defaults::auth_param")]
    pub auth_param: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            paths: BTreeMap::new(),
            path_prefix: defaults::path_prefix(),
            filters: defaults::filter_grammar(),
            max_filters: defaults::max_filters(),
            default_limit: defaults::default_limit(),
            max_limit: defaults::max_limit(),
            auth_header: defaults::auth_header(),
            auth_param: defaults::auth_param(),
        }
    }
}

/// Settings for query execution against the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrmConfig {
    /// Statement opening an authenticated session; bound to (token, device).
    #[serde(default = "defaults::auth_query")]
    pub auth_query: String,
    /// Statement closing an authenticated session on the same connection.
    #[serde(default = "defaults::end_auth_query")]
    pub end_auth_query: String,
    /// Per-statement timeout in seconds.
    #[serde(default = "defaults::query_timeout")]
    pub query_timeout: u64,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            auth_query: defaults::auth_query(),
            end_auth_query: defaults::end_auth_query(),
            query_timeout: defaults::query_timeout(),
        }
    }
}

/// Connection pools: one for public entities, an optional elevated one for
/// protected entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub public: PoolConfig,
    #[serde(default)]
    pub auth: Option<PoolConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub url: String,
    #[serde(default = "defaults::max_connections")]
    pub max_connections: u32,
    /// Connect timeout in seconds.
    #[serde(default = "defaults::connect_timeout")]
    pub connect_timeout: u64,
}

mod defaults {
    use std::collections::BTreeMap;

    pub fn port() -> u16 {
        3002
    }

    pub fn max_params() -> usize {
        50
    }

    pub fn path_prefix() -> String {
        "/api".to_string()
    }

    pub fn filter_grammar() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("C".to_string(), String::new()),
            (
                "R".to_string(),
                "id:0-1,eq:0+,ne:0+,gt:0+,ge:0+,lt:0+,le:0+,like:0+,ilike:0+,in:0+,\
                 offset:0-1,limit:0-1,order_asc:0-1,order_desc:0-1"
                    .to_string(),
            ),
            ("U".to_string(), "id:1".to_string()),
            ("D".to_string(), "id:1".to_string()),
        ])
    }

    pub fn max_filters() -> usize {
        20
    }

    pub fn default_limit() -> u64 {
        20
    }

    pub fn max_limit() -> u64 {
        100
    }

    pub fn auth_header() -> String {
        "x-api-authtoken".to_string()
    }

    pub fn auth_param() -> String {
        "auth_token".to_string()
    }

    pub fn auth_query() -> String {
        "SELECT * FROM auth.authenticate($1, $2)".to_string()
    }

    pub fn end_auth_query() -> String {
        "SELECT * FROM auth.end_authentication()".to_string()
    }

    pub fn query_timeout() -> u64 {
        30
    }

    pub fn max_connections() -> u32 {
        10
    }

    pub fn connect_timeout() -> u64 {
        5
    }
}
