use std::collections::BTreeMap;
use std::sync::Arc;

use table_api_config::Config;
use table_api_filters::{FilterRegistry, ParserLimits};
use table_api_models::Specification;
use table_api_orm_gateway::QueryExecutor;

/// Process-wide application state: immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Mount key to specification document. The root mount key is `/`.
    pub specs: Arc<BTreeMap<String, Arc<Specification>>>,
    pub registry: Arc<FilterRegistry>,
    pub executor: Arc<QueryExecutor>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        specs: BTreeMap<String, Arc<Specification>>,
        registry: FilterRegistry,
        executor: QueryExecutor,
    ) -> Self {
        Self {
            specs: Arc::new(specs),
            registry: Arc::new(registry),
            executor: Arc::new(executor),
            config: Arc::new(config),
        }
    }

    pub fn parser_limits(&self) -> ParserLimits {
        ParserLimits {
            max_filters: self.config.api.max_filters,
            max_limit: self.config.api.max_limit,
        }
    }
}
