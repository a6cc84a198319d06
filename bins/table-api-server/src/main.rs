use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::http::HeaderValue;
use axum::Router;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use table_api::{create_router, AppState};
use table_api_config::{Config, PoolConfig};
use table_api_filters::FilterRegistry;
use table_api_models::Specification;
use table_api_orm_gateway::{ExecutorConfig, QueryExecutor, QueryLimits};

/// table-api server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Override file location for the root path specification
    #[arg(long)]
    root_spec: Option<String>,

    /// Server port (overrides configuration)
    #[arg(long)]
    port: Option<u16>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting table-api server");

    let config = table_api_config::load(&args.config)?;

    let mut spec_paths = config.api.paths.clone();
    if let Some(root_spec) = args.root_spec {
        spec_paths.insert("/".to_string(), root_spec);
    }
    let specs = load_specs(&spec_paths)?;
    if !specs.contains_key("/") {
        bail!("no root spec in config paths, add a / entry");
    }

    // grammar errors are fatal before any traffic is served
    let registry = FilterRegistry::compile(&config.api.filters)?;
    audit_operator_shadowing(&registry, &specs);

    let db = config
        .db
        .clone()
        .context("no database configured for this environment")?;
    let public_pool = connect(&db.public).await?;
    let auth_pool = match &db.auth {
        Some(auth) => Some(connect(auth).await?),
        None => None,
    };

    let executor = QueryExecutor::new(
        public_pool,
        auth_pool,
        QueryLimits {
            default_limit: config.api.default_limit,
            max_limit: config.api.max_limit,
        },
        ExecutorConfig {
            auth_query: config.orm.auth_query.clone(),
            end_auth_query: config.orm.end_auth_query.clone(),
            query_timeout: config.orm.query_timeout,
        },
    );

    let port = args.port.unwrap_or(config.server.port);
    let cors = cors_layer(&config)?;
    let prefix = config.api.path_prefix.clone();
    let state = AppState::new(config, specs, registry, executor);

    let api = create_router(state);
    let app = if prefix.is_empty() || prefix == "/" {
        api
    } else {
        Router::new().nest(&prefix, api)
    }
    .layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on {addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_specs(paths: &BTreeMap<String, String>) -> Result<BTreeMap<String, Arc<Specification>>> {
    let mut specs = BTreeMap::new();
    for (mount, file) in paths {
        let raw = fs::read_to_string(file)
            .with_context(|| format!("could not read specification file {file}"))?;
        let spec: Specification = serde_json::from_str(&raw)
            .with_context(|| format!("invalid specification document {file}"))?;
        info!(mount = %mount, entities = spec.paths.len(), "mounted specification");
        specs.insert(mount.clone(), Arc::new(spec));
    }
    Ok(specs)
}

/// Surfaces configuration-time ambiguity: an entity field shadowing a
/// non-field operator name makes that operator unaddressable for the entity.
fn audit_operator_shadowing(
    registry: &FilterRegistry,
    specs: &BTreeMap<String, Arc<Specification>>,
) {
    for spec in specs.values() {
        for entity in spec.paths.values() {
            let shadowed = registry.field_collisions(entity);
            if !shadowed.is_empty() {
                warn!(
                    entity = %entity.name,
                    operators = ?shadowed,
                    "entity fields shadow filter operators"
                );
            }
        }
    }
}

async fn connect(config: &PoolConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .connect(&config.url)
        .await
        .context("could not connect to database")
}

fn cors_layer(config: &Config) -> Result<CorsLayer> {
    Ok(match &config.server.cors.origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("invalid CORS origin {origin}"))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    })
}
