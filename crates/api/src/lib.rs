//! HTTP surface for table-api
//!
//! Maps HTTP requests onto canonical, entity-scoped queries: the resolver
//! walks path segments against the mounted specifications, the validators
//! enforce per-operation structural rules, and the route handlers wire both
//! to the filter parser and the query executor.

pub mod device;
pub mod resolver;
pub mod routes;
pub mod state;
pub mod validators;

pub use routes::create_router;
pub use state::AppState;
