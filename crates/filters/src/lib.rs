//! Filter grammar compilation and request filter parsing
//!
//! The grammar compiler turns per-operation configuration strings into an
//! immutable [`FilterRegistry`] at startup. The parser consumes request
//! query parameters against that registry, producing ordered
//! [`FilterClause`] lists for the SQL compiler.

mod grammar;
mod parser;

pub use grammar::{FilterRegistry, HandlerKind, OperatorDescriptor, UNBOUNDED};
pub use parser::{append_filter, parse_params, FilterClause, FilterValue, ParserLimits};
