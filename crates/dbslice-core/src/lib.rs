//! dbslice core
//!
//! Domain model shared by the resolver, sequencer and serializer:
//! foreign-key descriptors, the per-run table registry, scalar column
//! values, and the TOML configuration surface.

pub mod config;
pub mod schema;
pub mod value;

pub use config::{Config, ConfigError, DatabaseConfig, Settings, TableFilter, TableSpec};
pub use schema::{Direction, Filters, FkDescriptor, Registry, TableNode};
pub use value::SqlValue;
