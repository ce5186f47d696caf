//! Dump engine
//!
//! The three core pieces of the dumper: the dependency-graph resolver
//! (BFS over foreign-key edges), the topological sequencer (DFS
//! post-order restore ordering) and the dump serializer (COPY-format
//! output), plus the thin pipeline that wires them together.

pub mod pipeline;
pub mod resolver;
pub mod sequencer;
pub mod serializer;

pub use pipeline::Dumper;
pub use resolver::Resolver;
pub use sequencer::sequence;
pub use serializer::Serializer;

use dbslice_catalog::CatalogError;

/// Errors surfaced by the dump engine. Nothing is recovered locally;
/// every variant aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("unsupported key type {type_name} in column {column}")]
    UnsupportedKeyType {
        column: String,
        type_name: &'static str,
    },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}
