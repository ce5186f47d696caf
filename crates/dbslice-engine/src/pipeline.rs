//! Dump pipeline
//!
//! Thin orchestration: resolve the reachable table graph, order it for
//! restore, then serialize every table block into the sink.

use std::io::Write;

use dbslice_catalog::Catalog;
use dbslice_core::Settings;
use tracing::info;

use crate::{sequence, DumpError, Resolver, Serializer};

/// End-to-end dump run over one catalog.
pub struct Dumper<'a, C: Catalog> {
    catalog: &'a C,
    settings: &'a Settings,
}

impl<'a, C: Catalog> Dumper<'a, C> {
    pub fn new(catalog: &'a C, settings: &'a Settings) -> Self {
        Self { catalog, settings }
    }

    /// Run resolution, ordering and serialization, writing the dump into
    /// `sink`. Any failure aborts the run; partially written output is
    /// left as-is.
    pub async fn dump_to<W: Write>(&self, sink: &mut W) -> Result<(), DumpError> {
        let resolver = Resolver::new(self.catalog, self.settings);
        let registry = resolver.resolve().await?;

        let root_order: Vec<String> = self
            .settings
            .tables
            .iter()
            .map(|spec| spec.name.clone())
            .collect();
        let ordered = sequence(&registry, &root_order);
        info!(tables = ordered.len(), "resolved table graph");

        let serializer = Serializer::new(self.catalog, &self.settings.schema_name);
        serializer.serialize(&ordered, sink).await
    }
}
