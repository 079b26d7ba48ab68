use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::ResourceCatalog;
use crate::config::TypeConfigTable;
use crate::diagnostics::Diagnostics;
use crate::engine::GroupingEngine;
use crate::materialize::{Descriptor, IconResolver, materialize};

/// Renderer-ready result of one run: descriptor tree plus the diagnostics it produced.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Diagram {
    pub resources: usize,
    pub descriptors: Vec<Descriptor>,
    pub diagnostics: Diagnostics,
}

impl Diagram {
    /// Runs the grouping engine and materializes its tree.
    pub fn build(
        catalog: &ResourceCatalog,
        config: &TypeConfigTable,
        icons: &dyn IconResolver,
    ) -> Self {
        let outcome = GroupingEngine::new(catalog, config).run();
        let descriptors = materialize(&outcome.tree, icons);
        tracing::debug!(
            resources = catalog.len(),
            diagnostics = outcome.diagnostics.len(),
            "diagram built"
        );
        Self {
            resources: catalog.len(),
            descriptors,
            diagnostics: outcome.diagnostics,
        }
    }

    pub fn leaf_addresses(&self) -> Vec<&str> {
        self.descriptors
            .iter()
            .flat_map(Descriptor::leaf_addresses)
            .collect()
    }
}
