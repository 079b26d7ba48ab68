pub mod attributes;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod diagram;
pub mod dot;
pub mod engine;
pub mod error;
pub mod materialize;
pub mod path;
pub mod plan;
pub mod render;
pub mod tree;

pub use attributes::{AttributeMap, AttributeValue, Scalar, attribute_map};
pub use catalog::{RecordIndex, ResourceCatalog, ResourceRecord};
pub use config::{
    RawTypeConfig, TypeConfig, TypeConfigTable, load_config, parse_hcl_config, parse_json_config,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use diagram::Diagram;
pub use dot::to_dot;
pub use engine::{GroupingEngine, GroupingOutcome, group_resources};
pub use error::TerravizError;
pub use materialize::{
    Descriptor, FilesystemIcons, ICON_PLACEHOLDER, IconResolver, UNGROUPED_LABEL, UncheckedIcons,
    materialize,
};
pub use path::{AttributePath, LabelTemplate, PathFailure};
pub use plan::{load_plan, parse_plan};
pub use render::{DiagramFormat, DiagramWriter};
pub use tree::{GroupNode, GroupTree, Node, NodeId, NodeKind, ResourceNode};
