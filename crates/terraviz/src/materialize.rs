use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tree::{GroupTree, NodeId, NodeKind, ResourceNode};

/// Icon value emitted when a configured icon cannot be read.
pub const ICON_PLACEHOLDER: &str = "@placeholder";

/// Label of the root-level bucket holding resources without a grouping position.
pub const UNGROUPED_LABEL: &str = "Ungrouped Resources";

/// Renderer-facing node: groups become enclosing boundaries, leaves become nodes.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Descriptor {
    Group {
        label: String,
        children: Vec<Descriptor>,
    },
    Leaf {
        address: String,
        /// Resource type.
        primary_label: String,
        /// Resolved display name.
        secondary_label: String,
        /// Icon file, [`ICON_PLACEHOLDER`], or `null` when no icon is configured.
        icon: Option<String>,
    },
}

impl Descriptor {
    pub fn is_group(&self) -> bool {
        matches!(self, Descriptor::Group { .. })
    }

    pub fn children(&self) -> &[Descriptor] {
        match self {
            Descriptor::Group { children, .. } => children,
            Descriptor::Leaf { .. } => &[],
        }
    }

    /// Addresses of every leaf below (or at) this descriptor, in walk order.
    pub fn leaf_addresses(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_addresses(self, &mut out);
        out
    }
}

fn collect_addresses<'a>(descriptor: &'a Descriptor, out: &mut Vec<&'a str>) {
    match descriptor {
        Descriptor::Leaf { address, .. } => out.push(address),
        Descriptor::Group { children, .. } => {
            for child in children {
                collect_addresses(child, out);
            }
        }
    }
}

/// Decides how a configured icon path is presented to the renderer.
pub trait IconResolver {
    /// Returns the path to hand to the renderer, or `None` when the icon is unusable.
    fn locate(&self, configured: &Path) -> Option<PathBuf>;
}

/// Checks icons on disk, resolving relative paths against `base`.
#[derive(Clone, Debug, Default)]
pub struct FilesystemIcons {
    base: Option<PathBuf>,
}

impl FilesystemIcons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }
}

impl IconResolver for FilesystemIcons {
    fn locate(&self, configured: &Path) -> Option<PathBuf> {
        let candidate = match &self.base {
            Some(base) if configured.is_relative() => base.join(configured),
            _ => configured.to_path_buf(),
        };
        let metadata = fs::metadata(&candidate).ok()?;
        if !metadata.is_file() {
            return None;
        }
        fs::File::open(&candidate).ok()?;
        fs::canonicalize(&candidate).ok()
    }
}

/// Passes configured icon paths through unchecked.
#[derive(Clone, Copy, Debug, Default)]
pub struct UncheckedIcons;

impl IconResolver for UncheckedIcons {
    fn locate(&self, configured: &Path) -> Option<PathBuf> {
        Some(configured.to_path_buf())
    }
}

/// Projects the finished tree into descriptors, depth-first in child order.
pub fn materialize(tree: &GroupTree, icons: &dyn IconResolver) -> Vec<Descriptor> {
    tree.children(tree.root())
        .iter()
        .map(|child| describe(tree, *child, icons))
        .collect()
}

fn describe(tree: &GroupTree, id: NodeId, icons: &dyn IconResolver) -> Descriptor {
    let node = tree.node(id);
    let children = || -> Vec<Descriptor> {
        node.children()
            .iter()
            .map(|child| describe(tree, *child, icons))
            .collect()
    };

    match node.kind() {
        NodeKind::Group(group) => Descriptor::Group {
            label: group.key.clone(),
            children: children(),
        },
        NodeKind::Ungrouped => Descriptor::Group {
            label: UNGROUPED_LABEL.to_string(),
            children: children(),
        },
        NodeKind::Root => Descriptor::Group {
            label: String::new(),
            children: children(),
        },
        NodeKind::Resource(resource) => describe_leaf(resource, icons),
    }
}

fn describe_leaf(resource: &ResourceNode, icons: &dyn IconResolver) -> Descriptor {
    let icon = resource.icon_path.as_deref().map(|configured| {
        icons
            .locate(configured)
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| ICON_PLACEHOLDER.to_string())
    });

    Descriptor::Leaf {
        address: resource.address.clone(),
        primary_label: resource.resource_type.clone(),
        secondary_label: resource.display_name.clone(),
        icon,
    }
}
