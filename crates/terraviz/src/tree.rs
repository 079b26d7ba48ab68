use std::path::PathBuf;

use crate::catalog::RecordIndex;

/// Handle into a [`GroupTree`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

/// Internal node that merges resources sharing a resolved key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupNode {
    pub key: String,
    /// Number of group ancestors; top-level groups sit at depth 0.
    pub depth: usize,
    /// Identity other resources can reference through `group_id`.
    pub anchor_value: Option<String>,
}

/// Leaf standing for exactly one catalog record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceNode {
    pub record: RecordIndex,
    pub address: String,
    pub resource_type: String,
    pub display_name: String,
    pub icon_path: Option<PathBuf>,
}

impl ResourceNode {
    /// `type: display name`, the combined leaf label.
    pub fn label(&self) -> String {
        format!("{}: {}", self.resource_type, self.display_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    /// Root-level bucket for resources that have no grouping position.
    Ungrouped,
    Group(GroupNode),
    Resource(ResourceNode),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceNode> {
        match &self.kind {
            NodeKind::Resource(resource) => Some(resource),
            _ => None,
        }
    }
}

/// Arena-backed nesting tree produced by the grouping engine.
///
/// Children are kept in insertion order. Only the engine mutates the tree;
/// once handed out it is read-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupTree {
    nodes: Vec<Node>,
    ungrouped: Option<NodeId>,
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            ungrouped: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn ungrouped(&self) -> Option<NodeId> {
        self.ungrouped
    }

    /// Leaves reachable from the root, depth-first in child order.
    pub fn leaves(&self) -> Vec<&ResourceNode> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if let NodeKind::Resource(resource) = &node.kind {
                out.push(resource);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn find_leaf(&self, address: &str) -> Option<NodeId> {
        self.walk()
            .into_iter()
            .find(|id| matches!(self.node(*id).as_resource(), Some(r) if r.address == address))
    }

    /// Every node reachable from the root, depth-first in child order.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// Keys of the group ancestors of `id`, outermost first.
    pub fn group_path(&self, id: NodeId) -> Vec<&str> {
        let mut keys = Vec::new();
        let mut cursor = self.node(id).parent;
        while let Some(parent) = cursor {
            if let Some(group) = self.node(parent).as_group() {
                keys.push(group.key.as_str());
            }
            cursor = self.node(parent).parent;
        }
        keys.reverse();
        keys
    }

    pub(crate) fn add_group(&mut self, key: String, anchor_value: Option<String>) -> NodeId {
        self.push(NodeKind::Group(GroupNode {
            key,
            depth: 0,
            anchor_value,
        }))
    }

    pub(crate) fn add_resource(&mut self, resource: ResourceNode) -> NodeId {
        self.push(NodeKind::Resource(resource))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub(crate) fn group_mut(&mut self, id: NodeId) -> Option<&mut GroupNode> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Appends a detached node under `parent` and fixes the depth of any groups it carries.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.0].parent.is_none());
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        let depth = self.child_depth(parent);
        self.set_depth(child, depth);
    }

    /// Detaches every child of `from`, returning them in order.
    pub(crate) fn take_children(&mut self, from: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[from.0].children);
        for child in &children {
            self.nodes[child.0].parent = None;
        }
        children
    }

    /// Depth a group gets when appended under `parent`.
    fn child_depth(&self, parent: NodeId) -> usize {
        match &self.nodes[parent.0].kind {
            NodeKind::Root => 0,
            NodeKind::Ungrouped => 1,
            NodeKind::Group(group) => group.depth + 1,
            NodeKind::Resource(_) => 0,
        }
    }

    /// Whether `ancestor` is `id` or lies on the parent chain of `id`.
    pub(crate) fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes[current.0].parent;
        }
        false
    }

    pub(crate) fn ungrouped_bucket(&mut self) -> NodeId {
        if let Some(id) = self.ungrouped {
            return id;
        }
        let id = self.push(NodeKind::Ungrouped);
        let root = self.root();
        self.attach(root, id);
        self.ungrouped = Some(id);
        id
    }

    fn set_depth(&mut self, id: NodeId, depth: usize) {
        let mut stack = vec![(id, depth)];
        while let Some((current, depth)) = stack.pop() {
            let node = &mut self.nodes[current.0];
            if let NodeKind::Group(group) = &mut node.kind {
                group.depth = depth;
                stack.extend(node.children.iter().map(|child| (*child, depth + 1)));
            }
        }
    }
}
