use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{RecordIndex, ResourceCatalog, ResourceRecord};
use crate::config::{TypeConfig, TypeConfigTable};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::tree::{GroupTree, NodeId, ResourceNode};

/// Finished grouping run: the tree plus every diagnostic recorded on the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupingOutcome {
    pub tree: GroupTree,
    pub diagnostics: Diagnostics,
}

/// Builds the nesting tree from a catalog and its type configuration.
///
/// Runs two ordered passes. Pass 1 places every anchor resource and indexes
/// its anchor value, so Pass 2 can attach `group_id` resources regardless of
/// whether the anchor appears earlier or later in the catalog.
pub struct GroupingEngine<'a> {
    catalog: &'a ResourceCatalog,
    config: &'a TypeConfigTable,
}

impl<'a> GroupingEngine<'a> {
    pub fn new(catalog: &'a ResourceCatalog, config: &'a TypeConfigTable) -> Self {
        Self { catalog, config }
    }

    pub fn run(&self) -> GroupingOutcome {
        let mut builder = TreeBuilder::default();
        builder.index_anchors(self.catalog, self.config);
        builder.place_resources(self.catalog, self.config);
        GroupingOutcome {
            tree: builder.tree,
            diagnostics: builder.diagnostics,
        }
    }
}

/// Convenience wrapper around [`GroupingEngine::run`].
pub fn group_resources(catalog: &ResourceCatalog, config: &TypeConfigTable) -> GroupingOutcome {
    GroupingEngine::new(catalog, config).run()
}

#[derive(Default)]
struct TreeBuilder {
    tree: GroupTree,
    /// `(parent, key)` to the group occupying that position, across all types.
    merge_index: BTreeMap<(NodeId, String), NodeId>,
    anchors: BTreeMap<String, NodeId>,
    placed: BTreeSet<RecordIndex>,
    diagnostics: Diagnostics,
}

impl TreeBuilder {
    /// Pass 1: place anchor resources and record their anchor values.
    fn index_anchors(&mut self, catalog: &ResourceCatalog, table: &TypeConfigTable) {
        let mut chained = Vec::new();

        for (index, record) in catalog.iter() {
            let config = table.get(&record.resource_type);
            let Some(anchor_path) = &config.anchor_id_path else {
                continue;
            };
            let anchor = anchor_path.resolve_or_record(
                &record.attributes,
                &record.address,
                &mut self.diagnostics,
            );
            if anchor.is_empty() {
                tracing::debug!(address = %record.address, "anchor value empty; placing as a plain resource");
                continue;
            }

            let group = if config.group_id_path.is_some() {
                let group = self.tree.add_group(anchor.clone(), Some(anchor.clone()));
                chained.push((index, group));
                group
            } else {
                let parent = self.walk_grouped_by(record, config);
                let group = self.find_or_create_group(parent, &anchor);
                if let Some(node) = self.tree.group_mut(group) {
                    node.anchor_value = Some(anchor.clone());
                }
                group
            };

            let leaf = self.make_leaf(index, record, config);
            self.tree.attach(group, leaf);
            self.register_anchor(&record.address, anchor, group);
            self.placed.insert(index);
        }

        for (index, group) in chained {
            let Some(record) = catalog.get(index) else {
                continue;
            };
            let config = table.get(&record.resource_type);
            let parent = match self.lookup_target(record, config) {
                Some(target) if self.tree.is_ancestor(group, target) => {
                    self.diagnostics.record(
                        DiagnosticKind::AttachmentCycle,
                        &record.address,
                        "group_id would nest this anchor inside itself; placed in the ungrouped bucket",
                    );
                    self.tree.ungrouped_bucket()
                }
                Some(target) => target,
                None => self.tree.ungrouped_bucket(),
            };
            self.attach_group(parent, group);
        }

        tracing::debug!(anchors = self.anchors.len(), "anchor indexing complete");
    }

    /// Pass 2: place every resource not already placed as an anchor, in catalog order.
    fn place_resources(&mut self, catalog: &ResourceCatalog, table: &TypeConfigTable) {
        for (index, record) in catalog.iter() {
            if self.placed.contains(&index) {
                continue;
            }
            let config = table.get(&record.resource_type);
            let parent = if config.group_id_path.is_some() {
                self.lookup_target(record, config)
                    .unwrap_or_else(|| self.tree.ungrouped_bucket())
            } else {
                match self.walk_grouped_by(record, config) {
                    parent if parent == self.tree.root() => self.tree.ungrouped_bucket(),
                    parent => parent,
                }
            };
            let leaf = self.make_leaf(index, record, config);
            self.tree.attach(parent, leaf);
            self.placed.insert(index);
        }

        tracing::debug!(placed = self.placed.len(), "placement complete");
    }

    /// Descends from the root through `grouped_by`, merging or creating one
    /// group per level. Levels whose key is empty are skipped.
    fn walk_grouped_by(&mut self, record: &ResourceRecord, config: &TypeConfig) -> NodeId {
        let mut parent = self.tree.root();
        for (level, path) in config.grouped_by.iter().enumerate() {
            match path.resolve(&record.attributes) {
                Ok(key) if key.is_empty() => {
                    self.diagnostics.record(
                        DiagnosticKind::EmptyGroupKey,
                        &record.address,
                        format!("grouping level {level} ('{path}') is empty; level skipped"),
                    );
                }
                Ok(key) => parent = self.find_or_create_group(parent, &key),
                Err(failure) => {
                    self.diagnostics.record(
                        DiagnosticKind::UnresolvedPath,
                        &record.address,
                        format!(
                            "path '{path}' did not resolve: {failure}; grouping level {level} skipped"
                        ),
                    );
                }
            }
        }
        parent
    }

    /// Resolves `group_id` against the anchor index. `None` means the caller
    /// falls back to the ungrouped bucket; the reason is already recorded.
    fn lookup_target(&mut self, record: &ResourceRecord, config: &TypeConfig) -> Option<NodeId> {
        let path = config.group_id_path.as_ref()?;
        let reference = match path.resolve(&record.attributes) {
            Ok(reference) => reference,
            Err(failure) => {
                self.diagnostics.record(
                    DiagnosticKind::UnresolvedPath,
                    &record.address,
                    format!(
                        "path '{path}' did not resolve: {failure}; placed in the ungrouped bucket"
                    ),
                );
                return None;
            }
        };

        match self.anchors.get(&reference) {
            Some(target) => Some(*target),
            None => {
                self.diagnostics.record(
                    DiagnosticKind::DanglingGroupReference,
                    &record.address,
                    format!(
                        "no anchor matches group_id '{reference}'; placed in the ungrouped bucket"
                    ),
                );
                None
            }
        }
    }

    fn find_or_create_group(&mut self, parent: NodeId, key: &str) -> NodeId {
        let slot = (parent, key.to_string());
        if let Some(existing) = self.merge_index.get(&slot) {
            return *existing;
        }
        let group = self.tree.add_group(key.to_string(), None);
        self.tree.attach(parent, group);
        self.merge_index.insert(slot, group);
        group
    }

    /// Attaches a detached anchor group, merging it into an existing sibling with the same key.
    fn attach_group(&mut self, parent: NodeId, group: NodeId) {
        let Some(key) = self.tree.node(group).as_group().map(|g| g.key.clone()) else {
            return;
        };
        match self.merge_index.get(&(parent, key.clone())).copied() {
            Some(existing) => self.merge_group(existing, group),
            None => {
                self.tree.attach(parent, group);
                self.merge_index.insert((parent, key), group);
            }
        }
    }

    /// Folds `from` into `into`. Child groups whose key already exists under
    /// `into` merge recursively; the rest move over with their index slots.
    fn merge_group(&mut self, into: NodeId, from: NodeId) {
        let anchor = self
            .tree
            .node(from)
            .as_group()
            .and_then(|g| g.anchor_value.clone());
        if let (Some(anchor), Some(node)) = (anchor, self.tree.group_mut(into)) {
            node.anchor_value = Some(anchor);
        }
        for target in self.anchors.values_mut() {
            if *target == from {
                *target = into;
            }
        }

        for child in self.tree.take_children(from) {
            let Some(key) = self.tree.node(child).as_group().map(|g| g.key.clone()) else {
                self.tree.attach(into, child);
                continue;
            };
            self.merge_index.remove(&(from, key.clone()));
            match self.merge_index.get(&(into, key.clone())).copied() {
                Some(existing) => self.merge_group(existing, child),
                None => {
                    self.tree.attach(into, child);
                    self.merge_index.insert((into, key), child);
                }
            }
        }
        tracing::debug!(?into, ?from, "merged anchor group into existing sibling");
    }

    fn register_anchor(&mut self, address: &str, anchor: String, group: NodeId) {
        if self.anchors.contains_key(&anchor) {
            self.diagnostics.record(
                DiagnosticKind::DuplicateAnchor,
                address,
                format!("anchor '{anchor}' was already declared; this resource replaces it"),
            );
        }
        self.anchors.insert(anchor, group);
    }

    fn make_leaf(
        &mut self,
        index: RecordIndex,
        record: &ResourceRecord,
        config: &TypeConfig,
    ) -> NodeId {
        let rendered = config.name_template.render(
            &record.attributes,
            &record.address,
            &mut self.diagnostics,
        );
        let display_name = if !rendered.is_empty() {
            rendered
        } else {
            match record.name() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => record.address.clone(),
            }
        };

        self.tree.add_resource(ResourceNode {
            record: index,
            address: record.address.clone(),
            resource_type: record.resource_type.clone(),
            display_name,
            icon_path: config.icon_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::attribute_map;
    use crate::config::parse_json_config;
    use crate::tree::NodeKind;
    use serde_json::{Value, json};

    fn record(address: &str, resource_type: &str, values: Value) -> ResourceRecord {
        let name = address.rsplit('.').next().unwrap_or(address);
        ResourceRecord::new(
            address,
            resource_type,
            attribute_map(json!({"name": name, "values": values})),
        )
    }

    fn run(records: Vec<ResourceRecord>, config: &str) -> GroupingOutcome {
        let catalog = ResourceCatalog::new(records).unwrap();
        let table = parse_json_config(config).unwrap();
        group_resources(&catalog, &table)
    }

    fn keys(tree: &GroupTree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .iter()
            .map(|child| match tree.node(*child).kind() {
                NodeKind::Group(group) => group.key.clone(),
                NodeKind::Resource(resource) => resource.address.clone(),
                NodeKind::Ungrouped => "<ungrouped>".into(),
                NodeKind::Root => "<root>".into(),
            })
            .collect()
    }

    #[test]
    fn same_key_resources_share_one_group() {
        let outcome = run(
            vec![
                record("x.a", "x", json!({"project": "p1"})),
                record("x.b", "x", json!({"project": "p1"})),
            ],
            r#"{"x": {"grouped_by": ["values.project"]}}"#,
        );
        let tree = &outcome.tree;
        assert_eq!(keys(tree, tree.root()), vec!["p1"]);
        let group = tree.children(tree.root())[0];
        assert_eq!(tree.node(group).as_group().unwrap().depth, 0);
        assert_eq!(keys(tree, group), vec!["x.a", "x.b"]);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn groups_merge_across_types() {
        let outcome = run(
            vec![
                record("net.vpc", "network", json!({"project": "p1", "region": "r1"})),
                record("vm.web", "instance", json!({"project": "p1", "zone": "z1"})),
                record("vm.db", "instance", json!({"project": "p2", "zone": "z1"})),
            ],
            r#"{
                "network": {"grouped_by": ["values.project", "values.region"]},
                "instance": {"grouped_by": ["values.project", "values.zone"]}
            }"#,
        );
        let tree = &outcome.tree;
        assert_eq!(keys(tree, tree.root()), vec!["p1", "p2"]);
        let p1 = tree.children(tree.root())[0];
        assert_eq!(keys(tree, p1), vec!["r1", "z1"]);
        let z1 = tree.children(p1)[1];
        assert_eq!(tree.node(z1).as_group().unwrap().depth, 1);
    }

    #[test]
    fn empty_levels_are_skipped() {
        let outcome = run(
            vec![record("x.a", "x", json!({"project": "", "region": "r1"}))],
            r#"{"x": {"grouped_by": ["values.project", "values.region"]}}"#,
        );
        let tree = &outcome.tree;
        assert_eq!(keys(tree, tree.root()), vec!["r1"]);
        assert_eq!(outcome.diagnostics.count(DiagnosticKind::EmptyGroupKey), 1);
    }

    #[test]
    fn unresolvable_levels_record_one_diagnostic_each() {
        let outcome = run(
            vec![record("x.a", "x", json!({"region": "r1"}))],
            r#"{"x": {"grouped_by": ["values.project", "values.region"]}}"#,
        );
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics.count(DiagnosticKind::UnresolvedPath), 1);
        let tree = &outcome.tree;
        assert_eq!(keys(tree, tree.root()), vec!["r1"]);
    }

    #[test]
    fn unconfigured_types_land_in_ungrouped_bucket() {
        let outcome = run(
            vec![
                record("x.a", "x", json!({"project": "p1"})),
                record("y.b", "y", json!({})),
                record("y.c", "y", json!({})),
            ],
            r#"{"x": {"grouped_by": ["values.project"]}}"#,
        );
        let tree = &outcome.tree;
        assert_eq!(keys(tree, tree.root()), vec!["p1", "<ungrouped>"]);
        let bucket = tree.ungrouped().unwrap();
        assert_eq!(keys(tree, bucket), vec!["y.b", "y.c"]);
    }

    #[test]
    fn group_id_attaches_to_later_anchor() {
        let outcome = run(
            vec![
                record("pool.a", "node_pool", json!({"cluster": "c1"})),
                record("cluster.main", "cluster", json!({"id": "c1", "project": "p1"})),
            ],
            r#"{
                "node_pool": {"group_id": "values.cluster"},
                "cluster": {"grouped_by": ["values.project"], "anchor_id": "values.id"}
            }"#,
        );
        let tree = &outcome.tree;
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let pool = tree.find_leaf("pool.a").unwrap();
        assert_eq!(tree.group_path(pool), vec!["p1", "c1"]);
        let anchor = tree.node(pool).parent().unwrap();
        assert_eq!(
            tree.node(anchor).as_group().unwrap().anchor_value.as_deref(),
            Some("c1")
        );
        assert_eq!(keys(tree, anchor), vec!["cluster.main", "pool.a"]);
    }

    #[test]
    fn dangling_group_id_falls_back_to_bucket() {
        let outcome = run(
            vec![record("pool.a", "node_pool", json!({"cluster": "c9"}))],
            r#"{"node_pool": {"group_id": "values.cluster"}}"#,
        );
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics.count(DiagnosticKind::DanglingGroupReference),
            1
        );
        let tree = &outcome.tree;
        let bucket = tree.ungrouped().unwrap();
        assert_eq!(keys(tree, bucket), vec!["pool.a"]);
    }

    #[test]
    fn duplicate_anchor_later_wins() {
        let outcome = run(
            vec![
                record("cluster.a", "cluster", json!({"id": "c1", "project": "p1"})),
                record("cluster.b", "cluster", json!({"id": "c1", "project": "p2"})),
                record("pool.x", "node_pool", json!({"cluster": "c1"})),
            ],
            r#"{
                "cluster": {"grouped_by": ["values.project"], "anchor_id": "values.id"},
                "node_pool": {"group_id": "values.cluster"}
            }"#,
        );
        assert_eq!(outcome.diagnostics.count(DiagnosticKind::DuplicateAnchor), 1);
        let tree = &outcome.tree;
        let pool = tree.find_leaf("pool.x").unwrap();
        assert_eq!(tree.group_path(pool), vec!["p2", "c1"]);
    }

    #[test]
    fn anchor_without_grouping_sits_at_root() {
        let outcome = run(
            vec![
                record("vpc.main", "vpc", json!({"id": "vpc-1"})),
                record("subnet.a", "subnet", json!({"vpc_id": "vpc-1"})),
            ],
            r#"{
                "vpc": {"anchor_id": "values.id"},
                "subnet": {"group_id": "values.vpc_id"}
            }"#,
        );
        let tree = &outcome.tree;
        assert_eq!(keys(tree, tree.root()), vec!["vpc-1"]);
        assert!(tree.ungrouped().is_none());
    }

    #[test]
    fn chained_anchors_nest() {
        let outcome = run(
            vec![
                record("inst.web", "instance", json!({"subnet_id": "s-1"})),
                record("subnet.a", "subnet", json!({"id": "s-1", "vpc_id": "vpc-1"})),
                record("vpc.main", "vpc", json!({"id": "vpc-1", "project": "p1"})),
            ],
            r#"{
                "vpc": {"grouped_by": ["values.project"], "anchor_id": "values.id"},
                "subnet": {"group_id": "values.vpc_id", "anchor_id": "values.id"},
                "instance": {"group_id": "values.subnet_id"}
            }"#,
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let tree = &outcome.tree;
        let web = tree.find_leaf("inst.web").unwrap();
        assert_eq!(tree.group_path(web), vec!["p1", "vpc-1", "s-1"]);
        let subnet_group = tree.node(web).parent().unwrap();
        assert_eq!(tree.node(subnet_group).as_group().unwrap().depth, 2);
    }

    #[test]
    fn attachment_cycles_are_broken() {
        let outcome = run(
            vec![
                record("a.one", "a", json!({"id": "A", "parent": "B"})),
                record("b.two", "b", json!({"id": "B", "parent": "A"})),
            ],
            r#"{
                "a": {"group_id": "values.parent", "anchor_id": "values.id"},
                "b": {"group_id": "values.parent", "anchor_id": "values.id"}
            }"#,
        );
        assert_eq!(outcome.diagnostics.count(DiagnosticKind::AttachmentCycle), 1);
        assert_eq!(outcome.tree.leaves().len(), 2);
    }

    #[test]
    fn path_walk_finds_groups_attached_before_their_parent() {
        let outcome = run(
            vec![
                record("subnet.a", "subnet", json!({"id": "s-1", "vpc": "vpc-1"})),
                record("vpc.main", "vpc", json!({"id": "vpc-1", "org": "org-1"})),
                record("org.main", "org", json!({"id": "org-1", "project": "p1"})),
                record(
                    "disk.a",
                    "disk",
                    json!({"project": "p1", "org": "org-1", "vpc": "vpc-1", "subnet": "s-1"}),
                ),
            ],
            r#"{
                "subnet": {"anchor_id": "values.id", "group_id": "values.vpc"},
                "vpc": {"anchor_id": "values.id", "group_id": "values.org"},
                "org": {"anchor_id": "values.id", "grouped_by": ["values.project"]},
                "disk": {"grouped_by": ["values.project", "values.org", "values.vpc", "values.subnet"]}
            }"#,
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let tree = &outcome.tree;
        let subnet = tree.find_leaf("subnet.a").unwrap();
        let disk = tree.find_leaf("disk.a").unwrap();
        assert_eq!(tree.node(disk).parent(), tree.node(subnet).parent());
        assert_eq!(tree.group_path(disk), vec!["p1", "org-1", "vpc-1", "s-1"]);
        let vpc_group = tree.node(tree.node(subnet).parent().unwrap()).parent().unwrap();
        assert_eq!(keys(tree, vpc_group), vec!["vpc.main", "s-1"]);
    }

    #[test]
    fn merged_anchor_groups_fold_nested_groups_together() {
        let outcome = run(
            vec![
                record("vpc.main", "vpc", json!({"id": "vpc-1"})),
                record("route.main", "route", json!({"id": "r-1", "vpc": "vpc-1", "subnet": "s-1"})),
                record("nic.main", "nic", json!({"id": "r-1", "subnet": "s-1"})),
                record("subnet.main", "subnet", json!({"id": "s-1", "vpc": "vpc-1"})),
                record("disk.main", "disk", json!({"vpc": "vpc-1", "subnet": "s-1", "route": "r-1"})),
                record("inst.main", "inst", json!({"nic": "r-1"})),
            ],
            r#"{
                "vpc": {"anchor_id": "values.id"},
                "route": {"grouped_by": ["values.vpc", "values.subnet"], "anchor_id": "values.id"},
                "nic": {"anchor_id": "values.id", "group_id": "values.subnet"},
                "subnet": {"anchor_id": "values.id", "group_id": "values.vpc"},
                "disk": {"grouped_by": ["values.vpc", "values.subnet", "values.route"]},
                "inst": {"group_id": "values.nic"}
            }"#,
        );
        assert_eq!(outcome.diagnostics.count(DiagnosticKind::DuplicateAnchor), 1);
        assert_eq!(outcome.diagnostics.len(), 1);

        let tree = &outcome.tree;
        let disk = tree.find_leaf("disk.main").unwrap();
        assert_eq!(tree.group_path(disk), vec!["vpc-1", "s-1", "r-1"]);
        let route_group = tree.node(disk).parent().unwrap();
        assert_eq!(
            keys(tree, route_group),
            vec!["route.main", "nic.main", "disk.main", "inst.main"]
        );
        let subnet_group = tree.node(route_group).parent().unwrap();
        assert_eq!(keys(tree, subnet_group), vec!["r-1", "subnet.main"]);
        assert_eq!(
            tree.node(subnet_group).as_group().unwrap().anchor_value.as_deref(),
            Some("s-1")
        );
    }

    #[test]
    fn group_id_wins_over_grouped_by() {
        let outcome = run(
            vec![
                record("cluster.main", "cluster", json!({"id": "c1"})),
                record("pool.a", "node_pool", json!({"cluster": "c1", "project": "p1"})),
            ],
            r#"{
                "cluster": {"anchor_id": "values.id"},
                "node_pool": {"group_id": "values.cluster", "grouped_by": ["values.project"]}
            }"#,
        );
        let tree = &outcome.tree;
        let pool = tree.find_leaf("pool.a").unwrap();
        assert_eq!(tree.group_path(pool), vec!["c1"]);
    }

    #[test]
    fn anchor_merges_with_path_group_of_same_key() {
        let outcome = run(
            vec![
                record("disk.a", "disk", json!({"cluster": "c1"})),
                record("cluster.main", "cluster", json!({"id": "c1"})),
            ],
            r#"{
                "disk": {"grouped_by": ["values.cluster"]},
                "cluster": {"anchor_id": "values.id"}
            }"#,
        );
        let tree = &outcome.tree;
        assert_eq!(keys(tree, tree.root()), vec!["c1"]);
        let group = tree.children(tree.root())[0];
        assert_eq!(keys(tree, group), vec!["cluster.main", "disk.a"]);
    }

    #[test]
    fn display_name_falls_back_to_resource_name() {
        let outcome = run(
            vec![record("x.web", "x", json!({}))],
            r#"{"x": {"name": "values.display"}}"#,
        );
        let leaves = outcome.tree.leaves();
        assert_eq!(leaves[0].display_name, "web");
        assert_eq!(leaves[0].label(), "x: web");
        assert_eq!(outcome.diagnostics.count(DiagnosticKind::UnresolvedPath), 1);
    }

    #[test]
    fn reruns_are_identical() {
        let records = vec![
            record("pool.a", "node_pool", json!({"cluster": "c1"})),
            record("x.a", "x", json!({"project": "p1"})),
            record("cluster.main", "cluster", json!({"id": "c1", "project": "p1"})),
            record("pool.b", "node_pool", json!({"cluster": "c9"})),
        ];
        let config = r#"{
            "node_pool": {"group_id": "values.cluster"},
            "x": {"grouped_by": ["values.project"]},
            "cluster": {"grouped_by": ["values.project"], "anchor_id": "values.id"}
        }"#;
        assert_eq!(run(records.clone(), config), run(records, config));
    }
}
