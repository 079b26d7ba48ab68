use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::attributes::{AttributeMap, AttributeValue, attribute_map};
use crate::catalog::{ResourceCatalog, ResourceRecord};
use crate::error::TerravizError;

/// Subset of `terraform show -json` output that carries resources.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawPlan {
    #[serde(default)]
    planned_values: Option<RawPlannedValues>,
    #[serde(default)]
    resource_changes: Vec<RawResourceChange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawPlannedValues {
    #[serde(default)]
    root_module: RawModule,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawModule {
    #[serde(default)]
    resources: Vec<RawResource>,
    #[serde(default)]
    child_modules: Vec<RawModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawResource {
    #[serde(default)]
    address: Option<String>,
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    index: Option<serde_json::Value>,
    #[serde(default)]
    values: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawResourceChange {
    #[serde(default)]
    address: Option<String>,
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    index: Option<serde_json::Value>,
    #[serde(default)]
    change: Option<RawChange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawChange {
    #[serde(default)]
    after: Option<serde_json::Value>,
}

/// Reads a plan document from disk and flattens it into a catalog.
pub fn load_plan(path: impl AsRef<Path>) -> Result<ResourceCatalog, TerravizError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    parse_plan(&raw).map_err(|err| err.context(path.display()))
}

/// Flattens a plan document into catalog order.
///
/// `planned_values.root_module` is walked depth-first (module resources
/// before child modules). Entries from `resource_changes` whose address was
/// not already seen are appended afterwards.
pub fn parse_plan(raw: &str) -> Result<ResourceCatalog, TerravizError> {
    let plan: RawPlan = serde_json::from_str(raw)
        .map_err(|err| TerravizError::Plan(format!("invalid plan document: {err}")))?;

    let mut records = Vec::new();
    if let Some(planned) = plan.planned_values {
        flatten_module(planned.root_module, &mut records);
    }

    let mut seen: BTreeSet<String> = records.iter().map(|r| r.address.clone()).collect();
    for change in plan.resource_changes {
        let address = record_address(change.address, &change.resource_type, &change.name);
        if !seen.insert(address.clone()) {
            continue;
        }
        let values = change
            .change
            .and_then(|change| change.after)
            .unwrap_or(serde_json::Value::Null);
        records.push(build_record(
            address,
            change.resource_type,
            change.name,
            change.index,
            values,
        ));
    }

    tracing::debug!(resources = records.len(), "flattened plan document");
    ResourceCatalog::new(records)
}

fn flatten_module(module: RawModule, records: &mut Vec<ResourceRecord>) {
    for resource in module.resources {
        let address = record_address(resource.address, &resource.resource_type, &resource.name);
        records.push(build_record(
            address,
            resource.resource_type,
            resource.name,
            resource.index,
            resource.values,
        ));
    }
    for child in module.child_modules {
        flatten_module(child, records);
    }
}

fn record_address(address: Option<String>, resource_type: &str, name: &str) -> String {
    match address {
        Some(address) if !address.trim().is_empty() => address,
        _ if resource_type.is_empty() && name.is_empty() => String::new(),
        _ => format!("{resource_type}.{name}"),
    }
}

/// Attribute root exposed to paths: `name`, `values`, `address`, `type` and
/// `index` when the plan carries one.
fn build_record(
    address: String,
    resource_type: String,
    name: String,
    index: Option<serde_json::Value>,
    values: serde_json::Value,
) -> ResourceRecord {
    let mut attributes = AttributeMap::new();
    attributes.insert("name".into(), AttributeValue::string(name));
    attributes.insert(
        "values".into(),
        AttributeValue::Mapping(attribute_map(values)),
    );
    attributes.insert("address".into(), AttributeValue::string(address.clone()));
    attributes.insert("type".into(), AttributeValue::string(resource_type.clone()));
    if let Some(index) = index {
        attributes.insert("index".into(), AttributeValue::from(index));
    }
    ResourceRecord::new(address, resource_type, attributes)
}
