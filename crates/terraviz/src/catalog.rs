use std::collections::BTreeSet;

use serde::Serialize;

use crate::attributes::AttributeMap;
use crate::error::TerravizError;

/// One infrastructure resource instance as produced by the plan adapter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceRecord {
    pub address: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub attributes: AttributeMap,
}

impl ResourceRecord {
    pub fn new(
        address: impl Into<String>,
        resource_type: impl Into<String>,
        attributes: AttributeMap,
    ) -> Self {
        Self {
            address: address.into(),
            resource_type: resource_type.into(),
            attributes,
        }
    }

    /// Resource name from the top-level `name` attribute, if present.
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(|value| value.as_str())
    }
}

/// Handle into a [`ResourceCatalog`], stable for the lifetime of the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordIndex(pub usize);

/// Flat, order-preserving list of resource records.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ResourceCatalog {
    records: Vec<ResourceRecord>,
}

impl ResourceCatalog {
    /// Validates and wraps the records. Empty identity fields and repeated
    /// addresses are structural errors.
    pub fn new(records: Vec<ResourceRecord>) -> Result<Self, TerravizError> {
        let mut seen = BTreeSet::new();
        for (position, record) in records.iter().enumerate() {
            if record.address.trim().is_empty() {
                return Err(TerravizError::Structural(format!(
                    "resource at position {position} has no address"
                )));
            }
            if record.resource_type.trim().is_empty() {
                return Err(TerravizError::Structural(format!(
                    "resource {} has no type",
                    record.address
                )));
            }
            if !seen.insert(record.address.as_str()) {
                return Err(TerravizError::Structural(format!(
                    "resource address {} appears more than once",
                    record.address
                )));
            }
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: RecordIndex) -> Option<&ResourceRecord> {
        self.records.get(index.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordIndex, &ResourceRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(position, record)| (RecordIndex(position), record))
    }

    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::attribute_map;
    use serde_json::json;

    fn record(address: &str, resource_type: &str) -> ResourceRecord {
        ResourceRecord::new(address, resource_type, attribute_map(json!({"name": "n"})))
    }

    #[test]
    fn catalog_preserves_order() {
        let catalog = ResourceCatalog::new(vec![
            record("b.second", "b"),
            record("a.first", "a"),
        ])
        .unwrap();
        let addresses: Vec<_> = catalog.iter().map(|(_, r)| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["b.second", "a.first"]);
        assert_eq!(catalog.get(RecordIndex(1)).unwrap().resource_type, "a");
    }

    #[test]
    fn missing_address_is_structural() {
        let err = ResourceCatalog::new(vec![record("", "a")]).unwrap_err();
        assert!(matches!(err, TerravizError::Structural(_)));
    }

    #[test]
    fn missing_type_is_structural() {
        let err = ResourceCatalog::new(vec![record("a.one", " ")]).unwrap_err();
        assert!(matches!(err, TerravizError::Structural(_)));
    }

    #[test]
    fn duplicate_address_is_structural() {
        let err = ResourceCatalog::new(vec![record("a.one", "a"), record("a.one", "a")])
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn name_reads_top_level_attribute() {
        assert_eq!(record("a.one", "a").name(), Some("n"));
    }
}
