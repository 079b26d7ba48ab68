use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Insertion-ordered mapping used for every nested attribute object.
pub type AttributeMap = IndexMap<String, AttributeValue>;

/// Leaf values carried by resource attributes.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Scalar {
    /// String form used for grouping keys and label fragments. `Null` has none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(value) => Some(value.to_string()),
            Scalar::Number(value) => Some(value.to_string()),
            Scalar::String(value) => Some(value.clone()),
        }
    }
}

/// Heterogeneous attribute tree attached to a resource record.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Scalar(Scalar),
    Sequence(Vec<AttributeValue>),
    Mapping(AttributeMap),
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::Scalar(Scalar::String(value.into()))
    }

    pub fn null() -> Self {
        AttributeValue::Scalar(Scalar::Null)
    }

    pub fn as_mapping(&self) -> Option<&AttributeMap> {
        match self {
            AttributeValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Scalar(Scalar::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Renders the value the way it appears in a label.
    ///
    /// Scalars use their plain text form; sequences and mappings fall back to
    /// compact JSON so the output stays deterministic.
    pub fn to_text(&self) -> Option<String> {
        match self {
            AttributeValue::Scalar(scalar) => scalar.as_text(),
            other => serde_json::to_string(&other.to_json()).ok(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Scalar(Scalar::Null) => serde_json::Value::Null,
            AttributeValue::Scalar(Scalar::Bool(value)) => serde_json::Value::Bool(*value),
            AttributeValue::Scalar(Scalar::Number(value)) => {
                serde_json::Value::Number(value.clone())
            }
            AttributeValue::Scalar(Scalar::String(value)) => {
                serde_json::Value::String(value.clone())
            }
            AttributeValue::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(AttributeValue::to_json).collect())
            }
            AttributeValue::Mapping(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Scalar(Scalar::Null),
            serde_json::Value::Bool(value) => AttributeValue::Scalar(Scalar::Bool(value)),
            serde_json::Value::Number(value) => AttributeValue::Scalar(Scalar::Number(value)),
            serde_json::Value::String(value) => AttributeValue::Scalar(Scalar::String(value)),
            serde_json::Value::Array(items) => {
                AttributeValue::Sequence(items.into_iter().map(AttributeValue::from).collect())
            }
            serde_json::Value::Object(map) => AttributeValue::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, AttributeValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Converts a JSON object into an attribute map; non-object input yields an empty map.
pub fn attribute_map(value: serde_json::Value) -> AttributeMap {
    match AttributeValue::from(value) {
        AttributeValue::Mapping(map) => map,
        _ => AttributeMap::new(),
    }
}
