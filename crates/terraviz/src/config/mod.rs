mod hcl;

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::TerravizError;
use crate::path::{AttributePath, LabelTemplate};

pub use hcl::parse_hcl_config;

/// Per-type entry exactly as written in a configuration file, before validation.
///
/// Both configuration syntaxes deserialize into this shape.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RawTypeConfig {
    #[serde(default)]
    pub grouped_by: Vec<String>,
    #[serde(default, alias = "group_id_path")]
    pub group_id: Option<String>,
    #[serde(default, alias = "anchor_id_path")]
    pub anchor_id: Option<String>,
    #[serde(default, alias = "name_template")]
    pub name: Option<String>,
    #[serde(default, alias = "icon")]
    pub diagram_image: Option<String>,
}

/// Grouping and labeling rules for one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConfig {
    /// Outermost level first.
    pub grouped_by: Vec<AttributePath>,
    /// When set, `grouped_by` is ignored and the resource attaches under the matching anchor.
    pub group_id_path: Option<AttributePath>,
    pub anchor_id_path: Option<AttributePath>,
    pub name_template: LabelTemplate,
    pub icon_path: Option<PathBuf>,
}

impl Default for TypeConfig {
    fn default() -> Self {
        Self {
            grouped_by: Vec::new(),
            group_id_path: None,
            anchor_id_path: None,
            name_template: LabelTemplate::default(),
            icon_path: None,
        }
    }
}

impl TypeConfig {
    fn from_raw(resource_type: &str, raw: RawTypeConfig) -> Result<Self, TerravizError> {
        let grouped_by = raw
            .grouped_by
            .iter()
            .map(|path| parse_path(resource_type, "grouped_by", path))
            .collect::<Result<Vec<_>, _>>()?;
        let group_id_path = raw
            .group_id
            .as_deref()
            .map(|path| parse_path(resource_type, "group_id", path))
            .transpose()?;
        let anchor_id_path = raw
            .anchor_id
            .as_deref()
            .map(|path| parse_path(resource_type, "anchor_id", path))
            .transpose()?;

        if group_id_path.is_some() && !grouped_by.is_empty() {
            tracing::warn!(
                resource_type,
                "both group_id and grouped_by are configured; group_id takes precedence"
            );
        }

        let name_template = match raw.name.as_deref().map(str::trim) {
            Some(template) if !template.is_empty() => LabelTemplate::parse(template),
            _ => LabelTemplate::default(),
        };
        let icon_path = raw
            .diagram_image
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            grouped_by,
            group_id_path,
            anchor_id_path,
            name_template,
            icon_path,
        })
    }
}

fn parse_path(resource_type: &str, field: &str, raw: &str) -> Result<AttributePath, TerravizError> {
    let path = AttributePath::parse(raw);
    if path.segments().iter().any(|segment| segment.is_empty()) {
        return Err(TerravizError::Configuration(format!(
            "{resource_type}: {field} contains an invalid attribute path '{raw}'"
        )));
    }
    Ok(path)
}

/// Resource type name to grouping rules, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeConfigTable {
    types: IndexMap<String, TypeConfig>,
    fallback: TypeConfig,
}

impl TypeConfigTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_raw(raw: IndexMap<String, RawTypeConfig>) -> Result<Self, TerravizError> {
        let mut types = IndexMap::with_capacity(raw.len());
        for (resource_type, entry) in raw {
            let resource_type = resource_type.trim().to_string();
            if resource_type.is_empty() {
                return Err(TerravizError::Structural(
                    "configuration entry has an empty resource type".into(),
                ));
            }
            let config = TypeConfig::from_raw(&resource_type, entry)?;
            types.insert(resource_type, config);
        }
        Ok(Self {
            types,
            fallback: TypeConfig::default(),
        })
    }

    pub fn insert(&mut self, resource_type: impl Into<String>, config: TypeConfig) {
        self.types.insert(resource_type.into(), config);
    }

    /// Rules for `resource_type`, or the defaults when the type is not configured.
    pub fn get(&self, resource_type: &str) -> &TypeConfig {
        self.types.get(resource_type).unwrap_or(&self.fallback)
    }

    pub fn is_configured(&self, resource_type: &str) -> bool {
        self.types.contains_key(resource_type)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeConfig)> {
        self.types.iter().map(|(name, config)| (name.as_str(), config))
    }
}

/// Parses the JSON configuration syntax: an object keyed by resource type.
pub fn parse_json_config(raw: &str) -> Result<TypeConfigTable, TerravizError> {
    let parsed: IndexMap<String, RawTypeConfig> = serde_json::from_str(raw)
        .map_err(|err| TerravizError::Configuration(format!("invalid JSON configuration: {err}")))?;
    TypeConfigTable::from_raw(parsed)
}

/// Loads a configuration file, choosing the syntax from the file extension
/// (`.json` for JSON, anything else for the HCL-like syntax).
pub fn load_config(path: impl AsRef<Path>) -> Result<TypeConfigTable, TerravizError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let table = if is_json {
        parse_json_config(&raw)
    } else {
        parse_hcl_config(&raw)
    };
    let table = table.map_err(|err| err.context(path.display()))?;
    tracing::debug!(path = %path.display(), types = table.len(), "loaded configuration");
    Ok(table)
}
