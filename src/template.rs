//! Infrastructure template parsing
//!
//! Turns raw CloudFormation-style template text into a normalized resource
//! list. Templates are accepted in JSON or YAML; detection is by deserialization
//! attempt (JSON first, YAML second), not by file extension, because content
//! may arrive from stdin or a registry without one.
//!
//! The parser knows nothing about pricing or usage. Unknown `Type` strings pass
//! through untouched; it is the estimator's and pricer's job to handle them.

use crate::error::{Result, StackcostError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One declared infrastructure unit from a template.
///
/// Immutable after parsing. `logical_id` is unique within a template and is
/// used downstream as the per-resource aggregation key.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Resource {
    pub resource_type: String,
    pub logical_id: String,
    /// Untyped property bag from the source template. Access only through the
    /// accessor helpers below, never by assuming a key exists.
    pub properties: serde_json::Map<String, Value>,
}

impl Resource {
    /// Read a string property, falling back to `default` when absent or not a string.
    pub fn string_property(&self, key: &str, default: &str) -> String {
        self.properties
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    }

    /// Read a numeric property, falling back to `default` when absent.
    ///
    /// CloudFormation templates frequently quote numbers ("20" instead of 20),
    /// so string values that parse as f64 are accepted too.
    pub fn number_property(&self, key: &str, default: f64) -> f64 {
        match self.properties.get(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
            Some(Value::String(s)) => s.parse().unwrap_or(default),
            _ => default,
        }
    }
}

/// Wire shape of a template: a map of logical IDs to declarations.
///
/// BTreeMap keeps resource order deterministic across runs, which keeps
/// `TemplateAnalysis.resources` and `usage_estimates` stable for diffing.
#[derive(Debug, Deserialize)]
struct TemplateDocument {
    #[serde(rename = "Resources", default)]
    resources: BTreeMap<String, ResourceDeclaration>,
}

#[derive(Debug, Deserialize)]
struct ResourceDeclaration {
    #[serde(rename = "Type")]
    resource_type: String,
    #[serde(rename = "Properties", default)]
    properties: serde_json::Map<String, Value>,
}

/// Parse template content into a resource list.
///
/// Fails when neither serialization deserializes, or when the resource map is
/// empty — a template declaring zero resources is not analyzable and must be
/// rejected rather than silently treated as zero-cost.
pub fn parse_template(content: &str) -> Result<Vec<Resource>> {
    let document = deserialize_template(content)?;

    if document.resources.is_empty() {
        return Err(StackcostError::EmptyTemplate);
    }

    Ok(document
        .resources
        .into_iter()
        .map(|(logical_id, decl)| Resource {
            resource_type: decl.resource_type,
            logical_id,
            properties: decl.properties,
        })
        .collect())
}

fn deserialize_template(content: &str) -> Result<TemplateDocument> {
    let json_err = match serde_json::from_str::<TemplateDocument>(content) {
        Ok(doc) => return Ok(doc),
        Err(e) => e,
    };

    match serde_yaml_ng::from_str::<TemplateDocument>(content) {
        Ok(doc) => Ok(doc),
        Err(yaml_err) => Err(StackcostError::Parse(format!(
            "not valid JSON ({json_err}) or YAML ({yaml_err})"
        ))),
    }
}
