use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// A response definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Response {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub description: Option<String>,
    pub headers: IndexMap<String, Value>,
    pub content: IndexMap<String, Value>,
}
