use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// A request body definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RequestBody {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub description: Option<String>,
    pub content: IndexMap<String, Value>,
    pub required: bool,
}
