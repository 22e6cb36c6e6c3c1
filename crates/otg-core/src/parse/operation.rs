use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// HTTP methods a path item may declare, in rendering order.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A typed view over a path item. Operations are looked up by method key on
/// the raw fragment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathItem {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<Value>,
}

/// A typed view over an API operation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Operation {
    #[serde(rename = "operationId")]
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: Option<bool>,
    pub parameters: Vec<Value>,
    #[serde(rename = "requestBody")]
    pub request_body: Option<Value>,
    pub responses: IndexMap<String, Value>,
}
