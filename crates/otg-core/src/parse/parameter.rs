use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

impl ParameterLocation {
    /// Group order inside a `parameters` object.
    pub const ALL: [ParameterLocation; 4] = [Self::Query, Self::Header, Self::Path, Self::Cookie];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Header => "header",
            Self::Path => "path",
            Self::Cookie => "cookie",
        }
    }
}

/// An API parameter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Parameter {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "in")]
    pub location: Option<ParameterLocation>,
    pub required: bool,
    pub description: Option<String>,
    pub deprecated: Option<bool>,
    pub schema: Option<Value>,
    pub content: IndexMap<String, Value>,
}

/// A response or encoding header.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Header {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub required: bool,
    pub description: Option<String>,
    pub deprecated: Option<bool>,
    pub schema: Option<Value>,
    pub content: IndexMap<String, Value>,
}
