use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level project configuration loaded from `.otg.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtgConfig {
    pub input: String,
    pub output: String,
    pub graph: GraphConfig,
    pub emit: EmitConfig,
}

impl Default for OtgConfig {
    fn default() -> Self {
        Self {
            input: "openapi.yaml".to_string(),
            output: "src/generated".to_string(),
            graph: GraphConfig::default(),
            emit: EmitConfig::default(),
        }
    }
}

/// Options that shape the type graph itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Name of the helper used for exclusive (`oneOf`) unions.
    pub exclusive_union_helper_name: String,
    /// Name of the helper that marks properties of a base type as required.
    pub required_override_helper_name: String,
    pub path_parameter_style: PathParameterStyle,
    /// Text placed verbatim after the helper declarations.
    pub raw_preamble: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            exclusive_union_helper_name: "OneOf".to_string(),
            required_override_helper_name: "WithRequired".to_string(),
            path_parameter_style: PathParameterStyle::LiteralKeys,
            raw_preamble: None,
        }
    }
}

/// How route keys with `{param}` placeholders appear in the `paths` namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathParameterStyle {
    /// `"/user/{user_id}"`
    #[default]
    LiteralKeys,
    /// `` [path: `/user/${string}`] ``
    TemplatedKeys,
}

/// Renderer options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitConfig {
    /// Declare namespaces as type aliases instead of interfaces.
    pub export_type: bool,
    pub no_jsdoc: bool,
    pub file_name: String,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            export_type: false,
            no_jsdoc: false,
            file_name: "schema.d.ts".to_string(),
        }
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".otg.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<OtgConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: OtgConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# otg configuration
input: openapi.yaml
output: src/generated

graph:
  exclusive_union_helper_name: OneOf
  required_override_helper_name: WithRequired
  path_parameter_style: literal-keys   # literal-keys | templated-keys
  # raw_preamble: |
  #   import type { DateOrTime } from "./scalars";

emit:
  export_type: false    # `export type X = {...}` instead of `export interface X {...}`
  no_jsdoc: false
  file_name: schema.d.ts
"#
}
