pub mod components;
pub mod operation;
pub mod parameter;
pub mod pointer;
pub mod request_body;
pub mod response;
pub mod schema;

use serde_json::{Map, Number, Value};
use serde_yaml_ng::Value as YamlValue;

use crate::error::ParseError;

/// Parse a YAML document into a generic tree.
///
/// Mapping keys that are not strings (status codes like `200:` are the usual
/// case) are converted to their string form.
pub fn from_yaml(input: &str) -> Result<Value, ParseError> {
    let yaml: YamlValue = serde_yaml_ng::from_str(input)?;
    Ok(yaml_to_json(yaml))
}

/// Parse a JSON document into a generic tree.
pub fn from_json(input: &str) -> Result<Value, ParseError> {
    Ok(serde_json::from_str(input)?)
}

fn yaml_to_json(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        other => yaml_to_json(other).to_string(),
    }
}
