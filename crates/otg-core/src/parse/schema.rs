use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A JSON Schema type keyword value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
    #[serde(other)]
    Other,
}

/// The `type` field can be a single type or an array of types.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    Single(SchemaType),
    Multiple(Vec<SchemaType>),
}

/// Discriminator for polymorphic schemas.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Discriminator {
    #[serde(rename = "propertyName")]
    pub property_name: String,
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
}

/// `additionalProperties` can be a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Value),
}

/// A typed view over one schema fragment.
///
/// Child schemas stay as raw values: they are addressed by pointer and
/// synthesized on their own, so only the keywords of this level are typed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Schema {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    #[serde(rename = "type")]
    pub schema_type: Option<TypeSet>,
    pub format: Option<String>,

    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "default")]
    pub default_value: Option<Value>,
    pub example: Option<Value>,
    pub nullable: Option<bool>,
    pub deprecated: Option<bool>,
    #[serde(rename = "readOnly")]
    pub read_only: Option<bool>,
    #[serde(rename = "writeOnly")]
    pub write_only: Option<bool>,

    // Object
    pub properties: IndexMap<String, Value>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: Option<AdditionalProperties>,

    // Array
    pub items: Option<Value>,
    #[serde(rename = "minItems")]
    pub min_items: Option<u64>,
    #[serde(rename = "maxItems")]
    pub max_items: Option<u64>,

    // Composition
    #[serde(rename = "allOf")]
    pub all_of: Vec<Value>,
    #[serde(rename = "oneOf")]
    pub one_of: Vec<Value>,
    #[serde(rename = "anyOf")]
    pub any_of: Vec<Value>,
    pub discriminator: Option<Discriminator>,

    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(rename = "const")]
    pub const_value: Option<Value>,
}

impl Schema {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Schema::deserialize(value)
    }

    /// Declared types with `null` removed, plus whether `null` was present.
    pub fn types(&self) -> (Vec<SchemaType>, bool) {
        let all = match &self.schema_type {
            None => Vec::new(),
            Some(TypeSet::Single(t)) => vec![*t],
            Some(TypeSet::Multiple(ts)) => ts.clone(),
        };
        let has_null = all.contains(&SchemaType::Null);
        let rest: Vec<SchemaType> = all.into_iter().filter(|t| *t != SchemaType::Null).collect();
        if rest.is_empty() && has_null {
            return (vec![SchemaType::Null], false);
        }
        (rest, has_null)
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable == Some(true) || self.types().1
    }

    /// Keywords of this level that describe an object shape.
    pub fn has_object_shape(&self) -> bool {
        !self.properties.is_empty() || self.additional_properties.is_some()
    }

    /// Keywords that describe this level's own shape (not composition).
    pub fn has_own_shape(&self) -> bool {
        self.has_object_shape()
            || self.items.is_some()
            || self.enum_values.is_some()
            || self.const_value.is_some()
            || self
                .types()
                .0
                .iter()
                .any(|t| !matches!(t, SchemaType::Object | SchemaType::Other))
    }

    /// True when keywords besides `$ref` and annotations are present.
    pub fn has_structure(&self) -> bool {
        self.has_own_shape()
            || !self.required.is_empty()
            || !self.all_of.is_empty()
            || !self.one_of.is_empty()
            || !self.any_of.is_empty()
            || self.is_nullable()
    }
}

fn lenient_string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    // `required: true` on a property is a common OpenAPI 2 leftover.
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    })
}
