use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::parse::pointer::CanonicalPointer;

/// Handle of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One resolved type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeNode {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
    /// Replacement text produced by a post-transform hook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_override: Option<String>,
    /// Pointer this node was synthesized from; `None` for synthetic nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<CanonicalPointer>,
}

impl TypeNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            annotations: Annotations::default(),
            rendered_override: None,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: CanonicalPointer) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Passive metadata carried to the renderer. Never affects composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Annotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub write_only: bool,
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        *self == Annotations::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

/// A fixed scalar value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl Literal {
    /// Scalars only; arrays and objects have no literal form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null => Some(Self::Null),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// The type taxonomy handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Primitive {
        primitive: PrimitiveKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Literal {
        value: Literal,
    },
    Enum {
        values: Vec<Literal>,
    },
    Object(ObjectShape),
    Array(ArrayShape),
    Union(UnionShape),
    Intersection {
        members: Vec<IntersectionMember>,
    },
    Reference(Reference),
    /// `base` with `keys` made required.
    RequiredOverride {
        base: NodeId,
        keys: Vec<String>,
    },
    /// Verbatim text from a pre-transform hook.
    Expression {
        source: String,
    },
    Unresolved {
        pointer: String,
    },
    Unknown,
}

impl NodeKind {
    pub fn literal(value: Literal) -> Self {
        Self::Literal { value }
    }

    /// Primitives, literals and enums: values that can't carry properties.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Primitive { .. } | Self::Literal { .. } | Self::Enum { .. }
        )
    }

    pub fn as_object(&self) -> Option<&ObjectShape> {
        match self {
            Self::Object(shape) => Some(shape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectShape {
    pub properties: IndexMap<String, Property>,
    pub additional: AdditionalShape,
}

impl ObjectShape {
    pub fn sealed() -> Self {
        Self {
            properties: IndexMap::new(),
            additional: AdditionalShape::Sealed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.additional == AdditionalShape::Sealed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Property {
    pub node: NodeId,
    pub required: bool,
}

/// What `additionalProperties` allows beyond the declared properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalShape {
    Sealed,
    Allowed(NodeId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayShape {
    pub items: NodeId,
    /// Fixed length when `minItems == maxItems`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionShape {
    pub members: Vec<NodeId>,
    /// `oneOf` rather than `anyOf`.
    pub exclusive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<DiscriminatorBinding>,
}

/// Discriminant property plus one tag per union member (aligned with
/// `UnionShape::members`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscriminatorBinding {
    pub property: String,
    pub tags: Vec<Option<MemberTag>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberTag {
    pub value: String,
    pub source: TagSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    /// Key of the discriminator `mapping` table.
    Mapping,
    /// The member's own `enum`/`const` on the discriminant property.
    Declared,
    /// Terminal name of the member's reference.
    ReferenceName,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntersectionMember {
    pub node: NodeId,
    /// Properties removed from `node` before intersecting.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub omit: Vec<String>,
}

impl IntersectionMember {
    pub fn plain(node: NodeId) -> Self {
        Self {
            node,
            omit: Vec::new(),
        }
    }
}

/// A pointer to another node. Renderers emit a lookup, never the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub pointer: CanonicalPointer,
    /// Lookup path from a namespace root to the target.
    pub path: Vec<PathSegment>,
    pub target: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSegment {
    Key(String),
    /// Array element (`items`).
    Index,
    /// Index-signature value (`additionalProperties`).
    AnyKey,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index => f.write_str("[number]"),
            Self::AnyKey => f.write_str("[string]"),
        }
    }
}

/// Dotted form of a lookup path, e.g. `components.schemas.Pet.name`.
pub fn dotted_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
