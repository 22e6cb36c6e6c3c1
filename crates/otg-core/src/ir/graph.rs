use indexmap::IndexMap;
use serde::Serialize;

use super::namespace::Namespaces;
use super::node::{NodeId, NodeKind, TypeNode, UnionShape};
use crate::error::ResolveError;
use crate::parse::pointer::CanonicalPointer;

/// Which optional helper declarations the rendered output needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HelperUsage {
    pub uses_exclusive_union_helper: bool,
    pub uses_required_override_helper: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelperNames {
    pub exclusive_union: String,
    pub required_override: String,
}

/// The result of one build: an immutable arena of nodes plus the namespaces
/// that expose them.
#[derive(Debug, Clone, Serialize)]
pub struct TypeGraph {
    pub namespaces: Namespaces,
    pub nodes: Vec<TypeNode>,
    /// Canonical pointer of every synthesized fragment.
    pub index: IndexMap<CanonicalPointer, NodeId>,
    pub helpers: HelperUsage,
    pub helper_names: HelperNames,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    pub errors: Vec<ResolveError>,
    pub cancelled: bool,
}

impl TypeGraph {
    /// Nodes are only addressed by ids this graph handed out.
    pub fn node(&self, id: NodeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn lookup(&self, pointer: &CanonicalPointer) -> Option<NodeId> {
        self.index.get(pointer).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether rendering this union requires the exclusive-union helper.
    pub fn union_needs_helper(&self, union: &UnionShape) -> bool {
        union_needs_helper(&self.nodes, union)
    }
}

/// Exclusive, undiscriminated unions of two or more members that are not all
/// scalars. Shared by the builder (to set the flag) and renderers.
pub(crate) fn union_needs_helper(nodes: &[TypeNode], union: &UnionShape) -> bool {
    union.exclusive
        && union.discriminator.is_none()
        && union.members.len() >= 2
        && !union
            .members
            .iter()
            .all(|id| nodes.get(id.index()).is_some_and(|n| n.kind.is_scalar()))
}

impl NodeKind {
    /// Child node ids in declaration order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Object(shape) => {
                let mut ids: Vec<NodeId> = shape.properties.values().map(|p| p.node).collect();
                if let super::node::AdditionalShape::Allowed(id) = shape.additional {
                    ids.push(id);
                }
                ids
            }
            NodeKind::Array(shape) => vec![shape.items],
            NodeKind::Union(shape) => shape.members.clone(),
            NodeKind::Intersection { members } => members.iter().map(|m| m.node).collect(),
            NodeKind::RequiredOverride { base, .. } => vec![*base],
            NodeKind::Reference(_)
            | NodeKind::Primitive { .. }
            | NodeKind::Literal { .. }
            | NodeKind::Enum { .. }
            | NodeKind::Expression { .. }
            | NodeKind::Unresolved { .. }
            | NodeKind::Unknown => Vec::new(),
        }
    }
}
