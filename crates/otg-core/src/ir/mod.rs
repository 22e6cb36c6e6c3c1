pub mod graph;
pub mod namespace;
pub mod node;

pub use graph::{HelperNames, HelperUsage, TypeGraph};
pub use namespace::{EntryKey, Namespace, NamespaceEntry, Namespaces, TemplatePart};
pub use node::{
    AdditionalShape, Annotations, ArrayShape, DiscriminatorBinding, IntersectionMember, Literal,
    MemberTag, NodeId, NodeKind, ObjectShape, PathSegment, PrimitiveKind, Property, Reference,
    TagSource, TypeNode, UnionShape, dotted_path,
};
