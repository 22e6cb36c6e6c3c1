use indexmap::IndexMap;
use serde_json::Value;

use super::GraphBuilder;
use crate::ir::{
    AdditionalShape, DiscriminatorBinding, IntersectionMember, Literal, MemberTag, NodeId,
    NodeKind, ObjectShape, Property, TagSource, UnionShape,
};
use crate::parse::pointer::{CanonicalPointer, DocumentId, parse_ref};
use crate::parse::schema::{Discriminator, Schema};

/// A named schema that extends a discriminated parent through `allOf`.
pub(super) struct Subtype {
    /// Position of the parent reference inside `allOf`.
    pub index: usize,
    pub property: String,
    pub tag: String,
}

impl GraphBuilder<'_> {
    /// Find an `allOf` member referencing a schema with a discriminator that
    /// applies to the schema at `pointer`.
    ///
    /// The parent applies when it has no `oneOf`/`anyOf` of its own, or when
    /// its mapping names this schema. Only named schemas (direct children of
    /// a schema table) are considered.
    pub(super) fn discriminator_parent(
        &mut self,
        pointer: &CanonicalPointer,
        schema: &Schema,
    ) -> Option<Subtype> {
        let name = pointer.last_segment()?;
        if pointer.parent()?.last_segment().as_deref() != Some("schemas") {
            return None;
        }
        for (index, member) in schema.all_of.iter().enumerate() {
            let Some(reference) = member.get("$ref").and_then(Value::as_str) else {
                continue;
            };
            let Some(target) = parse_ref(reference, pointer.document()) else {
                continue;
            };
            let Some(parent) = self.peek_schema(&target) else {
                continue;
            };
            let Some(discriminator) = parent.discriminator else {
                continue;
            };
            let mapped = mapping_key_for(&discriminator, target.document(), pointer);
            let has_union = !parent.one_of.is_empty() || !parent.any_of.is_empty();
            if has_union && mapped.is_none() {
                continue;
            }
            return Some(Subtype {
                index,
                property: discriminator.property_name,
                tag: mapped.unwrap_or(name),
            });
        }
        None
    }

    /// `{ <prop>: "<tag>" } & Omit<Parent, "<prop>"> & <rest>`
    pub(super) fn narrow_subtype(
        &mut self,
        subtype: Subtype,
        parent: NodeId,
        rest: Option<NodeKind>,
    ) -> NodeKind {
        let narrow = self.tag_object(&subtype.property, subtype.tag);
        let mut members = vec![
            IntersectionMember::plain(narrow),
            IntersectionMember {
                node: parent,
                omit: vec![subtype.property],
            },
        ];
        match rest {
            Some(NodeKind::Intersection { members: inner }) => members.extend(inner),
            Some(kind) => members.push(IntersectionMember::plain(self.alloc(kind))),
            None => {}
        }
        NodeKind::Intersection { members }
    }

    /// Tag each member and wrap it in a narrowing overlay.
    pub(super) fn discriminated_union(
        &mut self,
        pointer: &CanonicalPointer,
        raw_members: &[Value],
        members: Vec<NodeId>,
        discriminator: &Discriminator,
        exclusive: bool,
    ) -> NodeKind {
        let property = &discriminator.property_name;
        let mut overlays = Vec::with_capacity(members.len());
        let mut tags = Vec::with_capacity(members.len());
        for (raw, member) in raw_members.iter().zip(members) {
            let tag = self.member_tag(pointer, raw, discriminator);
            let node = match &tag {
                Some(tag) => {
                    let narrow = self.tag_object(property, tag.value.clone());
                    self.alloc(NodeKind::Intersection {
                        members: vec![
                            IntersectionMember::plain(narrow),
                            IntersectionMember {
                                node: member,
                                omit: vec![property.clone()],
                            },
                        ],
                    })
                }
                None => member,
            };
            overlays.push(node);
            tags.push(tag);
        }
        NodeKind::Union(UnionShape {
            members: overlays,
            exclusive,
            discriminator: Some(DiscriminatorBinding {
                property: property.clone(),
                tags,
            }),
        })
    }

    /// Mapping entry first, then the member's declared enum/const on the
    /// discriminant, then the reference's terminal name.
    fn member_tag(
        &mut self,
        pointer: &CanonicalPointer,
        raw: &Value,
        discriminator: &Discriminator,
    ) -> Option<MemberTag> {
        let target = raw
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|reference| parse_ref(reference, pointer.document()));

        if let Some(target) = &target {
            if let Some(value) = mapping_key_for(discriminator, pointer.document(), target) {
                return Some(MemberTag {
                    value,
                    source: TagSource::Mapping,
                });
            }
        }

        let declared = match &target {
            Some(target) => self.peek_schema(target),
            None => Schema::from_value(raw).ok(),
        };
        if let Some(value) = declared.and_then(|s| declared_tag(&s, &discriminator.property_name)) {
            return Some(MemberTag {
                value,
                source: TagSource::Declared,
            });
        }

        target
            .and_then(|t| t.last_segment())
            .map(|value| MemberTag {
                value,
                source: TagSource::ReferenceName,
            })
    }

    fn tag_object(&mut self, property: &str, tag: String) -> NodeId {
        let literal = self.alloc(NodeKind::literal(Literal::String(tag)));
        let mut properties = IndexMap::new();
        properties.insert(
            property.to_string(),
            Property {
                node: literal,
                required: true,
            },
        );
        self.alloc(NodeKind::Object(ObjectShape {
            properties,
            additional: AdditionalShape::Sealed,
        }))
    }

    fn peek_schema(&mut self, target: &CanonicalPointer) -> Option<Schema> {
        let document = self.store.document(target.document()).ok()?;
        Schema::from_value(document.pointer(target.pointer())?).ok()
    }
}

/// The mapping key whose value names `candidate`. Values are either `$ref`
/// strings (resolved against `document`) or bare schema names.
fn mapping_key_for(
    discriminator: &Discriminator,
    document: &DocumentId,
    candidate: &CanonicalPointer,
) -> Option<String> {
    let candidate_name = candidate.last_segment();
    discriminator
        .mapping
        .iter()
        .find(|(_, value)| {
            if value.contains('#') || value.contains('/') {
                parse_ref(value, document).is_some_and(|p| &p == candidate)
            } else {
                candidate_name.as_deref() == Some(value.as_str())
            }
        })
        .map(|(key, _)| key.clone())
}

/// A single string `enum` or `const` on the discriminant property.
fn declared_tag(schema: &Schema, property: &str) -> Option<String> {
    let declared = Schema::from_value(schema.properties.get(property)?).ok()?;
    if let Some(Value::String(value)) = &declared.const_value {
        return Some(value.clone());
    }
    match declared.enum_values.as_deref() {
        Some([Value::String(value)]) => Some(value.clone()),
        _ => None,
    }
}
