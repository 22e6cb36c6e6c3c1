use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;

use super::GraphBuilder;
use super::hooks::FragmentKind;
use crate::error::BuildError;
use crate::ir::graph::union_needs_helper;
use crate::ir::{
    AdditionalShape, Annotations, ArrayShape, IntersectionMember, Literal, NodeId, NodeKind,
    ObjectShape, PrimitiveKind, Property, UnionShape,
};
use crate::parse::pointer::CanonicalPointer;
use crate::parse::schema::{AdditionalProperties, Schema, SchemaType};

/// Read the passive annotations of any fragment.
pub(super) fn annotations_of(fragment: &Value) -> Annotations {
    let text = |key: &str| fragment.get(key).and_then(Value::as_str).map(str::to_string);
    let flag = |key: &str| fragment.get(key).and_then(Value::as_bool).unwrap_or(false);
    Annotations {
        title: text("title"),
        description: text("description"),
        format: text("format"),
        default: fragment.get("default").cloned(),
        example: fragment.get("example").cloned(),
        deprecated: flag("deprecated"),
        read_only: flag("readOnly"),
        write_only: flag("writeOnly"),
    }
}

impl GraphBuilder<'_> {
    pub(super) fn compose_schema(
        &mut self,
        pointer: &CanonicalPointer,
        fragment: &Value,
    ) -> Result<NodeKind, BuildError> {
        let schema = match fragment {
            Value::Object(_) => match Schema::from_value(fragment) {
                Ok(schema) => schema,
                Err(err) => {
                    warn!("{pointer}: unreadable schema ({err}), treating as unknown");
                    return Ok(NodeKind::Unknown);
                }
            },
            // `true` / `false` schemas
            Value::Bool(_) => return Ok(NodeKind::Unknown),
            _ => {
                warn!("{pointer}: expected a schema object");
                return Ok(NodeKind::Unknown);
            }
        };

        let mut parts = Vec::new();
        if let Some(reference) = &schema.ref_path {
            let reference = self.resolve_ref(reference, pointer, FragmentKind::Schema)?;
            if !schema.has_structure() {
                return Ok(reference);
            }
            parts.push(reference);
        }

        let has_union = !schema.one_of.is_empty() || !schema.any_of.is_empty();
        if !schema.all_of.is_empty() {
            parts.push(self.compose_all_of(pointer, &schema)?);
        } else if schema.has_own_shape() || (!has_union && schema.ref_path.is_none()) {
            parts.push(self.compose_shape(pointer, &schema)?);
        }
        if !schema.one_of.is_empty() {
            parts.push(self.compose_union(pointer, &schema, true)?);
        }
        if !schema.any_of.is_empty() {
            parts.push(self.compose_union(pointer, &schema, false)?);
        }

        let mut kind = if parts.len() == 1 {
            parts.remove(0)
        } else {
            let members = parts
                .into_iter()
                .map(|part| IntersectionMember::plain(self.alloc(part)))
                .collect();
            NodeKind::Intersection { members }
        };

        // `{ $ref, required: [...] }` makes keys of the target required.
        if schema.ref_path.is_some()
            && schema.all_of.is_empty()
            && !schema.has_object_shape()
            && !schema.required.is_empty()
        {
            let base = self.alloc(kind);
            self.use_required_override_helper(pointer);
            kind = NodeKind::RequiredOverride {
                base,
                keys: schema.required.clone(),
            };
        }

        if schema.is_nullable() && !is_null(&kind) {
            kind = self.with_null(kind);
        }
        Ok(kind)
    }

    /// Type, object, array, enum and const keywords of one level.
    fn compose_shape(
        &mut self,
        pointer: &CanonicalPointer,
        schema: &Schema,
    ) -> Result<NodeKind, BuildError> {
        if let Some(value) = schema.const_value.as_ref().and_then(Literal::from_value) {
            return Ok(NodeKind::literal(value));
        }
        if let Some(values) = &schema.enum_values {
            let mut literals: Vec<Literal> = values.iter().filter_map(Literal::from_value).collect();
            return Ok(match literals.len() {
                0 => NodeKind::Unknown,
                1 => NodeKind::literal(literals.remove(0)),
                _ => NodeKind::Enum { values: literals },
            });
        }

        let (types, _) = schema.types();
        match types.as_slice() {
            [] if schema.has_object_shape() => {
                Ok(NodeKind::Object(self.compose_object(pointer, schema)?))
            }
            [] if schema.items.is_some() => self.compose_array(pointer, schema),
            [] => Ok(NodeKind::Unknown),
            [single] => self.shape_for_type(pointer, schema, *single),
            many => {
                let mut members = Vec::with_capacity(many.len());
                for schema_type in many {
                    let kind = self.shape_for_type(pointer, schema, *schema_type)?;
                    members.push(self.alloc(kind));
                }
                Ok(NodeKind::Union(UnionShape {
                    members,
                    exclusive: false,
                    discriminator: None,
                }))
            }
        }
    }

    fn shape_for_type(
        &mut self,
        pointer: &CanonicalPointer,
        schema: &Schema,
        schema_type: SchemaType,
    ) -> Result<NodeKind, BuildError> {
        let primitive = |primitive| NodeKind::Primitive {
            primitive,
            format: schema.format.clone(),
        };
        Ok(match schema_type {
            SchemaType::String => primitive(PrimitiveKind::String),
            SchemaType::Number => primitive(PrimitiveKind::Number),
            SchemaType::Integer => primitive(PrimitiveKind::Integer),
            SchemaType::Boolean => primitive(PrimitiveKind::Boolean),
            SchemaType::Null => primitive(PrimitiveKind::Null),
            SchemaType::Object => NodeKind::Object(self.compose_object(pointer, schema)?),
            SchemaType::Array => self.compose_array(pointer, schema)?,
            SchemaType::Other => NodeKind::Unknown,
        })
    }

    pub(super) fn compose_object(
        &mut self,
        pointer: &CanonicalPointer,
        schema: &Schema,
    ) -> Result<ObjectShape, BuildError> {
        let base = pointer.join("properties");
        let mut properties = IndexMap::with_capacity(schema.properties.len());
        for name in schema.properties.keys() {
            let node = self.synthesize(&base.join(name), FragmentKind::Schema)?;
            let required = schema.required.contains(name);
            properties.insert(name.clone(), Property { node, required });
        }
        let additional = match &schema.additional_properties {
            None | Some(AdditionalProperties::Bool(false)) => AdditionalShape::Sealed,
            Some(AdditionalProperties::Bool(true)) => {
                AdditionalShape::Allowed(self.alloc(NodeKind::Unknown))
            }
            Some(AdditionalProperties::Schema(_)) => AdditionalShape::Allowed(
                self.synthesize(&pointer.join("additionalProperties"), FragmentKind::Schema)?,
            ),
        };
        Ok(ObjectShape {
            properties,
            additional,
        })
    }

    fn compose_array(
        &mut self,
        pointer: &CanonicalPointer,
        schema: &Schema,
    ) -> Result<NodeKind, BuildError> {
        let items = match &schema.items {
            Some(_) => self.synthesize(&pointer.join("items"), FragmentKind::Schema)?,
            None => self.alloc(NodeKind::Unknown),
        };
        let length = match (schema.min_items, schema.max_items) {
            (Some(min), Some(max)) if min == max => usize::try_from(min).ok(),
            _ => None,
        };
        Ok(NodeKind::Array(ArrayShape { items, length }))
    }

    fn compose_all_of(
        &mut self,
        pointer: &CanonicalPointer,
        schema: &Schema,
    ) -> Result<NodeKind, BuildError> {
        let subtype = self.discriminator_parent(pointer, schema);
        if let Some(subtype) = &subtype {
            self.discriminator_scope.push(subtype.property.clone());
        }

        let base = pointer.join("allOf");
        let mut parent = None;
        let mut members = Vec::with_capacity(schema.all_of.len() + 1);
        for index in 0..schema.all_of.len() {
            let id = self.synthesize(&base.join(index.to_string()), FragmentKind::Schema)?;
            if subtype.as_ref().is_some_and(|s| s.index == index) {
                parent = Some(id);
            } else {
                members.push(id);
            }
        }
        if schema.has_object_shape() {
            let own = self.compose_object(pointer, schema)?;
            members.push(self.alloc(NodeKind::Object(own)));
        }
        let merged = self.merge_all_of(pointer, schema, members);

        if subtype.is_some() {
            self.discriminator_scope.pop();
        }
        Ok(match (subtype, parent) {
            (Some(subtype), Some(parent)) => self.narrow_subtype(subtype, parent, merged),
            _ => merged.unwrap_or(NodeKind::Unknown),
        })
    }

    /// Flatten `allOf` members when every one is an inspectable object;
    /// otherwise intersect them. `None` when there are no members.
    fn merge_all_of(
        &mut self,
        pointer: &CanonicalPointer,
        schema: &Schema,
        members: Vec<NodeId>,
    ) -> Option<NodeKind> {
        if members.is_empty() {
            return None;
        }

        let flattenable = members.iter().all(|id| {
            let node = self.node(*id);
            node.rendered_override.is_none() && node.kind.as_object().is_some()
        });
        if flattenable {
            let mut merged = ObjectShape::sealed();
            for id in &members {
                let Some(shape) = self.node(*id).kind.as_object().cloned() else {
                    continue;
                };
                for (name, property) in shape.properties {
                    match merged.properties.get_mut(&name) {
                        Some(existing) => {
                            if existing.node != property.node {
                                debug!("{pointer}: allOf members both declare `{name}`, later member wins");
                            }
                            existing.node = property.node;
                            existing.required |= property.required;
                        }
                        None => {
                            merged.properties.insert(name, property);
                        }
                    }
                }
                if let AdditionalShape::Allowed(_) = shape.additional {
                    merged.additional = shape.additional;
                }
            }

            let mut layered = false;
            for key in &schema.required {
                if let Some(property) = merged.properties.get_mut(key) {
                    if !property.required {
                        property.required = true;
                        layered = true;
                    }
                }
            }
            if layered {
                self.use_required_override_helper(pointer);
            }
            return Some(NodeKind::Object(merged));
        }

        let missing: Vec<String> = schema
            .required
            .iter()
            .filter(|key| {
                !members.iter().any(|id| {
                    self.node(*id)
                        .kind
                        .as_object()
                        .and_then(|shape| shape.properties.get(key.as_str()))
                        .is_some_and(|p| p.required)
                })
            })
            .cloned()
            .collect();

        let kind = if members.len() == 1 {
            self.single_member(members[0])
        } else {
            NodeKind::Intersection {
                members: members.into_iter().map(IntersectionMember::plain).collect(),
            }
        };
        if missing.is_empty() {
            return Some(kind);
        }
        let base = self.alloc(kind);
        self.use_required_override_helper(pointer);
        Some(NodeKind::RequiredOverride {
            base,
            keys: missing,
        })
    }

    fn compose_union(
        &mut self,
        pointer: &CanonicalPointer,
        schema: &Schema,
        exclusive: bool,
    ) -> Result<NodeKind, BuildError> {
        let (keyword, list) = if exclusive {
            ("oneOf", &schema.one_of)
        } else {
            ("anyOf", &schema.any_of)
        };

        if let Some(discriminator) = &schema.discriminator {
            self.discriminator_scope.push(discriminator.property_name.clone());
        }
        let base = pointer.join(keyword);
        let mut members = Vec::with_capacity(list.len());
        for index in 0..list.len() {
            members.push(self.synthesize(&base.join(index.to_string()), FragmentKind::Schema)?);
        }
        if let Some(discriminator) = &schema.discriminator {
            self.discriminator_scope.pop();
            return Ok(self.discriminated_union(pointer, list, members, discriminator, exclusive));
        }

        if members.len() == 1 {
            return Ok(self.single_member(members[0]));
        }
        let union = UnionShape {
            members,
            exclusive,
            discriminator: None,
        };
        if union_needs_helper(&self.nodes, &union) {
            self.use_exclusive_union_helper(pointer);
        }
        Ok(NodeKind::Union(union))
    }

    /// The kind to use when a composition collapses to one member.
    pub(super) fn single_member(&self, id: NodeId) -> NodeKind {
        let node = self.node(id);
        if node.rendered_override.is_none() {
            node.kind.clone()
        } else {
            NodeKind::Intersection {
                members: vec![IntersectionMember::plain(id)],
            }
        }
    }

    fn with_null(&mut self, kind: NodeKind) -> NodeKind {
        let null = self.alloc(NodeKind::Primitive {
            primitive: PrimitiveKind::Null,
            format: None,
        });
        match kind {
            NodeKind::Union(mut union) if !union.exclusive && union.discriminator.is_none() => {
                union.members.push(null);
                NodeKind::Union(union)
            }
            other => {
                let inner = self.alloc(other);
                NodeKind::Union(UnionShape {
                    members: vec![inner, null],
                    exclusive: false,
                    discriminator: None,
                })
            }
        }
    }
}

fn is_null(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Primitive {
            primitive: PrimitiveKind::Null,
            ..
        } | NodeKind::Literal {
            value: Literal::Null
        }
    )
}
