use indexmap::IndexMap;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use super::GraphBuilder;
use super::hooks::FragmentKind;
use crate::config::PathParameterStyle;
use crate::error::BuildError;
use crate::ir::{
    AdditionalShape, EntryKey, Namespace, NamespaceEntry, Namespaces, NodeId, NodeKind,
    ObjectShape, PathSegment, PrimitiveKind, Property, Reference,
};
use crate::parse::components::ComponentSection;
use crate::parse::operation::{HTTP_METHODS, Operation, PathItem};
use crate::parse::parameter::{Header, Parameter, ParameterLocation};
use crate::parse::pointer::CanonicalPointer;
use crate::parse::request_body::RequestBody;
use crate::parse::response::Response;

impl GraphBuilder<'_> {
    /// Walk the root document's sections and build every namespace.
    pub(super) fn assemble(&mut self) -> Result<Namespaces, BuildError> {
        let root = CanonicalPointer::root(self.store.root_id().clone());
        let paths = self.walk_routes(&root, "paths")?;
        let components = self.walk_components(&root)?;
        let webhooks = self.walk_routes(&root, "webhooks")?;
        let external = self.external_namespace()?;
        let operations = Namespace::from_entries(std::mem::take(&mut self.operations));
        Ok(Namespaces {
            paths,
            webhooks,
            components,
            external,
            operations,
        })
    }

    fn walk_routes(
        &mut self,
        root: &CanonicalPointer,
        section: &str,
    ) -> Result<Namespace, BuildError> {
        let document = self.store.root();
        let Some(Value::Object(routes)) = document.get(section) else {
            return Ok(Namespace::Empty);
        };
        let templated = section == "paths"
            && self.options.config.path_parameter_style == PathParameterStyle::TemplatedKeys;

        let base = root.join(section);
        let mut entries = IndexMap::with_capacity(routes.len());
        for route in routes.keys() {
            if self.check_cancelled() {
                break;
            }
            let id = self.synthesize(&base.join(route), FragmentKind::PathItem)?;
            let key = if templated {
                EntryKey::template(route)
            } else {
                EntryKey::name(route)
            };
            entries.insert(key, NamespaceEntry::Node(id));
        }
        Ok(Namespace::from_entries(entries))
    }

    fn walk_components(&mut self, root: &CanonicalPointer) -> Result<Namespace, BuildError> {
        let document = self.store.root();
        let Some(Value::Object(components)) = document.get("components") else {
            return Ok(Namespace::Empty);
        };

        let mut groups = IndexMap::with_capacity(ComponentSection::ALL.len());
        for section in ComponentSection::ALL {
            let kind = match section {
                ComponentSection::Schemas => FragmentKind::Schema,
                ComponentSection::Responses => FragmentKind::Response,
                ComponentSection::Parameters => FragmentKind::Parameter,
                ComponentSection::RequestBodies => FragmentKind::RequestBody,
                ComponentSection::Headers => FragmentKind::Header,
                ComponentSection::PathItems => FragmentKind::PathItem,
            };
            let base = root.join("components").join(section.key());
            let mut entries = IndexMap::new();
            if let Some(Value::Object(table)) = components.get(section.key()) {
                for name in table.keys() {
                    if self.check_cancelled() {
                        break;
                    }
                    let id = self.synthesize(&base.join(name), kind)?;
                    entries.insert(EntryKey::name(name), NamespaceEntry::Node(id));
                }
            }
            groups.insert(
                EntryKey::name(section.key()),
                NamespaceEntry::Group(Namespace::from_entries(entries)),
            );
        }
        Ok(Namespace::Entries(groups))
    }

    /// Register every referenced pointer that renders under `external`.
    ///
    /// Shallower pointers are registered first; a pointer whose ancestor is
    /// already registered is reachable through it and is skipped.
    fn external_namespace(&mut self) -> Result<Namespace, BuildError> {
        let mut targets: Vec<CanonicalPointer> = Vec::new();
        let mut seen = 0;
        // Registering a target can synthesize new fragments that reference
        // further external documents, so iterate until nothing new appears.
        while let Some(pointer) = self.referenced.get_index(seen).cloned() {
            seen += 1;
            if self.cancelled {
                break;
            }
            if self.lookup_path(&pointer).first()
                != Some(&PathSegment::Key("external".to_string()))
            {
                continue;
            }
            // Array and index-signature steps can't name a declaration.
            let mut target = pointer.clone();
            while self
                .lookup_path(&target)
                .iter()
                .any(|segment| !matches!(segment, PathSegment::Key(_)))
            {
                match target.parent() {
                    Some(parent) => target = parent,
                    None => break,
                }
            }
            if targets.contains(&target) {
                continue;
            }
            if self
                .resolve_target(&target, FragmentKind::Schema, &pointer)?
                .is_some()
            {
                targets.push(target);
            }
        }
        targets.sort_by_key(|target| target.segments().len());

        let mut tree = IndexMap::new();
        for target in &targets {
            let Some(&id) = self.cache.get(target) else {
                continue;
            };
            let path = self.lookup_path(target);
            insert_at_path(&mut tree, &path[1..], id);
        }
        Ok(Namespace::from_entries(tree))
    }

    /// Compose parameters, request bodies, responses, headers, operations
    /// and path items. A `$ref` in any of them becomes a reference.
    pub(super) fn compose_structural(
        &mut self,
        pointer: &CanonicalPointer,
        fragment: &Value,
        kind: FragmentKind,
    ) -> Result<NodeKind, BuildError> {
        if let Some(reference) = fragment.get("$ref").and_then(Value::as_str) {
            return self.resolve_ref(reference, pointer, kind);
        }
        match kind {
            FragmentKind::PathItem => self.compose_path_item(pointer, fragment),
            FragmentKind::Operation => self.compose_operation(pointer, fragment),
            FragmentKind::Parameter => {
                let parameter = read::<Parameter>(pointer, fragment).unwrap_or_default();
                self.compose_value_holder(pointer, parameter.schema.is_some(), &parameter.content)
            }
            FragmentKind::Header => {
                let header = read::<Header>(pointer, fragment).unwrap_or_default();
                self.compose_value_holder(pointer, header.schema.is_some(), &header.content)
            }
            FragmentKind::RequestBody => {
                let body = read::<RequestBody>(pointer, fragment).unwrap_or_default();
                let content = self.compose_content(pointer, &body.content)?;
                Ok(object([("content".to_string(), required(content))]))
            }
            FragmentKind::Response => self.compose_response(pointer, fragment),
            FragmentKind::Schema => self.compose_schema(pointer, fragment),
        }
    }

    /// Methods first, then the shared parameters.
    fn compose_path_item(
        &mut self,
        pointer: &CanonicalPointer,
        fragment: &Value,
    ) -> Result<NodeKind, BuildError> {
        let item = read::<PathItem>(pointer, fragment).unwrap_or_default();
        let mut properties = IndexMap::new();

        for method in HTTP_METHODS {
            let Some(raw) = fragment.get(method) else {
                continue;
            };
            let operation_pointer = pointer.join(method);
            let operation = self.synthesize(&operation_pointer, FragmentKind::Operation)?;
            let node = match raw.get("operationId").and_then(Value::as_str) {
                Some(operation_id) => {
                    self.declare_operation(operation_id, &operation_pointer, operation)
                }
                None => operation,
            };
            properties.insert(method.to_string(), required(node));
        }

        if !item.parameters.is_empty() {
            let params = indexed(&pointer.join("parameters"), &item.parameters);
            let groups = self.compose_parameter_groups(&params)?;
            let node = self.alloc(NodeKind::Object(groups));
            properties.insert("parameters".to_string(), required(node));
        }
        Ok(object(properties))
    }

    /// Declare an operation in the `operations` namespace and return a
    /// reference to it. Operations outside `paths`/`webhooks` stay inline.
    fn declare_operation(
        &mut self,
        operation_id: &str,
        pointer: &CanonicalPointer,
        operation: NodeId,
    ) -> NodeId {
        let path = self.render_path(pointer);
        if path.first() != Some(&PathSegment::Key("operations".to_string())) {
            return operation;
        }
        let key = EntryKey::name(operation_id);
        if self.operations.contains_key(&key) {
            warn!("{pointer}: duplicate operationId `{operation_id}`, keeping the last one");
        }
        self.operations.insert(key, NamespaceEntry::Node(operation));
        self.alloc(NodeKind::Reference(Reference {
            pointer: pointer.clone(),
            path,
            target: operation,
        }))
    }

    fn compose_operation(
        &mut self,
        pointer: &CanonicalPointer,
        fragment: &Value,
    ) -> Result<NodeKind, BuildError> {
        let operation = read::<Operation>(pointer, fragment).unwrap_or_default();
        let mut properties = IndexMap::new();

        // Path-level parameters come first; operation-level ones override
        // them in place.
        let mut params = Vec::new();
        if let Some(item_pointer) = pointer.parent() {
            let document = self.store.document(pointer.document()).ok();
            if let Some(Value::Array(shared)) = document
                .as_deref()
                .and_then(|doc| doc.pointer(item_pointer.pointer()))
                .and_then(|item| item.get("parameters"))
            {
                params.extend(indexed(&item_pointer.join("parameters"), shared));
            }
        }
        params.extend(indexed(&pointer.join("parameters"), &operation.parameters));
        if !params.is_empty() {
            let groups = self.compose_parameter_groups(&params)?;
            let node = self.alloc(NodeKind::Object(groups));
            properties.insert("parameters".to_string(), required(node));
        }

        if let Some(raw) = &operation.request_body {
            let body_pointer = pointer.join("requestBody");
            let is_required = self
                .peek(&body_pointer, raw)
                .and_then(|body| body.get("required").and_then(Value::as_bool))
                .unwrap_or(false);
            let node = self.synthesize(&body_pointer, FragmentKind::RequestBody)?;
            properties.insert(
                "requestBody".to_string(),
                Property {
                    node,
                    required: is_required,
                },
            );
        }

        if !operation.responses.is_empty() {
            let base = pointer.join("responses");
            let mut responses = IndexMap::with_capacity(operation.responses.len());
            for status in operation.responses.keys() {
                let node = self.synthesize(&base.join(status), FragmentKind::Response)?;
                responses.insert(status.clone(), required(node));
            }
            let node = self.alloc(object(responses));
            properties.insert("responses".to_string(), required(node));
        }
        Ok(object(properties))
    }

    /// Group parameters by location. Later entries with the same name and
    /// location replace earlier ones but keep their position; path
    /// parameters are always required.
    fn compose_parameter_groups(
        &mut self,
        params: &[(CanonicalPointer, Value)],
    ) -> Result<ObjectShape, BuildError> {
        let mut groups: IndexMap<ParameterLocation, IndexMap<String, Property>> = IndexMap::new();
        // Unreadable references have no location, so they sit next to the
        // groups under their raw `$ref`.
        let mut unresolved = IndexMap::new();
        for (pointer, raw) in params {
            let node = self.synthesize(pointer, FragmentKind::Parameter)?;
            let Some(resolved) = self.peek(pointer, raw) else {
                let key = raw
                    .get("$ref")
                    .and_then(Value::as_str)
                    .map_or_else(|| pointer.to_string(), str::to_string);
                unresolved.insert(
                    key,
                    Property {
                        node,
                        required: false,
                    },
                );
                continue;
            };
            let Ok(parameter) = Parameter::deserialize(&resolved) else {
                continue;
            };
            let (Some(name), Some(location)) = (parameter.name, parameter.location) else {
                debug!("{pointer}: parameter without name or location, skipped");
                continue;
            };
            let is_required = parameter.required || location == ParameterLocation::Path;
            groups.entry(location).or_default().insert(
                name,
                Property {
                    node,
                    required: is_required,
                },
            );
        }

        let mut properties = IndexMap::new();
        for location in ParameterLocation::ALL {
            let Some(group) = groups.shift_remove(&location) else {
                continue;
            };
            let any_required = group.values().any(|p| p.required);
            let node = self.alloc(object(group));
            properties.insert(
                location.as_str().to_string(),
                Property {
                    node,
                    required: any_required,
                },
            );
        }
        properties.extend(unresolved);
        Ok(ObjectShape {
            properties,
            additional: AdditionalShape::Sealed,
        })
    }

    /// A parameter or header is typed by its `schema`, else by the schema of
    /// its first `content` entry, else as a string.
    fn compose_value_holder(
        &mut self,
        pointer: &CanonicalPointer,
        has_schema: bool,
        content: &IndexMap<String, Value>,
    ) -> Result<NodeKind, BuildError> {
        let schema_pointer = if has_schema {
            Some(pointer.join("schema"))
        } else {
            content
                .iter()
                .find(|(_, media)| media.get("schema").is_some())
                .map(|(media_type, _)| pointer.join("content").join(media_type).join("schema"))
        };
        match schema_pointer {
            Some(schema_pointer) => {
                let id = self.synthesize(&schema_pointer, FragmentKind::Schema)?;
                Ok(self.single_member(id))
            }
            None => Ok(NodeKind::Primitive {
                primitive: PrimitiveKind::String,
                format: None,
            }),
        }
    }

    fn compose_response(
        &mut self,
        pointer: &CanonicalPointer,
        fragment: &Value,
    ) -> Result<NodeKind, BuildError> {
        let response = read::<Response>(pointer, fragment).unwrap_or_default();
        let mut properties = IndexMap::new();

        let base = pointer.join("headers");
        let mut headers = IndexMap::with_capacity(response.headers.len());
        for (name, raw) in &response.headers {
            let header_pointer = base.join(name);
            let is_required = self
                .peek(&header_pointer, raw)
                .and_then(|header| header.get("required").and_then(Value::as_bool))
                .unwrap_or(false);
            let node = self.synthesize(&header_pointer, FragmentKind::Header)?;
            headers.insert(
                name.clone(),
                Property {
                    node,
                    required: is_required,
                },
            );
        }
        let any_header = self.alloc(NodeKind::Unknown);
        let node = self.alloc(NodeKind::Object(ObjectShape {
            properties: headers,
            additional: AdditionalShape::Allowed(any_header),
        }));
        properties.insert("headers".to_string(), required(node));

        if !response.content.is_empty() {
            let content = self.compose_content(pointer, &response.content)?;
            properties.insert("content".to_string(), required(content));
        }
        Ok(object(properties))
    }

    /// `{ "<media type>": <schema> }`; media types without a schema are unknown.
    fn compose_content(
        &mut self,
        pointer: &CanonicalPointer,
        content: &IndexMap<String, Value>,
    ) -> Result<NodeId, BuildError> {
        let base = pointer.join("content");
        let mut media = IndexMap::with_capacity(content.len());
        for (media_type, raw) in content {
            let node = if raw.get("schema").is_some() {
                self.synthesize(&base.join(media_type).join("schema"), FragmentKind::Schema)?
            } else {
                self.alloc(NodeKind::Unknown)
            };
            media.insert(media_type.clone(), required(node));
        }
        Ok(self.alloc(object(media)))
    }
}

fn read<T: for<'de> Deserialize<'de>>(pointer: &CanonicalPointer, fragment: &Value) -> Option<T> {
    match T::deserialize(fragment) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{pointer}: unreadable fragment ({err})");
            None
        }
    }
}

fn indexed(base: &CanonicalPointer, items: &[Value]) -> Vec<(CanonicalPointer, Value)> {
    items
        .iter()
        .enumerate()
        .map(|(index, raw)| (base.join(index.to_string()), raw.clone()))
        .collect()
}

fn required(node: NodeId) -> Property {
    Property {
        node,
        required: true,
    }
}

fn object(properties: impl IntoIterator<Item = (String, Property)>) -> NodeKind {
    NodeKind::Object(ObjectShape {
        properties: properties.into_iter().collect(),
        additional: AdditionalShape::Sealed,
    })
}

/// Insert `id` under nested groups named by `path`. Paths below an existing
/// node are dropped; that node already contains them.
fn insert_at_path(tree: &mut IndexMap<EntryKey, NamespaceEntry>, path: &[PathSegment], id: NodeId) {
    let [PathSegment::Key(head), rest @ ..] = path else {
        return;
    };
    let key = EntryKey::name(head);
    if rest.is_empty() {
        tree.insert(key, NamespaceEntry::Node(id));
        return;
    }
    let entry = tree
        .entry(key)
        .or_insert_with(|| NamespaceEntry::Group(Namespace::Entries(IndexMap::new())));
    match entry {
        NamespaceEntry::Group(Namespace::Entries(children)) => insert_at_path(children, rest, id),
        NamespaceEntry::Group(group @ Namespace::Empty) => {
            let mut children = IndexMap::new();
            insert_at_path(&mut children, rest, id);
            *group = Namespace::from_entries(children);
        }
        NamespaceEntry::Node(_) => {}
    }
}
