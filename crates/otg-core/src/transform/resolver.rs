use log::{debug, trace};
use serde::Deserialize;
use serde_json::Value;

use super::GraphBuilder;
use super::compose::annotations_of;
use super::hooks::{FragmentKind, NodeContext};
use crate::error::{BuildError, ResolveError};
use crate::ir::{NodeId, NodeKind, PathSegment, Reference, TypeNode, dotted_path};
use crate::parse::components::ComponentSection;
use crate::parse::operation::HTTP_METHODS;
use crate::parse::parameter::Parameter;
use crate::parse::pointer::{CanonicalPointer, parse_ref};

impl GraphBuilder<'_> {
    /// Return the node for `pointer`, synthesizing it on first use.
    ///
    /// The node id is reserved in the cache before the fragment is composed,
    /// so a reference back to a pointer still in progress gets that id
    /// instead of recursing.
    pub(super) fn synthesize(
        &mut self,
        pointer: &CanonicalPointer,
        kind: FragmentKind,
    ) -> Result<NodeId, BuildError> {
        if let Some(&id) = self.cache.get(pointer) {
            if self.in_progress.contains(pointer) {
                debug!("{pointer}: cycle, reusing reserved node {id}");
            }
            return Ok(id);
        }
        if self.check_cancelled() {
            return Ok(self.alloc(NodeKind::Unknown));
        }

        trace!("{pointer}: synthesizing {kind:?}");
        let id = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(TypeNode::new(NodeKind::Unknown).with_origin(pointer.clone()));
        self.cache.insert(pointer.clone(), id);

        self.in_progress.push(pointer.clone());
        let filled = self.fill(pointer, id, kind);
        self.in_progress.pop();
        filled.map(|()| id)
    }

    fn fill(
        &mut self,
        pointer: &CanonicalPointer,
        id: NodeId,
        kind: FragmentKind,
    ) -> Result<(), BuildError> {
        let Ok(document) = self.store.document(pointer.document()) else {
            return Ok(());
        };
        let Some(fragment) = document.pointer(pointer.pointer()) else {
            return Ok(());
        };
        self.nodes[id.index()].annotations = annotations_of(fragment);

        if kind != FragmentKind::Schema {
            let composed = self.compose_structural(pointer, fragment, kind)?;
            self.nodes[id.index()].kind = composed;
            return Ok(());
        }

        let ctx = self.context(pointer, kind);
        if let Some(source) = self.run_pre_hook(fragment, &ctx)? {
            self.nodes[id.index()].kind = NodeKind::Expression { source };
            return Ok(());
        }
        let composed = self.compose_schema(pointer, fragment)?;
        self.nodes[id.index()].kind = composed;
        self.run_post_hook(id, &ctx)
    }

    fn context(&self, pointer: &CanonicalPointer, kind: FragmentKind) -> NodeContext {
        NodeContext {
            pointer: pointer.clone(),
            path: dotted_path(&self.render_path(pointer)),
            kind,
            discriminator: self.discriminator_scope.last().cloned(),
        }
    }

    /// Locate `pointer` and synthesize it, recording a [`ResolveError`] when
    /// its document or fragment can't be found.
    pub(super) fn resolve_target(
        &mut self,
        pointer: &CanonicalPointer,
        kind: FragmentKind,
        origin: &CanonicalPointer,
    ) -> Result<Option<NodeId>, BuildError> {
        if let Some(&id) = self.cache.get(pointer) {
            return Ok(Some(id));
        }
        let document = match self.store.document(pointer.document()) {
            Ok(document) => document,
            Err(err) => {
                self.errors.push(ResolveError::ExternalLoad {
                    document: pointer.document().to_string(),
                    pointer: pointer.to_string(),
                    origin: origin.to_string(),
                    reason: err.to_string(),
                });
                return Ok(None);
            }
        };
        if document.pointer(pointer.pointer()).is_none() {
            self.errors.push(ResolveError::UnresolvedRef {
                pointer: pointer.to_string(),
                origin: origin.to_string(),
            });
            return Ok(None);
        }
        self.synthesize(pointer, kind).map(Some)
    }

    /// Turn a `$ref` found at `origin` into a reference node kind, or an
    /// unresolved marker.
    pub(super) fn resolve_ref(
        &mut self,
        reference: &str,
        origin: &CanonicalPointer,
        kind: FragmentKind,
    ) -> Result<NodeKind, BuildError> {
        let Some(target) = parse_ref(reference, origin.document()) else {
            self.errors.push(ResolveError::InvalidRefFormat {
                reference: reference.to_string(),
                origin: origin.to_string(),
            });
            return Ok(NodeKind::Unresolved {
                pointer: reference.to_string(),
            });
        };
        match self.resolve_target(&target, kind, origin)? {
            Some(id) => {
                let path = self.lookup_path(&target);
                self.referenced.insert(target.clone());
                Ok(NodeKind::Reference(Reference {
                    pointer: target,
                    path,
                    target: id,
                }))
            }
            None => Ok(NodeKind::Unresolved {
                pointer: target.to_string(),
            }),
        }
    }

    /// Follow `$ref` chains starting at `raw` and return the final fragment.
    pub(super) fn peek(&mut self, pointer: &CanonicalPointer, raw: &Value) -> Option<Value> {
        let mut current = raw.clone();
        let mut document = pointer.document().clone();
        for _ in 0..16 {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return Some(current);
            };
            let target = parse_ref(reference, &document)?;
            let doc = self.store.document(target.document()).ok()?;
            current = doc.pointer(target.pointer())?.clone();
            document = target.document().clone();
        }
        None
    }

    /// Path of `pointer` from its namespace root, as hooks see it.
    ///
    /// Component tables map to `components`, routes and webhooks to their own
    /// namespace (or `operations` when the operation has an id), and
    /// everything else to `external`, keyed by document.
    pub(super) fn render_path(&self, pointer: &CanonicalPointer) -> Vec<PathSegment> {
        let segments = pointer.segments();
        let (mut path, consumed) = self.namespace_prefix(pointer, &segments);

        let mut rest = segments[consumed..].iter();
        while let Some(segment) = rest.next() {
            match segment.as_str() {
                "properties" => {
                    if let Some(name) = rest.next() {
                        path.push(PathSegment::Key(name.clone()));
                    }
                }
                "items" => path.push(PathSegment::Index),
                "additionalProperties" => path.push(PathSegment::AnyKey),
                "schema" => {}
                other => path.push(PathSegment::Key(other.to_string())),
            }
        }
        path
    }

    /// Path a reference to `pointer` indexes into the rendered output.
    ///
    /// Unlike [`render_path`](Self::render_path), this follows the shapes the
    /// builder synthesizes: positional parameters are keyed by location and
    /// name, and `content` wrappers of parameters and headers are skipped.
    /// Composition members have no key of their own, so a target below one
    /// is declared under `external` by its raw pointer instead.
    pub(super) fn lookup_path(&self, pointer: &CanonicalPointer) -> Vec<PathSegment> {
        let segments = pointer.segments();
        let (mut path, consumed) = self.namespace_prefix(pointer, &segments);
        let rest = &segments[consumed..];
        let mut value_holder = consumed == 3
            && segments[0] == "components"
            && (segments[1] == "parameters" || segments[1] == "headers");

        let mut index = 0;
        while index < rest.len() {
            let next = rest.get(index + 1);
            let holder = std::mem::take(&mut value_holder);
            match rest[index].as_str() {
                "properties" => {
                    if let Some(name) = next {
                        path.push(PathSegment::Key(name.clone()));
                    }
                    index += 2;
                    continue;
                }
                "content" if holder => {
                    index += 2;
                    continue;
                }
                "parameters" if next.is_some_and(|n| n.parse::<usize>().is_ok()) => {
                    let Some((location, name)) = self.parameter_slot(pointer, rest.len() - index - 2)
                    else {
                        return detached_path(pointer);
                    };
                    path.push(PathSegment::Key("parameters".to_string()));
                    path.push(PathSegment::Key(location));
                    path.push(PathSegment::Key(name));
                    value_holder = true;
                    index += 2;
                    continue;
                }
                "headers" if next.is_some() => {
                    path.push(PathSegment::Key("headers".to_string()));
                    path.extend(next.map(|name| PathSegment::Key(name.clone())));
                    value_holder = true;
                    index += 2;
                    continue;
                }
                "allOf" | "oneOf" | "anyOf" | "not" => return detached_path(pointer),
                "items" => path.push(PathSegment::Index),
                "additionalProperties" => path.push(PathSegment::AnyKey),
                "schema" => value_holder = holder,
                other => path.push(PathSegment::Key(other.to_string())),
            }
            index += 1;
        }
        path
    }

    /// Location and name of the parameter `depth` levels above `pointer`.
    /// Only documents already in the store are consulted.
    fn parameter_slot(&self, pointer: &CanonicalPointer, depth: usize) -> Option<(String, String)> {
        let mut slot = pointer.clone();
        for _ in 0..depth {
            slot = slot.parent()?;
        }
        let mut document = slot.document().clone();
        let mut current = self.store.get(&document)?.pointer(slot.pointer())?.clone();
        for _ in 0..16 {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                let parameter = Parameter::deserialize(&current).ok()?;
                return Some((parameter.location?.as_str().to_string(), parameter.name?));
            };
            let target = parse_ref(reference, &document)?;
            current = self.store.get(target.document())?.pointer(target.pointer())?.clone();
            document = target.document().clone();
        }
        None
    }

    /// Namespace root of `pointer` and how many of its segments it accounts
    /// for.
    fn namespace_prefix(
        &self,
        pointer: &CanonicalPointer,
        segments: &[String],
    ) -> (Vec<PathSegment>, usize) {
        let in_root = pointer.document() == self.store.root_id();
        match segments {
            [first, section, name, ..]
                if in_root
                    && first == "components"
                    && ComponentSection::from_key(section).is_some() =>
            {
                (
                    vec![
                        PathSegment::Key(first.clone()),
                        PathSegment::Key(section.clone()),
                        PathSegment::Key(name.clone()),
                    ],
                    3,
                )
            }
            [first, route, rest @ ..] if in_root && (first == "paths" || first == "webhooks") => {
                match rest
                    .first()
                    .and_then(|method| self.operation_id(first, route, method))
                {
                    Some(operation_id) => (
                        vec![
                            PathSegment::Key("operations".to_string()),
                            PathSegment::Key(operation_id),
                        ],
                        3,
                    ),
                    None => (
                        vec![
                            PathSegment::Key(first.clone()),
                            PathSegment::Key(route.clone()),
                        ],
                        2,
                    ),
                }
            }
            _ => (
                vec![
                    PathSegment::Key("external".to_string()),
                    PathSegment::Key(pointer.document().to_string()),
                ],
                0,
            ),
        }
    }

    fn operation_id(&self, section: &str, route: &str, method: &str) -> Option<String> {
        if !HTTP_METHODS.contains(&method) {
            return None;
        }
        let root = self.store.root();
        root.get(section)?
            .get(route)?
            .get(method)?
            .get("operationId")?
            .as_str()
            .map(str::to_string)
    }
}

fn detached_path(pointer: &CanonicalPointer) -> Vec<PathSegment> {
    vec![
        PathSegment::Key("external".to_string()),
        PathSegment::Key(pointer.document().to_string()),
        PathSegment::Key(pointer.pointer().to_string()),
    ]
}
