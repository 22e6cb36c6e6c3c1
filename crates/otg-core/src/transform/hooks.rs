use serde_json::Value;

use super::GraphBuilder;
use crate::error::{BuildError, HookError};
use crate::ir::{NodeId, TypeNode};
use crate::parse::pointer::CanonicalPointer;

/// What a fragment is, as seen by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Schema,
    Parameter,
    Header,
    RequestBody,
    Response,
    Operation,
    PathItem,
}

/// Where a hook is being invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContext {
    pub pointer: CanonicalPointer,
    /// Dotted lookup path, e.g. `components.schemas.Pet.name`.
    pub path: String,
    pub kind: FragmentKind,
    /// Discriminant property of the enclosing discriminated union, if any.
    pub discriminator: Option<String>,
}

/// Caller-supplied extension points, invoked once per schema fragment.
///
/// Returning `Ok(None)` keeps the synthesized node unchanged.
pub trait TransformHooks {
    /// Runs before composition. Returned text replaces the node entirely.
    fn pre_transform(
        &self,
        _fragment: &Value,
        _ctx: &NodeContext,
    ) -> Result<Option<String>, HookError> {
        Ok(None)
    }

    /// Runs after composition. Returned text becomes the node's rendered form.
    fn post_transform(
        &self,
        _node: &TypeNode,
        _ctx: &NodeContext,
    ) -> Result<Option<String>, HookError> {
        Ok(None)
    }
}

/// Hooks that never change anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl TransformHooks for NoHooks {}

impl GraphBuilder<'_> {
    pub(super) fn run_pre_hook(
        &mut self,
        fragment: &Value,
        ctx: &NodeContext,
    ) -> Result<Option<String>, BuildError> {
        let result = self
            .options
            .hooks
            .pre_transform(fragment, ctx)
            .map_err(|source| BuildError::Hook {
                path: ctx.path.clone(),
                source,
            })?;
        if let Some(text) = &result {
            self.note_helper_mentions(text, &ctx.pointer);
        }
        Ok(result)
    }

    pub(super) fn run_post_hook(&mut self, id: NodeId, ctx: &NodeContext) -> Result<(), BuildError> {
        let result = self
            .options
            .hooks
            .post_transform(self.node(id), ctx)
            .map_err(|source| BuildError::Hook {
                path: ctx.path.clone(),
                source,
            })?;
        if let Some(text) = result {
            self.drop_helper_uses(&ctx.pointer);
            self.note_helper_mentions(&text, &ctx.pointer);
            self.nodes[id.index()].rendered_override = Some(text);
        }
        Ok(())
    }

    /// Hook output is opaque text; a helper is used if it is applied in it.
    fn note_helper_mentions(&mut self, text: &str, at: &CanonicalPointer) {
        let config = &self.options.config;
        let exclusive = text.contains(&format!("{}<", config.exclusive_union_helper_name));
        let required = text.contains(&format!("{}<", config.required_override_helper_name));
        if exclusive {
            self.use_exclusive_union_helper(at);
        }
        if required {
            self.use_required_override_helper(at);
        }
    }
}
