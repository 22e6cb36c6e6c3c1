mod assemble;
mod compose;
mod discriminator;
mod hooks;
mod resolver;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::config::GraphConfig;
use crate::error::{BuildError, ResolveError};
use crate::ir::{
    EntryKey, HelperNames, HelperUsage, NamespaceEntry, Namespaces, NodeId, NodeKind, TypeGraph,
    TypeNode,
};
use crate::parse::pointer::CanonicalPointer;
use crate::store::DocumentStore;

pub use hooks::{FragmentKind, NoHooks, NodeContext, TransformHooks};

/// Everything a build needs besides the documents.
pub struct BuildOptions<'a> {
    pub config: GraphConfig,
    pub hooks: &'a dyn TransformHooks,
    /// Raised by another thread to stop the build early.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BuildOptions<'_> {
    fn default() -> Self {
        Self {
            config: GraphConfig::default(),
            hooks: &NoHooks,
            cancel: None,
        }
    }
}

impl<'a> BuildOptions<'a> {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_hooks(mut self, hooks: &'a dyn TransformHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Resolve every reference in the store's root document and synthesize the
/// type graph.
///
/// Resolution failures are collected on the graph; only hook failures abort.
pub fn build(store: &mut DocumentStore, options: &BuildOptions<'_>) -> Result<TypeGraph, BuildError> {
    let mut builder = GraphBuilder::new(store, options);
    let namespaces = builder.assemble()?;
    Ok(builder.finish(namespaces))
}

/// Per-build state. Every field is scoped to one call of [`build`].
pub(crate) struct GraphBuilder<'a> {
    store: &'a mut DocumentStore,
    options: &'a BuildOptions<'a>,
    nodes: Vec<TypeNode>,
    cache: IndexMap<CanonicalPointer, NodeId>,
    in_progress: Vec<CanonicalPointer>,
    referenced: IndexSet<CanonicalPointer>,
    discriminator_scope: Vec<String>,
    operations: IndexMap<EntryKey, NamespaceEntry>,
    exclusive_union_sites: IndexSet<CanonicalPointer>,
    required_override_sites: IndexSet<CanonicalPointer>,
    errors: Vec<ResolveError>,
    cancelled: bool,
}

impl<'a> GraphBuilder<'a> {
    fn new(store: &'a mut DocumentStore, options: &'a BuildOptions<'a>) -> Self {
        Self {
            store,
            options,
            nodes: Vec::new(),
            cache: IndexMap::new(),
            in_progress: Vec::new(),
            referenced: IndexSet::new(),
            discriminator_scope: Vec::new(),
            operations: IndexMap::new(),
            exclusive_union_sites: IndexSet::new(),
            required_override_sites: IndexSet::new(),
            errors: Vec::new(),
            cancelled: false,
        }
    }

    fn finish(self, namespaces: Namespaces) -> TypeGraph {
        let config = &self.options.config;
        TypeGraph {
            namespaces,
            nodes: self.nodes,
            index: self.cache,
            helpers: HelperUsage {
                uses_exclusive_union_helper: !self.exclusive_union_sites.is_empty(),
                uses_required_override_helper: !self.required_override_sites.is_empty(),
            },
            helper_names: HelperNames {
                exclusive_union: config.exclusive_union_helper_name.clone(),
                required_override: config.required_override_helper_name.clone(),
            },
            preamble: config.raw_preamble.clone(),
            errors: self.errors,
            cancelled: self.cancelled,
        }
    }

    /// Add a synthetic node that no pointer addresses.
    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TypeNode::new(kind));
        id
    }

    fn node(&self, id: NodeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    fn check_cancelled(&mut self) -> bool {
        if !self.cancelled
            && self
                .options
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            debug!("build cancelled, returning partial graph");
            self.cancelled = true;
        }
        self.cancelled
    }

    fn use_exclusive_union_helper(&mut self, at: &CanonicalPointer) {
        if self.exclusive_union_sites.is_empty() {
            debug!("{at}: needs {}", self.options.config.exclusive_union_helper_name);
        }
        self.exclusive_union_sites.insert(at.clone());
    }

    fn use_required_override_helper(&mut self, at: &CanonicalPointer) {
        if self.required_override_sites.is_empty() {
            debug!("{at}: needs {}", self.options.config.required_override_helper_name);
        }
        self.required_override_sites.insert(at.clone());
    }

    /// Forget helper uses at or below `at`, whose rendering was replaced.
    fn drop_helper_uses(&mut self, at: &CanonicalPointer) {
        let replaced = |site: &CanonicalPointer| site == at || at.is_ancestor_of(site);
        self.exclusive_union_sites.retain(|site| !replaced(site));
        self.required_override_sites.retain(|site| !replaced(site));
    }
}
