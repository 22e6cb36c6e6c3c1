use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::error::LoadError;
use crate::parse::pointer::DocumentId;

/// Fetches external documents on first use.
///
/// Loading is synchronous; callers that fetch asynchronously can preload
/// documents with [`DocumentStore::insert`] before building.
pub trait DocumentLoader {
    fn load(&self, id: &DocumentId) -> Result<Value, LoadError>;
}

/// The root document plus every external document loaded so far.
///
/// Both successful and failed loads are memoized, so each document is loaded
/// at most once per store.
pub struct DocumentStore {
    root: DocumentId,
    documents: IndexMap<DocumentId, Arc<Value>>,
    failures: IndexMap<DocumentId, LoadError>,
    loader: Option<Box<dyn DocumentLoader>>,
}

impl DocumentStore {
    pub fn new(root: DocumentId, document: Value) -> Self {
        let mut documents = IndexMap::new();
        documents.insert(root.clone(), Arc::new(document));
        Self {
            root,
            documents,
            failures: IndexMap::new(),
            loader: None,
        }
    }

    pub fn with_loader(mut self, loader: impl DocumentLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Add (or replace) a document without going through the loader.
    pub fn insert(&mut self, id: DocumentId, document: Value) {
        self.failures.shift_remove(&id);
        self.documents.insert(id, Arc::new(document));
    }

    pub fn root_id(&self) -> &DocumentId {
        &self.root
    }

    pub fn root(&self) -> Arc<Value> {
        // The root is inserted in `new` and never removed.
        self.documents
            .get(&self.root)
            .cloned()
            .unwrap_or_else(|| Arc::new(Value::Null))
    }

    /// A document that is already held, without loading it.
    pub fn get(&self, id: &DocumentId) -> Option<Arc<Value>> {
        self.documents.get(id).cloned()
    }

    pub fn is_loaded(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }

    /// Number of documents currently held.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Get a document, loading it on first access.
    pub fn document(&mut self, id: &DocumentId) -> Result<Arc<Value>, LoadError> {
        if let Some(doc) = self.documents.get(id) {
            return Ok(Arc::clone(doc));
        }
        if let Some(err) = self.failures.get(id) {
            return Err(err.clone());
        }
        let loaded = match &self.loader {
            Some(loader) => {
                debug!("loading external document {id}");
                loader.load(id)
            }
            None => Err(LoadError::NoLoader(id.to_string())),
        };
        match loaded {
            Ok(value) => {
                let doc = Arc::new(value);
                self.documents.insert(id.clone(), Arc::clone(&doc));
                Ok(doc)
            }
            Err(err) => {
                self.failures.insert(id.clone(), err.clone());
                Err(err)
            }
        }
    }
}
