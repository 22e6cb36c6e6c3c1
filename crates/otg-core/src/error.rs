use std::error::Error as StdError;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to obtain an external document from a [`DocumentLoader`](crate::store::DocumentLoader).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("failed to read {document}: {reason}")]
    Io { document: String, reason: String },

    #[error("failed to parse {document}: {reason}")]
    Parse { document: String, reason: String },

    #[error("no loader configured for external document {0}")]
    NoLoader(String),
}

/// A reference that could not be turned into a node.
///
/// These never abort a build; they are collected on the resulting graph and
/// the reference site is rendered as an unresolved marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveError {
    #[error("unresolved reference {pointer} (from {origin})")]
    UnresolvedRef { pointer: String, origin: String },

    #[error("invalid reference format {reference:?} (from {origin})")]
    InvalidRefFormat { reference: String, origin: String },

    #[error("failed to load {document} for {pointer} (from {origin}): {reason}")]
    ExternalLoad {
        document: String,
        pointer: String,
        origin: String,
        reason: String,
    },
}

impl ResolveError {
    /// The pointer (or raw reference text) that failed.
    pub fn pointer(&self) -> &str {
        match self {
            Self::UnresolvedRef { pointer, .. } | Self::ExternalLoad { pointer, .. } => pointer,
            Self::InvalidRefFormat { reference, .. } => reference,
        }
    }

    /// The pointer of the fragment that contained the reference.
    pub fn origin(&self) -> &str {
        match self {
            Self::UnresolvedRef { origin, .. }
            | Self::InvalidRefFormat { origin, .. }
            | Self::ExternalLoad { origin, .. } => origin,
        }
    }
}

/// An error raised by a caller-supplied transform hook.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct HookError {
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl HookError {
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync> {
        self.source
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("transform hook failed at {path}")]
    Hook {
        path: String,
        #[source]
        source: HookError,
    },
}
