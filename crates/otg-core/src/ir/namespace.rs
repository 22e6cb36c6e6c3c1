use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use super::node::NodeId;

/// The top-level declarations of a built graph, in rendering order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Namespaces {
    pub paths: Namespace,
    pub webhooks: Namespace,
    pub components: Namespace,
    pub external: Namespace,
    pub operations: Namespace,
}

impl Namespaces {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Namespace)> {
        [
            ("paths", &self.paths),
            ("webhooks", &self.webhooks),
            ("components", &self.components),
            ("external", &self.external),
            ("operations", &self.operations),
        ]
        .into_iter()
    }
}

/// A namespace or group: either explicitly empty or an ordered set of entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Namespace {
    Empty,
    Entries(IndexMap<EntryKey, NamespaceEntry>),
}

impl Namespace {
    pub fn from_entries(entries: IndexMap<EntryKey, NamespaceEntry>) -> Self {
        if entries.is_empty() {
            Self::Empty
        } else {
            Self::Entries(entries)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&EntryKey, &NamespaceEntry)> {
        let map = match self {
            Self::Empty => None,
            Self::Entries(map) => Some(map),
        };
        map.into_iter().flat_map(|m| m.iter())
    }

    /// Look up an entry by its rendered key.
    pub fn get(&self, key: &str) -> Option<&NamespaceEntry> {
        self.entries()
            .find(|(k, _)| k.to_string() == key)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NamespaceEntry {
    Node(NodeId),
    Group(Namespace),
}

impl NamespaceEntry {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            Self::Group(_) => None,
        }
    }

    pub fn group(&self) -> Option<&Namespace> {
        match self {
            Self::Group(ns) => Some(ns),
            Self::Node(_) => None,
        }
    }
}

/// A namespace key: a plain name, or a route template whose `{param}`
/// placeholders render as string patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKey {
    Name(String),
    Template(Vec<TemplatePart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplatePart {
    Text(String),
    Param(String),
}

impl EntryKey {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Split `/user/{user_id}` into text and parameter parts.
    pub fn template(route: &str) -> Self {
        let mut parts = Vec::new();
        let mut rest = route;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            if open > 0 {
                parts.push(TemplatePart::Text(rest[..open].to_string()));
            }
            parts.push(TemplatePart::Param(rest[open + 1..open + close].to_string()));
            rest = &rest[open + close + 1..];
        }
        if !rest.is_empty() {
            parts.push(TemplatePart::Text(rest.to_string()));
        }
        Self::Template(parts)
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template(parts) if parts.iter().any(|p| matches!(p, TemplatePart::Param(_))))
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Template(parts) => {
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => f.write_str(text)?,
                        TemplatePart::Param(param) => write!(f, "{{{param}}}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl Serialize for EntryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
