use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use otg_core::error::{LoadError, ParseError};
use otg_core::parse::{self, pointer::DocumentId};
use otg_core::store::{DocumentLoader, DocumentStore};
use serde_json::Value;

/// Loads documents from disk, relative to the root document's directory.
pub struct FsLoader {
    base_dir: PathBuf,
}

impl FsLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl DocumentLoader for FsLoader {
    fn load(&self, id: &DocumentId) -> Result<Value, LoadError> {
        if id.as_str().contains("://") {
            return Err(LoadError::Io {
                document: id.to_string(),
                reason: "remote documents are not supported".to_string(),
            });
        }
        let path = self.base_dir.join(id.as_str());
        let content = fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => LoadError::NotFound(path.display().to_string()),
            _ => LoadError::Io {
                document: id.to_string(),
                reason: err.to_string(),
            },
        })?;
        parse_by_extension(&path, &content).map_err(|err| LoadError::Parse {
            document: id.to_string(),
            reason: err.to_string(),
        })
    }
}

fn parse_by_extension(path: &Path, content: &str) -> Result<Value, ParseError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse::from_json(content),
        _ => parse::from_yaml(content),
    }
}

/// Read the root document at `path` and wire up a loader for everything it
/// references. The root is identified by its file name.
pub fn open_store(path: &Path) -> Result<DocumentStore> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document = parse_by_extension(path, &content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(DocumentStore::new(DocumentId::new(name), document).with_loader(FsLoader::new(base_dir)))
}
