use otg_core::config::EmitConfig;
use otg_core::ir::TypeGraph;
use otg_core::{CodeGenerator, GeneratedFile};
use thiserror::Error;

use crate::emitters;

#[derive(Debug, Error)]
pub enum TypeScriptError {
    #[error("template render failed: {0}")]
    Render(#[from] minijinja::Error),
}

/// Renders a type graph as a single TypeScript declaration file.
pub struct TypeScriptGenerator;

impl CodeGenerator for TypeScriptGenerator {
    type Config = EmitConfig;
    type Error = TypeScriptError;

    fn generate(
        &self,
        graph: &TypeGraph,
        config: &Self::Config,
    ) -> Result<Vec<GeneratedFile>, Self::Error> {
        let content = emitters::declarations::emit_declarations(graph, config)?;
        log::debug!(
            "rendered {} ({} nodes, {} bytes)",
            config.file_name,
            graph.len(),
            content.len()
        );
        Ok(vec![GeneratedFile {
            path: config.file_name.clone(),
            content,
        }])
    }
}
