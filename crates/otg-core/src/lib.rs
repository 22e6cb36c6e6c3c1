pub mod config;
pub mod error;
pub mod ir;
pub mod parse;
pub mod store;
pub mod transform;

pub use transform::{BuildOptions, build};

/// A generated file with path and content.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// Trait for renderers that produce files from a type graph.
pub trait CodeGenerator {
    type Config;
    type Error: std::error::Error;
    fn generate(
        &self,
        graph: &ir::TypeGraph,
        config: &Self::Config,
    ) -> Result<Vec<GeneratedFile>, Self::Error>;
}
