mod loader;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use otg_core::config::{self, CONFIG_FILE_NAME, OtgConfig};
use otg_core::ir::TypeGraph;
use otg_core::{BuildOptions, CodeGenerator, GeneratedFile, build};
use otg_typescript::TypeScriptGenerator;

#[derive(Parser)]
#[command(name = "otg", about = "OpenAPI to TypeScript type generator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate TypeScript declarations from an OpenAPI document
    Generate {
        /// Path to the OpenAPI document (YAML or JSON)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write output even when some references could not be resolved
        #[arg(long)]
        allow_unresolved: bool,
    },

    /// Resolve every reference in a document and report problems
    Validate {
        /// Path to the OpenAPI document
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Dump the resolved type graph of a document
    Inspect {
        /// Path to the OpenAPI document
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: InspectFormat,
    },

    /// Initialize a new otg configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            output,
            allow_unresolved,
        } => cmd_generate(input, output, allow_unresolved),

        Commands::Validate { input } => cmd_validate(input),

        Commands::Inspect { input, format } => cmd_inspect(input, format),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "otg", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<Option<OtgConfig>> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    config::load_config(&config_path).map_err(|e| anyhow::anyhow!(e))
}

fn build_graph(path: &Path, cfg: &OtgConfig) -> Result<TypeGraph> {
    let mut store = loader::open_store(path)?;
    let options = BuildOptions::new(cfg.graph.clone());
    let graph = build(&mut store, &options)
        .with_context(|| format!("failed to build types for {}", path.display()))?;
    log::debug!(
        "built {} nodes from {} document(s)",
        graph.len(),
        store.len()
    );
    Ok(graph)
}

/// Print every resolution error. Returns how many there were.
fn report_errors(graph: &TypeGraph) -> usize {
    for error in &graph.errors {
        eprintln!("  error: {error}");
    }
    graph.errors.len()
}

/// Write generated files to disk under the given base directory.
fn write_files(base: &Path, files: &[GeneratedFile]) -> Result<()> {
    for file in files {
        let path = base.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, &file.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("  wrote {}", path.display());
    }
    Ok(())
}

fn cmd_generate(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    allow_unresolved: bool,
) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let input = input.unwrap_or_else(|| PathBuf::from(&cfg.input));
    let output_dir = output.unwrap_or_else(|| PathBuf::from(&cfg.output));

    let graph = build_graph(&input, &cfg)?;
    let errors = report_errors(&graph);
    if errors > 0 && !allow_unresolved {
        anyhow::bail!(
            "{errors} reference(s) in {} could not be resolved; pass --allow-unresolved to generate anyway",
            input.display()
        );
    }

    eprintln!("Generating {} → {}", input.display(), output_dir.display());
    let files = TypeScriptGenerator
        .generate(&graph, &cfg.emit)
        .context("failed to render TypeScript")?;
    fs::create_dir_all(&output_dir).with_context(|| {
        format!("failed to create output directory {}", output_dir.display())
    })?;
    write_files(&output_dir, &files)?;

    eprintln!(
        "Generated {} file(s) in {}",
        files.len(),
        output_dir.display()
    );
    Ok(())
}

fn cmd_validate(input: PathBuf) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let graph = build_graph(&input, &cfg)?;

    eprintln!("Resolved {}", input.display());
    for (name, namespace) in graph.namespaces.iter() {
        eprintln!("  {name}: {}", namespace.len());
    }
    eprintln!("  Nodes: {}", graph.len());

    let errors = report_errors(&graph);
    if errors > 0 {
        anyhow::bail!("{errors} reference(s) could not be resolved");
    }
    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_inspect(input: PathBuf, format: InspectFormat) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let graph = build_graph(&input, &cfg)?;

    match format {
        InspectFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&graph)?;
            print!("{}", yaml);
        }
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&graph)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
