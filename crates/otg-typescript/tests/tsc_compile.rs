use std::fs;
use std::process::Command;

use otg_core::config::{EmitConfig, GraphConfig, PathParameterStyle};
use otg_core::parse::from_yaml;
use otg_core::parse::pointer::DocumentId;
use otg_core::store::DocumentStore;
use otg_core::{BuildOptions, CodeGenerator, build};
use otg_typescript::TypeScriptGenerator;

const PETSTORE: &str = include_str!("../../otg-core/tests/fixtures/petstore.yaml");
const PARAMETERS: &str = include_str!("../../otg-core/tests/fixtures/parameters.yaml");
const PARAMETERS_PARTIAL: &str =
    include_str!("../../otg-core/tests/fixtures/_parameters-partial.yaml");

const TSCONFIG: &str = r#"{
  "compilerOptions": {
    "strict": true,
    "noEmit": true,
    "target": "ES2020",
    "skipLibCheck": true
  },
  "include": ["*.ts"]
}
"#;

fn compile(store: &mut DocumentStore, config: GraphConfig) {
    let graph = build(store, &BuildOptions::new(config)).unwrap();
    assert!(graph.errors.is_empty(), "{:?}", graph.errors);
    let files = TypeScriptGenerator
        .generate(&graph, &EmitConfig::default())
        .unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("tsconfig.json"), TSCONFIG).unwrap();
    for file in &files {
        fs::write(dir.join(&file.path), &file.content).unwrap();
    }

    let tsc = Command::new("npx")
        .args(["--yes", "-p", "typescript", "tsc", "--noEmit", "-p", "."])
        .current_dir(dir)
        .output()
        .expect("failed to run tsc");
    if !tsc.status.success() {
        panic!(
            "tsc failed:\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&tsc.stdout),
            String::from_utf8_lossy(&tsc.stderr),
        );
    }
}

#[test]
#[ignore] // requires node and network access
fn test_petstore_declarations_compile() {
    let doc = from_yaml(PETSTORE).unwrap();
    let mut store = DocumentStore::new(DocumentId::new("petstore.yaml"), doc);
    compile(&mut store, GraphConfig::default());
}

#[test]
#[ignore] // requires node and network access
fn test_parameter_declarations_compile_with_templated_keys() {
    let doc = from_yaml(PARAMETERS).unwrap();
    let partial = from_yaml(PARAMETERS_PARTIAL).unwrap();
    let mut store = DocumentStore::new(DocumentId::new("parameters.yaml"), doc);
    store.insert(DocumentId::new("_parameters-partial.yaml"), partial);
    let config = GraphConfig {
        path_parameter_style: PathParameterStyle::TemplatedKeys,
        ..GraphConfig::default()
    };
    compile(&mut store, config);
}
