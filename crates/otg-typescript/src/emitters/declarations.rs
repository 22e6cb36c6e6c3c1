use minijinja::{AutoEscape, Environment, context};
use otg_core::config::EmitConfig;
use otg_core::ir::{Namespace, NamespaceEntry, TypeGraph};

use crate::generator::TypeScriptError;
use crate::type_mapper::{TsRenderer, entry_key, indent};

/// Emit the declaration file: banner, helpers the graph uses, the raw
/// preamble, then every namespace in order.
pub fn emit_declarations(graph: &TypeGraph, config: &EmitConfig) -> Result<String, TypeScriptError> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_template("types.ts.j2", include_str!("../../templates/types.ts.j2"))?;
    let tmpl = env.get_template("types.ts.j2")?;

    let renderer = TsRenderer::new(graph).with_jsdoc(!config.no_jsdoc);
    let namespaces: Vec<String> = graph
        .namespaces
        .iter()
        .map(|(name, namespace)| emit_namespace(&renderer, name, namespace, config.export_type))
        .collect();

    let helpers = graph.helpers;
    let preamble = graph
        .preamble
        .as_deref()
        .map(|text| text.trim_end_matches('\n'))
        .filter(|text| !text.is_empty());

    Ok(tmpl.render(context! {
        exclusive_union_helper => helpers
            .uses_exclusive_union_helper
            .then(|| graph.helper_names.exclusive_union.clone()),
        required_override_helper => helpers
            .uses_required_override_helper
            .then(|| graph.helper_names.required_override.clone()),
        preamble => preamble,
        namespaces => namespaces,
    })?)
}

fn emit_namespace(
    renderer: &TsRenderer<'_>,
    name: &str,
    namespace: &Namespace,
    export_type: bool,
) -> String {
    if namespace.is_empty() {
        return format!("export type {name} = Record<string, never>;");
    }
    let body = emit_entries(renderer, namespace, 1);
    if export_type {
        format!("export type {name} = {{\n{body}}};")
    } else {
        format!("export interface {name} {{\n{body}}}")
    }
}

/// One `key: type;` line per entry. Empty groups are `never`.
fn emit_entries(renderer: &TsRenderer<'_>, namespace: &Namespace, depth: usize) -> String {
    let pad = indent(depth);
    let mut out = String::new();
    for (key, entry) in namespace.entries() {
        let value = match entry {
            NamespaceEntry::Node(id) => {
                out.push_str(&renderer.jsdoc(*id, depth));
                renderer.render(*id, depth)
            }
            NamespaceEntry::Group(group) if group.is_empty() => "never".to_string(),
            NamespaceEntry::Group(group) => {
                format!("{{\n{}{pad}}}", emit_entries(renderer, group, depth + 1))
            }
        };
        out.push_str(&format!("{pad}{}: {value};\n", entry_key(key)));
    }
    out
}
