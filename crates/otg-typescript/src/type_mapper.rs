use otg_core::ir::{
    AdditionalShape, ArrayShape, EntryKey, IntersectionMember, Literal, NodeId, NodeKind,
    ObjectShape, PathSegment, PrimitiveKind, TemplatePart, TypeGraph, TypeNode, UnionShape,
};
use serde_json::Value;

/// Fixed-length arrays longer than this render as plain arrays.
const MAX_TUPLE_LENGTH: usize = 16;

/// Two spaces per nesting level.
pub fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Renders graph nodes as TypeScript type expressions.
///
/// `depth` is the nesting level of the line a type starts on; multi-line
/// object bodies are indented one level deeper and closed at `depth`.
pub struct TsRenderer<'a> {
    graph: &'a TypeGraph,
    jsdoc: bool,
}

impl<'a> TsRenderer<'a> {
    pub fn new(graph: &'a TypeGraph) -> Self {
        Self { graph, jsdoc: true }
    }

    pub fn with_jsdoc(mut self, jsdoc: bool) -> Self {
        self.jsdoc = jsdoc;
        self
    }

    pub fn render(&self, id: NodeId, depth: usize) -> String {
        let node = self.graph.node(id);
        if let Some(text) = &node.rendered_override {
            return text.clone();
        }
        match &node.kind {
            NodeKind::Primitive { primitive, .. } => primitive_ts(*primitive).to_string(),
            NodeKind::Literal { value } => literal_ts(value),
            NodeKind::Enum { values } => values
                .iter()
                .map(literal_ts)
                .collect::<Vec<_>>()
                .join(" | "),
            NodeKind::Object(shape) => self.object(shape, depth),
            NodeKind::Array(array) => self.array(array, depth),
            NodeKind::Union(union) => self.union(union, depth),
            NodeKind::Intersection { members } => self.intersection(members, depth),
            NodeKind::Reference(reference) => lookup(&reference.path),
            NodeKind::RequiredOverride { base, keys } => format!(
                "{}<{}, {}>",
                self.graph.helper_names.required_override,
                self.render(*base, depth),
                key_union(keys)
            ),
            NodeKind::Expression { source } => source.clone(),
            NodeKind::Unresolved { .. } | NodeKind::Unknown => "unknown".to_string(),
        }
    }

    /// The JSDoc block for a declaration of `id`, including the trailing
    /// newline. Empty when the node has nothing to document.
    pub fn jsdoc(&self, id: NodeId, depth: usize) -> String {
        if !self.jsdoc {
            return String::new();
        }
        comment(&doc_lines(self.graph.node(id)), &indent(depth))
    }

    fn object(&self, shape: &ObjectShape, depth: usize) -> String {
        if shape.is_empty() {
            return "Record<string, never>".to_string();
        }
        let pad = indent(depth + 1);
        let mut out = String::from("{\n");
        for (name, property) in &shape.properties {
            out.push_str(&self.jsdoc(property.node, depth + 1));
            let optional = if property.required { "" } else { "?" };
            out.push_str(&format!(
                "{pad}{}{optional}: {};\n",
                property_key(name),
                self.render(property.node, depth + 1)
            ));
        }
        if let AdditionalShape::Allowed(value) = shape.additional {
            out.push_str(&format!(
                "{pad}[key: string]: {};\n",
                self.index_value(value, depth + 1)
            ));
        }
        out.push_str(&indent(depth));
        out.push('}');
        out
    }

    fn index_value(&self, id: NodeId, depth: usize) -> String {
        let node = self.graph.node(id);
        let rendered = self.render(id, depth);
        if node.rendered_override.is_none() && node.kind == NodeKind::Unknown {
            rendered
        } else {
            format!("{rendered} | undefined")
        }
    }

    fn array(&self, array: &ArrayShape, depth: usize) -> String {
        let item = self.render(array.items, depth);
        match array.length {
            Some(length) if length <= MAX_TUPLE_LENGTH => {
                format!("[{}]", vec![item; length].join(", "))
            }
            _ if self.needs_parens(array.items, true) => format!("({item})[]"),
            _ => format!("{item}[]"),
        }
    }

    fn union(&self, union: &UnionShape, depth: usize) -> String {
        let members: Vec<String> = union
            .members
            .iter()
            .map(|member| self.render(*member, depth))
            .collect();
        if self.graph.union_needs_helper(union) {
            format!(
                "{}<[{}]>",
                self.graph.helper_names.exclusive_union,
                members.join(", ")
            )
        } else {
            members.join(" | ")
        }
    }

    fn intersection(&self, members: &[IntersectionMember], depth: usize) -> String {
        members
            .iter()
            .map(|member| {
                let rendered = self.render(member.node, depth);
                if !member.omit.is_empty() {
                    format!("Omit<{rendered}, {}>", key_union(&member.omit))
                } else if members.len() > 1 && self.needs_parens(member.node, false) {
                    format!("({rendered})")
                } else {
                    rendered
                }
            })
            .collect::<Vec<_>>()
            .join(" & ")
    }

    /// Whether the rendered form of `id` has a top-level `|` (or `&` inside
    /// an array element) that would bind wrongly without parentheses.
    fn needs_parens(&self, id: NodeId, in_array: bool) -> bool {
        let node = self.graph.node(id);
        let verbatim = match (&node.rendered_override, &node.kind) {
            (Some(text), _) => Some(text),
            (None, NodeKind::Expression { source }) => Some(source),
            _ => None,
        };
        if let Some(text) = verbatim {
            return text.contains('|') || (in_array && text.contains('&'));
        }
        match &node.kind {
            NodeKind::Union(union) => !self.graph.union_needs_helper(union),
            NodeKind::Enum { .. } => true,
            NodeKind::Intersection { members } => in_array && members.len() > 1,
            _ => false,
        }
    }
}

fn primitive_ts(primitive: PrimitiveKind) -> &'static str {
    match primitive {
        PrimitiveKind::String => "string",
        PrimitiveKind::Number | PrimitiveKind::Integer => "number",
        PrimitiveKind::Boolean => "boolean",
        PrimitiveKind::Null => "null",
    }
}

fn literal_ts(literal: &Literal) -> String {
    match literal {
        Literal::String(value) => string_literal(value),
        Literal::Number(value) => value.to_string(),
        Literal::Bool(value) => value.to_string(),
        Literal::Null => "null".to_string(),
    }
}

/// A double-quoted, JSON-escaped string literal.
pub fn string_literal(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn key_union(keys: &[String]) -> String {
    keys.iter()
        .map(|key| string_literal(key))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Property names that are valid identifiers (or plain integers) stay bare.
pub fn property_key(name: &str) -> String {
    let mut chars = name.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    let integer = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_digit())
        && (name.len() == 1 || !name.starts_with('0'));
    if identifier || integer {
        name.to_string()
    } else {
        string_literal(name)
    }
}

/// Namespace keys: route templates become template-literal index signatures.
pub fn entry_key(key: &EntryKey) -> String {
    match key {
        EntryKey::Template(parts) if key.is_template() => {
            let mut pattern = String::new();
            for part in parts {
                match part {
                    TemplatePart::Text(text) => pattern.push_str(&text.replace('`', "\\`")),
                    TemplatePart::Param(_) => pattern.push_str("${string}"),
                }
            }
            format!("[path: `{pattern}`]")
        }
        _ => property_key(&key.to_string()),
    }
}

/// `components["schemas"]["Pet"]`, with `[number]` for array elements and
/// `[string]` for index-signature values.
pub fn lookup(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for (index, segment) in path.iter().enumerate() {
        match segment {
            PathSegment::Key(key) if index == 0 => out.push_str(key),
            PathSegment::Key(key) => {
                out.push('[');
                out.push_str(&string_literal(key));
                out.push(']');
            }
            PathSegment::Index => out.push_str("[number]"),
            PathSegment::AnyKey => out.push_str("[string]"),
        }
    }
    out
}

fn doc_lines(node: &TypeNode) -> Vec<String> {
    let annotations = &node.annotations;
    let mut lines = Vec::new();
    if let Some(title) = &annotations.title {
        lines.extend(title.lines().map(str::to_string));
    }
    if let Some(format) = &annotations.format {
        lines.push(format!("Format: {format}"));
    }
    if annotations.deprecated {
        lines.push("@deprecated".to_string());
    }
    if let Some(description) = &annotations.description {
        tagged(&mut lines, "@description", description);
    }
    if let Some(default) = &annotations.default {
        tagged(&mut lines, "@default", &value_text(default));
    }
    if let Some(example) = &annotations.example {
        tagged(&mut lines, "@example", &value_text(example));
    }
    if let Some(kind) = enum_type(node) {
        lines.push(format!("@enum {{{kind}}}"));
    }
    lines
        .into_iter()
        .map(|line| line.replace("*/", "*\\/"))
        .collect()
}

fn tagged(lines: &mut Vec<String>, tag: &str, text: &str) {
    let mut text_lines = text.trim_end().lines();
    let first = text_lines.next().unwrap_or_default();
    lines.push(format!("{tag} {first}"));
    lines.extend(text_lines.map(str::to_string));
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Enumerations declared in the document (not synthesized tags) get an
/// `@enum` tag naming their value type.
fn enum_type(node: &TypeNode) -> Option<&'static str> {
    node.origin.as_ref()?;
    let values: Vec<&Literal> = match &node.kind {
        NodeKind::Enum { values } => values.iter().collect(),
        NodeKind::Literal { value } => vec![value],
        _ => return None,
    };
    if values.iter().all(|v| matches!(v, Literal::String(_))) {
        Some("string")
    } else if values.iter().all(|v| matches!(v, Literal::Number(_))) {
        Some("number")
    } else {
        None
    }
}

fn comment(lines: &[String], pad: &str) -> String {
    match lines {
        [] => String::new(),
        [line] => format!("{pad}/** {line} */\n"),
        lines => {
            let mut out = format!("{pad}/**\n");
            for line in lines {
                if line.is_empty() {
                    out.push_str(&format!("{pad} *\n"));
                } else {
                    out.push_str(&format!("{pad} * {line}\n"));
                }
            }
            out.push_str(&format!("{pad} */\n"));
            out
        }
    }
}
