use otg_core::config::{GraphConfig, PathParameterStyle};
use otg_core::ir::{
    AdditionalShape, NodeId, NodeKind, PathSegment, PrimitiveKind, TypeGraph,
};
use otg_core::parse::from_yaml;
use otg_core::parse::pointer::DocumentId;
use otg_core::store::DocumentStore;
use otg_core::{BuildOptions, build};
use serde_json::json;

fn petstore() -> TypeGraph {
    let doc = from_yaml(include_str!("fixtures/petstore.yaml")).expect("fixture should parse");
    let mut store = DocumentStore::new(DocumentId::new("petstore.yaml"), doc);
    build(&mut store, &BuildOptions::default()).expect("build should succeed")
}

fn property(graph: &TypeGraph, id: NodeId, name: &str) -> NodeId {
    property_entry(graph, id, name).0
}

fn property_entry(graph: &TypeGraph, id: NodeId, name: &str) -> (NodeId, bool) {
    let shape = graph
        .node(id)
        .kind
        .as_object()
        .unwrap_or_else(|| panic!("{id} should be an object, got {:?}", graph.node(id).kind));
    let property = shape
        .properties
        .get(name)
        .unwrap_or_else(|| panic!("{id} should have property {name}"));
    (property.node, property.required)
}

fn keys(graph: &TypeGraph, id: NodeId) -> Vec<String> {
    graph
        .node(id)
        .kind
        .as_object()
        .map(|shape| shape.properties.keys().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn test_document_without_sections_has_empty_namespaces() {
    let mut store = DocumentStore::new(
        DocumentId::new("openapi.yaml"),
        json!({ "openapi": "3.1.0", "info": { "title": "Empty", "version": "1.0" } }),
    );
    let graph = build(&mut store, &BuildOptions::default()).unwrap();

    for (name, namespace) in graph.namespaces.iter() {
        assert!(namespace.is_empty(), "{name} should be empty");
    }
    assert!(graph.is_empty());
    assert!(!graph.has_errors());
}

#[test]
fn test_components_keep_every_group() {
    let graph = petstore();
    let components = &graph.namespaces.components;
    let groups: Vec<String> = components.entries().map(|(key, _)| key.to_string()).collect();
    assert_eq!(
        groups,
        vec![
            "schemas",
            "responses",
            "parameters",
            "requestBodies",
            "headers",
            "pathItems"
        ]
    );
    for empty in ["parameters", "requestBodies", "headers", "pathItems"] {
        let group = components.get(empty).and_then(|e| e.group()).unwrap();
        assert!(group.is_empty(), "{empty} should be an empty group");
    }
    let schemas = components.get("schemas").and_then(|e| e.group()).unwrap();
    assert_eq!(schemas.len(), 3);
}

#[test]
fn test_operations_namespace() {
    let graph = petstore();

    let operations: Vec<String> = graph
        .namespaces
        .operations
        .entries()
        .map(|(key, _)| key.to_string())
        .collect();
    assert_eq!(operations, vec!["listPets", "createPet"]);
    let list_pets = graph
        .namespaces
        .operations
        .get("listPets")
        .and_then(|e| e.node())
        .unwrap();

    let pets = graph.namespaces.paths.get("/pets").and_then(|e| e.node()).unwrap();
    assert_eq!(keys(&graph, pets), vec!["get", "post"]);
    let NodeKind::Reference(get) = &graph.node(property(&graph, pets, "get")).kind else {
        panic!("operations with an id are referenced from their path item");
    };
    assert_eq!(get.target, list_pets);
    assert_eq!(
        get.path,
        vec![
            PathSegment::Key("operations".into()),
            PathSegment::Key("listPets".into()),
        ]
    );

    // `/pets/{petId}` get has no id and stays inline.
    let by_id = graph
        .namespaces
        .paths
        .get("/pets/{petId}")
        .and_then(|e| e.node())
        .unwrap();
    let inline = property(&graph, by_id, "get");
    assert!(graph.node(inline).kind.as_object().is_some());
}

#[test]
fn test_operation_shape() {
    let graph = petstore();
    let list_pets = graph
        .namespaces
        .operations
        .get("listPets")
        .and_then(|e| e.node())
        .unwrap();
    assert_eq!(keys(&graph, list_pets), vec!["parameters", "responses"]);

    let parameters = property(&graph, list_pets, "parameters");
    let (query, query_required) = property_entry(&graph, parameters, "query");
    assert!(!query_required, "no query parameter is required");
    let (limit, limit_required) = property_entry(&graph, query, "limit");
    assert!(!limit_required);
    assert!(matches!(
        &graph.node(limit).kind,
        NodeKind::Primitive { primitive: PrimitiveKind::Integer, format: Some(f) } if f == "int32"
    ));

    let responses = property(&graph, list_pets, "responses");
    let ok = property(&graph, responses, "200");
    assert_eq!(keys(&graph, ok), vec!["headers", "content"]);

    let headers = property(&graph, ok, "headers");
    let (next, next_required) = property_entry(&graph, headers, "x-next");
    assert!(next_required);
    assert_eq!(
        graph.node(next).annotations.description.as_deref(),
        Some("Link to the next page")
    );
    let AdditionalShape::Allowed(any) = graph.node(headers).kind.as_object().unwrap().additional
    else {
        panic!("response headers accept unknown names");
    };
    assert_eq!(graph.node(any).kind, NodeKind::Unknown);

    let content = property(&graph, ok, "content");
    let json = property(&graph, content, "application/json");
    let NodeKind::Array(array) = &graph.node(json).kind else {
        panic!("listPets returns an array");
    };
    assert!(matches!(&graph.node(array.items).kind, NodeKind::Reference(_)));

    let create_pet = graph
        .namespaces
        .operations
        .get("createPet")
        .and_then(|e| e.node())
        .unwrap();
    let (_, body_required) = property_entry(&graph, create_pet, "requestBody");
    assert!(body_required);

    let responses = property(&graph, create_pet, "responses");
    let NodeKind::Reference(default) = &graph.node(property(&graph, responses, "default")).kind
    else {
        panic!("default response is a reference");
    };
    assert_eq!(
        default.path,
        vec![
            PathSegment::Key("components".into()),
            PathSegment::Key("responses".into()),
            PathSegment::Key("Error".into()),
        ]
    );
}

#[test]
fn test_path_parameters_are_required() {
    let graph = petstore();
    let by_id = graph
        .namespaces
        .paths
        .get("/pets/{petId}")
        .and_then(|e| e.node())
        .unwrap();
    assert_eq!(keys(&graph, by_id), vec!["get", "parameters"]);

    // Shared parameters show up both on the path item and its operations.
    for owner in [by_id, property(&graph, by_id, "get")] {
        let parameters = property(&graph, owner, "parameters");
        let (path, path_required) = property_entry(&graph, parameters, "path");
        assert!(path_required);
        let (_, pet_id_required) = property_entry(&graph, path, "petId");
        assert!(pet_id_required, "path parameters are always required");
    }
}

#[test]
fn test_webhooks_namespace() {
    let graph = petstore();
    let new_pet = graph
        .namespaces
        .webhooks
        .get("newPet")
        .and_then(|e| e.node())
        .unwrap();
    let post = property(&graph, new_pet, "post");
    let (_, body_required) = property_entry(&graph, post, "requestBody");
    assert!(!body_required);
}

#[test]
fn test_parameters_merge_in_place() {
    let doc = from_yaml(include_str!("fixtures/parameters.yaml")).unwrap();
    let partial = from_yaml(include_str!("fixtures/_parameters-partial.yaml")).unwrap();
    let mut store = DocumentStore::new(DocumentId::new("parameters.yaml"), doc);
    store.insert(DocumentId::new("_parameters-partial.yaml"), partial);
    let graph = build(&mut store, &BuildOptions::default()).unwrap();
    assert!(graph.errors.is_empty(), "{:?}", graph.errors);

    let endpoint = graph
        .namespaces
        .paths
        .get("/endpoint")
        .and_then(|e| e.node())
        .unwrap();
    let get = property(&graph, endpoint, "get");
    let parameters = property(&graph, get, "parameters");
    let path = property(&graph, parameters, "path");
    assert_eq!(
        keys(&graph, path),
        vec![
            "local_param_a",
            "local_ref_a",
            "remote_ref_a",
            "local_ref_b",
            "remote_ref_b"
        ]
    );

    let overridden = property(&graph, path, "local_param_a");
    assert!(matches!(
        graph.node(overridden).kind,
        NodeKind::Primitive {
            primitive: PrimitiveKind::Number,
            ..
        }
    ));
    assert_eq!(
        graph.node(overridden).annotations.description.as_deref(),
        Some("This overrides parameters")
    );

    let NodeKind::Reference(remote) = &graph.node(property(&graph, path, "remote_ref_a")).kind
    else {
        panic!("remote parameters are references");
    };
    assert_eq!(
        remote.path,
        vec![
            PathSegment::Key("external".into()),
            PathSegment::Key("_parameters-partial.yaml".into()),
            PathSegment::Key("remote_ref_a".into()),
        ]
    );

    let external = graph
        .namespaces
        .external
        .get("_parameters-partial.yaml")
        .and_then(|e| e.group())
        .unwrap();
    let names: Vec<String> = external.entries().map(|(key, _)| key.to_string()).collect();
    assert_eq!(names, vec!["remote_ref_a", "remote_ref_b"]);
}

#[test]
fn test_templated_route_keys() {
    let doc = json!({
        "paths": {
            "/user/{user_id}": {
                "parameters": [{ "name": "user_id", "in": "path" }]
            },
            "/health": {}
        }
    });
    let config = GraphConfig {
        path_parameter_style: PathParameterStyle::TemplatedKeys,
        ..GraphConfig::default()
    };
    let mut store = DocumentStore::new(DocumentId::new("openapi.yaml"), doc);
    let graph = build(&mut store, &BuildOptions::new(config)).unwrap();

    let routes: Vec<(String, bool)> = graph
        .namespaces
        .paths
        .entries()
        .map(|(key, _)| (key.to_string(), key.is_template()))
        .collect();
    assert_eq!(
        routes,
        vec![
            ("/user/{user_id}".to_string(), true),
            ("/health".to_string(), false)
        ]
    );

    let user = graph
        .namespaces
        .paths
        .get("/user/{user_id}")
        .and_then(|e| e.node())
        .unwrap();
    let parameters = property(&graph, user, "parameters");
    let path = property(&graph, parameters, "path");
    let user_id = property(&graph, path, "user_id");
    assert!(
        matches!(
            graph.node(user_id).kind,
            NodeKind::Primitive {
                primitive: PrimitiveKind::String,
                ..
            }
        ),
        "parameters without a schema are strings"
    );
}

#[test]
fn test_literal_route_keys_by_default() {
    let graph = petstore();
    assert!(graph.namespaces.paths.entries().all(|(key, _)| !key.is_template()));
}

#[test]
fn test_preamble_and_helper_names_come_from_config() {
    let config = GraphConfig {
        exclusive_union_helper_name: "Exclusive".to_string(),
        required_override_helper_name: "Require".to_string(),
        raw_preamble: Some("import type { Stamp } from \"./scalars\";".to_string()),
        ..GraphConfig::default()
    };
    let mut store = DocumentStore::new(DocumentId::new("openapi.yaml"), json!({}));
    let graph = build(&mut store, &BuildOptions::new(config)).unwrap();

    assert_eq!(graph.helper_names.exclusive_union, "Exclusive");
    assert_eq!(graph.helper_names.required_override, "Require");
    assert_eq!(
        graph.preamble.as_deref(),
        Some("import type { Stamp } from \"./scalars\";")
    );
}
