use otg_core::config::{EmitConfig, GraphConfig, PathParameterStyle};
use otg_core::error::HookError;
use otg_core::ir::TypeNode;
use otg_core::parse::from_yaml;
use otg_core::parse::pointer::DocumentId;
use otg_core::store::DocumentStore;
use otg_core::transform::{NodeContext, TransformHooks};
use otg_core::{BuildOptions, CodeGenerator, build};
use otg_typescript::TypeScriptGenerator;
use otg_typescript::emitters::declarations::emit_declarations;
use serde_json::{Value, json};

const BOILERPLATE: &str = "/**
 * This file was auto-generated by otg.
 * Do not make direct changes to the file.
 */

";

const ONE_OF_TYPE_HELPERS: &str = "
/** OneOf type helpers */
type Without<T, U> = { [P in Exclude<keyof T, keyof U>]?: never };
type XOR<T, U> = (T | U) extends object ? (Without<T, U> & U) | (Without<U, T> & T) : T | U;
type OneOf<T extends any[]> = T extends [infer Only] ? Only : T extends [infer A, infer B, ...infer Rest] ? OneOf<[XOR<A, B>, ...Rest]> : never;
";

const WITH_REQUIRED_TYPE_HELPERS: &str = "
/** WithRequired type helpers */
type WithRequired<T, K extends keyof T> = T & { [P in K]-?: T[P] };
";

const PARAMETERS: &str = include_str!("../../otg-core/tests/fixtures/parameters.yaml");
const PARAMETERS_PARTIAL: &str =
    include_str!("../../otg-core/tests/fixtures/_parameters-partial.yaml");

fn expected(helpers: &str, body: &str) -> String {
    format!("{BOILERPLATE}{helpers}\n{body}")
}

fn generate_with(doc: Value, graph: GraphConfig, emit: &EmitConfig, hooks: Option<&dyn TransformHooks>) -> String {
    let mut store = DocumentStore::new(DocumentId::new("openapi.yaml"), doc);
    let mut options = BuildOptions::new(graph);
    if let Some(hooks) = hooks {
        options = options.with_hooks(hooks);
    }
    let graph = build(&mut store, &options).unwrap();
    assert!(graph.errors.is_empty(), "{:?}", graph.errors);
    emit_declarations(&graph, emit).unwrap()
}

fn generate(doc: Value) -> String {
    generate_with(doc, GraphConfig::default(), &EmitConfig::default(), None)
}

#[test]
fn test_empty_document() {
    let generated = generate(json!({
        "openapi": "3.1",
        "info": { "title": "Test", "version": "1.0" }
    }));
    assert_eq!(
        generated,
        expected(
            "",
            r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export type components = Record<string, never>;

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );
}

#[test]
fn test_additional_properties_and_single_member_union() {
    let generated = generate(json!({
        "openapi": "3.0",
        "info": { "title": "Test", "version": "1.0" },
        "components": {
            "schemas": {
                "Base": {
                    "type": "object",
                    "additionalProperties": { "type": "string" }
                },
                "SchemaType": {
                    "oneOf": [{ "$ref": "#/components/schemas/Base" }]
                }
            }
        }
    }));
    assert_eq!(
        generated,
        expected(
            "",
            r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export interface components {
  schemas: {
    Base: {
      [key: string]: string | undefined;
    };
    SchemaType: components["schemas"]["Base"];
  };
  responses: never;
  parameters: never;
  requestBodies: never;
  headers: never;
  pathItems: never;
}

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );
}

#[test]
fn test_unusual_property_names() {
    let generated = generate(json!({
        "components": {
            "schemas": {
                "Example": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "$ref": { "type": "string" },
                        "content-type": { "type": "string" }
                    },
                    "required": ["name", "$ref"]
                }
            },
            "examples": {
                "Example": { "value": { "$ref": "fake.yml#/components/schemas/Example" } }
            }
        }
    }));
    assert!(generated.contains(
        r#"    Example: {
      name: string;
      $ref: string;
      "content-type"?: string;
    };
"#
    ));
}

#[test]
fn test_discriminator_all_of() {
    let generated = generate(json!({
        "openapi": "3.1",
        "info": { "title": "test", "version": "1.0" },
        "components": {
            "schemas": {
                "Pet": {
                    "type": "object",
                    "required": ["petType"],
                    "properties": { "petType": { "type": "string" } },
                    "discriminator": {
                        "propertyName": "petType",
                        "mapping": { "dog": "Dog" }
                    }
                },
                "Cat": {
                    "allOf": [
                        { "$ref": "#/components/schemas/Pet" },
                        { "type": "object", "properties": { "name": { "type": "string" } } }
                    ]
                },
                "Dog": {
                    "allOf": [
                        { "$ref": "#/components/schemas/Pet" },
                        { "type": "object", "properties": { "bark": { "type": "string" } } }
                    ]
                },
                "Lizard": {
                    "allOf": [
                        { "$ref": "#/components/schemas/Pet" },
                        { "type": "object", "properties": { "lovesRocks": { "type": "boolean" } } }
                    ]
                }
            }
        }
    }));
    assert_eq!(
        generated,
        expected(
            "",
            r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export interface components {
  schemas: {
    Pet: {
      petType: string;
    };
    Cat: {
      petType: "Cat";
    } & Omit<components["schemas"]["Pet"], "petType"> & {
      name?: string;
    };
    Dog: {
      petType: "dog";
    } & Omit<components["schemas"]["Pet"], "petType"> & {
      bark?: string;
    };
    Lizard: {
      petType: "Lizard";
    } & Omit<components["schemas"]["Pet"], "petType"> & {
      lovesRocks?: boolean;
    };
  };
  responses: never;
  parameters: never;
  requestBodies: never;
  headers: never;
  pathItems: never;
}

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );
}

#[test]
fn test_discriminator_one_of() {
    let member = |extra: &str, tag: &str, extra_type: &str| {
        json!({
            "type": "object",
            "properties": {
                extra: { "type": extra_type },
                "petType": { "type": "string", "enum": [tag] }
            },
            "required": ["petType"]
        })
    };
    let generated = generate(json!({
        "openapi": "3.1",
        "info": { "title": "test", "version": "1.0" },
        "components": {
            "schemas": {
                "Pet": {
                    "oneOf": [
                        { "$ref": "#/components/schemas/Cat" },
                        { "$ref": "#/components/schemas/Dog" },
                        { "$ref": "#/components/schemas/Lizard" }
                    ],
                    "discriminator": {
                        "propertyName": "petType",
                        "mapping": {
                            "cat": "#/components/schemas/Cat",
                            "dog": "#/components/schemas/Dog",
                            "lizard": "#/components/schemas/Lizard"
                        }
                    }
                },
                "Cat": member("name", "cat", "string"),
                "Dog": member("bark", "dog", "string"),
                "Lizard": member("lovesRocks", "lizard", "boolean")
            }
        }
    }));
    assert_eq!(
        generated,
        expected(
            "",
            r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export interface components {
  schemas: {
    Pet: {
      petType: "cat";
    } & Omit<components["schemas"]["Cat"], "petType"> | {
      petType: "dog";
    } & Omit<components["schemas"]["Dog"], "petType"> | {
      petType: "lizard";
    } & Omit<components["schemas"]["Lizard"], "petType">;
    Cat: {
      name?: string;
      /** @enum {string} */
      petType: "cat";
    };
    Dog: {
      bark?: string;
      /** @enum {string} */
      petType: "dog";
    };
    Lizard: {
      lovesRocks?: boolean;
      /** @enum {string} */
      petType: "lizard";
    };
  };
  responses: never;
  parameters: never;
  requestBodies: never;
  headers: never;
  pathItems: never;
}

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );
}

#[test]
fn test_ref_properties() {
    let generated = generate(json!({
        "openapi": "3.1",
        "info": { "title": "Test", "version": "1.0" },
        "components": {
            "schemas": {
                "ObjRef": {
                    "type": "object",
                    "properties": {
                        "base": { "$ref": "#/components/schemas/Entity/properties/foo" }
                    }
                },
                "AllOf": {
                    "allOf": [
                        { "$ref": "#/components/schemas/Entity/properties/foo" },
                        { "$ref": "#/components/schemas/Thingy/properties/bar" }
                    ]
                },
                "Entity": {
                    "type": "object",
                    "properties": { "foo": { "type": "string" } }
                },
                "Thingy": {
                    "type": "object",
                    "properties": { "bar": { "type": "integer" } }
                }
            }
        }
    }));
    assert_eq!(
        generated,
        expected(
            "",
            r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export interface components {
  schemas: {
    ObjRef: {
      base?: components["schemas"]["Entity"]["foo"];
    };
    AllOf: components["schemas"]["Entity"]["foo"] & components["schemas"]["Thingy"]["bar"];
    Entity: {
      foo?: string;
    };
    Thingy: {
      bar?: number;
    };
  };
  responses: never;
  parameters: never;
  requestBodies: never;
  headers: never;
  pathItems: never;
}

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );
}

fn user_document() -> Value {
    json!({
        "openapi": "3.1",
        "info": { "title": "Test", "version": "1.0" },
        "components": {
            "schemas": {
                "User": {
                    "type": "object",
                    "properties": { "name": { "type": "string" }, "email": { "type": "string" } },
                    "required": ["name", "email"]
                }
            }
        }
    })
}

#[test]
fn test_namespaces_as_interfaces() {
    let generated = generate(user_document());
    assert_eq!(
        generated,
        expected(
            "",
            r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export interface components {
  schemas: {
    User: {
      name: string;
      email: string;
    };
  };
  responses: never;
  parameters: never;
  requestBodies: never;
  headers: never;
  pathItems: never;
}

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );
}

#[test]
fn test_namespaces_as_type_aliases() {
    let emit = EmitConfig {
        export_type: true,
        ..EmitConfig::default()
    };
    let generated = generate_with(user_document(), GraphConfig::default(), &emit, None);
    assert_eq!(
        generated,
        expected(
            "",
            r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export type components = {
  schemas: {
    User: {
      name: string;
      email: string;
    };
  };
  responses: never;
  parameters: never;
  requestBodies: never;
  headers: never;
  pathItems: never;
};

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );
}

fn user_route_document() -> Value {
    json!({
        "openapi": "3.1",
        "info": { "title": "Test", "version": "1.0" },
        "paths": {
            "/user/{user_id}": {
                "parameters": [{ "name": "user_id", "in": "path" }]
            }
        }
    })
}

#[test]
fn test_literal_route_keys() {
    let generated = generate(user_route_document());
    assert_eq!(
        generated,
        expected(
            "",
            r#"export interface paths {
  "/user/{user_id}": {
    parameters: {
      path: {
        user_id: string;
      };
    };
  };
}

export type webhooks = Record<string, never>;

export type components = Record<string, never>;

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );
}

#[test]
fn test_templated_route_keys() {
    let config = GraphConfig {
        path_parameter_style: PathParameterStyle::TemplatedKeys,
        ..GraphConfig::default()
    };
    let generated = generate_with(user_route_document(), config, &EmitConfig::default(), None);
    assert_eq!(
        generated,
        expected(
            "",
            r#"export interface paths {
  [path: `/user/${string}`]: {
    parameters: {
      path: {
        user_id: string;
      };
    };
  };
}

export type webhooks = Record<string, never>;

export type components = Record<string, never>;

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );
}

fn date_document() -> Value {
    json!({
        "openapi": "3.1",
        "info": { "title": "Test", "version": "1.0" },
        "components": {
            "schemas": {
                "Date": { "type": "string", "format": "date-time" }
            }
        }
    })
}

const DATE_BODY: &str = r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export interface components {
  schemas: {
    /** Format: date-time */
    Date: DATE_TYPE;
  };
  responses: never;
  parameters: never;
  requestBodies: never;
  headers: never;
  pathItems: never;
}

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#;

struct DateHooks;

impl TransformHooks for DateHooks {
    fn pre_transform(&self, fragment: &Value, _ctx: &NodeContext) -> Result<Option<String>, HookError> {
        let is_date = fragment.get("format").and_then(Value::as_str) == Some("date-time");
        Ok(is_date.then(|| "Date".to_string()))
    }
}

struct DateOrTimeHooks;

impl TransformHooks for DateOrTimeHooks {
    fn post_transform(&self, _node: &TypeNode, ctx: &NodeContext) -> Result<Option<String>, HookError> {
        Ok(ctx.path.contains("Date").then(|| "DateOrTime".to_string()))
    }
}

#[test]
fn test_pre_transform_hook() {
    let generated = generate_with(
        date_document(),
        GraphConfig::default(),
        &EmitConfig::default(),
        Some(&DateHooks),
    );
    assert_eq!(generated, expected("", &DATE_BODY.replace("DATE_TYPE", "Date")));
}

#[test]
fn test_post_transform_hook_with_preamble() {
    let inject = "type DateOrTime = Date | number;\n";
    let config = GraphConfig {
        raw_preamble: Some(inject.to_string()),
        ..GraphConfig::default()
    };
    let generated = generate_with(
        date_document(),
        config,
        &EmitConfig::default(),
        Some(&DateOrTimeHooks),
    );
    assert_eq!(
        generated,
        expected(
            &format!("\n{inject}"),
            &DATE_BODY.replace("DATE_TYPE", "DateOrTime")
        )
    );
}

#[test]
fn test_no_jsdoc() {
    let emit = EmitConfig {
        no_jsdoc: true,
        ..EmitConfig::default()
    };
    let generated = generate_with(date_document(), GraphConfig::default(), &emit, None);
    assert!(generated.contains("  schemas: {\n    Date: string;\n  };\n"));
    assert!(!generated.contains("Format: date-time"));
}

#[test]
fn test_exclusive_union_helper_only_when_used() {
    let generated = generate(json!({
        "openapi": "3.1",
        "info": { "title": "Test", "version": "1.0" },
        "components": {
            "schemas": {
                "User": {
                    "oneOf": [
                        { "type": "object", "properties": { "firstName": { "type": "string" } } },
                        { "type": "object", "properties": { "name": { "type": "string" } } }
                    ]
                }
            }
        }
    }));
    assert_eq!(
        generated,
        expected(
            ONE_OF_TYPE_HELPERS,
            r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export interface components {
  schemas: {
    User: OneOf<[{
      firstName?: string;
    }, {
      name?: string;
    }]>;
  };
  responses: never;
  parameters: never;
  requestBodies: never;
  headers: never;
  pathItems: never;
}

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );

    // A oneOf of scalars is a plain union.
    let scalars = generate(json!({
        "components": {
            "schemas": {
                "Id": { "oneOf": [{ "type": "string" }, { "type": "integer" }] }
            }
        }
    }));
    assert!(!scalars.contains("OneOf"));
    assert!(scalars.contains("    Id: string | number;\n"));
}

#[test]
fn test_required_override_helper_only_when_used() {
    let generated = generate(json!({
        "openapi": "3.1",
        "info": { "title": "Test", "version": "1.0" },
        "components": {
            "schemas": {
                "User": {
                    "allOf": [
                        {
                            "type": "object",
                            "properties": { "firstName": { "type": "string" }, "lastName": { "type": "string" } }
                        },
                        {
                            "type": "object",
                            "properties": { "middleName": { "type": "string" } }
                        }
                    ],
                    "required": ["firstName", "lastName"]
                }
            }
        }
    }));
    assert_eq!(
        generated,
        expected(
            WITH_REQUIRED_TYPE_HELPERS,
            r#"export type paths = Record<string, never>;

export type webhooks = Record<string, never>;

export interface components {
  schemas: {
    User: {
      firstName: string;
      lastName: string;
      middleName?: string;
    };
  };
  responses: never;
  parameters: never;
  requestBodies: never;
  headers: never;
  pathItems: never;
}

export type external = Record<string, never>;

export type operations = Record<string, never>;
"#
        )
    );

    let plain = generate(user_document());
    assert!(!plain.contains("WithRequired"));
}

#[test]
fn test_required_override_on_reference() {
    let generated = generate(json!({
        "components": {
            "schemas": {
                "Base": { "type": "object", "properties": { "id": { "type": "string" } } },
                "Strict": { "$ref": "#/components/schemas/Base", "required": ["id"] }
            }
        }
    }));
    assert!(generated.starts_with(&format!("{BOILERPLATE}{WITH_REQUIRED_TYPE_HELPERS}\n")));
    assert!(generated.contains(
        "    Strict: WithRequired<components[\"schemas\"][\"Base\"], \"id\">;\n"
    ));
}

#[test]
fn test_custom_helper_names() {
    let config = GraphConfig {
        exclusive_union_helper_name: "Exclusive".to_string(),
        ..GraphConfig::default()
    };
    let generated = generate_with(
        json!({
            "components": {
                "schemas": {
                    "Shape": {
                        "oneOf": [
                            { "type": "object", "properties": { "radius": { "type": "number" } } },
                            { "type": "object", "properties": { "side": { "type": "number" } } }
                        ]
                    }
                }
            }
        }),
        config,
        &EmitConfig::default(),
        None,
    );
    assert!(generated.contains("/** Exclusive type helpers */\n"));
    assert!(generated.contains(
        "type Exclusive<T extends any[]> = T extends [infer Only] ? Only : T extends [infer A, infer B, ...infer Rest] ? Exclusive<[XOR<A, B>, ...Rest]> : never;\n"
    ));
    assert!(generated.contains("    Shape: Exclusive<[{\n"));
    assert!(!generated.contains("OneOf"));
}

#[test]
fn test_parameter_refs() {
    let doc = from_yaml(PARAMETERS).unwrap();
    let partial = from_yaml(PARAMETERS_PARTIAL).unwrap();
    let mut store = DocumentStore::new(DocumentId::new("parameters.yaml"), doc);
    store.insert(DocumentId::new("_parameters-partial.yaml"), partial);
    let graph = build(&mut store, &BuildOptions::default()).unwrap();
    let generated = emit_declarations(&graph, &EmitConfig::default()).unwrap();

    assert_eq!(
        generated,
        expected(
            "",
            r#"export interface paths {
  "/endpoint": {
    get: {
      parameters: {
        path: {
          /** @description This overrides parameters */
          local_param_a: number;
          local_ref_a: components["parameters"]["local_ref_a"];
          remote_ref_a: external["_parameters-partial.yaml"]["remote_ref_a"];
          local_ref_b: components["parameters"]["local_ref_b"];
          remote_ref_b: external["_parameters-partial.yaml"]["remote_ref_b"];
        };
      };
      responses: {
        /** @description OK */
        200: {
          headers: {
            [key: string]: unknown;
          };
        };
      };
    };
    parameters: {
      path: {
        local_param_a: string;
        local_ref_a: components["parameters"]["local_ref_a"];
        remote_ref_a: external["_parameters-partial.yaml"]["remote_ref_a"];
      };
    };
  };
}

export type webhooks = Record<string, never>;

export interface components {
  schemas: never;
  responses: never;
  parameters: {
    local_ref_a: string;
    local_ref_b: string;
  };
  requestBodies: never;
  headers: never;
  pathItems: never;
}

export interface external {
  "_parameters-partial.yaml": {
    remote_ref_a: string;
    remote_ref_b: string;
  };
}

export type operations = Record<string, never>;
"#
        )
    );
}

#[test]
fn test_generator_names_the_file() {
    let doc = from_yaml(include_str!("../../otg-core/tests/fixtures/petstore.yaml")).unwrap();
    let mut store = DocumentStore::new(DocumentId::new("petstore.yaml"), doc);
    let graph = build(&mut store, &BuildOptions::default()).unwrap();

    let emit = EmitConfig {
        file_name: "petstore.d.ts".to_string(),
        ..EmitConfig::default()
    };
    let files = TypeScriptGenerator.generate(&graph, &emit).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "petstore.d.ts");
    assert!(files[0].content.starts_with(BOILERPLATE));
    assert!(files[0].content.contains("export interface operations {\n  listPets: {\n"));
    assert!(files[0].content.contains("    get: operations[\"listPets\"];\n"));
}
