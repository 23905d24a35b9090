//! End-to-end compilation tests.

use modelql_graphql::documents::{FragmentGenerator, SCALARS_ONLY, WHOLE};
use modelql_graphql::schema::{DefinitionKind, FieldDefinition};
use modelql_graphql::{
    CompileError, Compiler, FieldSpec, FragmentSelection, ResourceSchema, ScalarRegistry,
    SchemaNode, TypeDocument,
};
use serde_json::{Value, json};

fn compiler(global: Value) -> Compiler {
    Compiler::new(global, ScalarRegistry::with_defaults()).unwrap()
}

fn user() -> ResourceSchema {
    ResourceSchema::new("User").field("name", FieldSpec::primitive("String"))
}

/// Mutation fields across the base definition and every extension.
fn mutation_fields(document: &TypeDocument) -> Vec<&FieldDefinition> {
    document
        .all_named("Mutation")
        .flat_map(|definition| definition.fields.iter())
        .collect()
}

fn field_names(document: &TypeDocument, type_name: &str) -> Vec<String> {
    document
        .get(type_name)
        .map(|definition| definition.fields.iter().map(|f| f.name.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn single_resource_with_default_options() {
    let compiled = compiler(Value::Null).compile_all(&[user()], None).unwrap();
    let document = &compiled.type_document;

    let query: Vec<_> = document.all_named("Query").collect();
    assert_eq!(query.len(), 1);
    assert!(!query[0].extend);
    assert_eq!(query[0].fields.len(), 27);

    let mutation: Vec<_> = document
        .all_named("Mutation")
        .flat_map(|d| d.fields.iter().map(|f| f.name.as_str()))
        .collect();
    assert_eq!(
        mutation,
        vec!["createUser", "createUsers", "updateUser", "updateUsers", "deleteUser", "deleteUsers"]
    );

    for object in ["SelfUserObject", "OthersUserObject", "MixedUserObject"] {
        assert_eq!(field_names(document, object), vec!["id", "name"]);
        assert_eq!(document.get(object).unwrap().field("id").unwrap().ty, "ID!");
    }
    assert_eq!(field_names(document, "SelfUsersPage"), vec!["docs", "total", "page", "limit"]);
    assert_eq!(field_names(document, "PaginationInput"), vec!["page", "limit", "sort"]);
    assert_eq!(
        document.get("NonNegativeInt").map(|d| d.kind),
        Some(DefinitionKind::Scalar)
    );
    assert!(compiled.sdl.contains("type Query {"));
    assert!(!compiled.sdl.contains("extend type Query"));
    assert!(TypeDocument::from_sdl(&compiled.sdl).is_ok());
}

#[test]
fn later_resources_extend_the_first_root() {
    let post = ResourceSchema::new("Post").field("title", FieldSpec::primitive("String"));
    let compiled = compiler(Value::Null).compile_all(&[user(), post], None).unwrap();
    let query: Vec<_> = compiled
        .type_document
        .all_named("Query")
        .map(|definition| (definition.extend, definition.resource.clone()))
        .collect();
    assert_eq!(
        query,
        vec![(false, Some("User".to_string())), (true, Some("Post".to_string()))]
    );
    assert!(compiled.type_document.get("Mutation").is_some());
    assert!(compiled.type_document.to_ast().is_ok());
}

#[test]
fn nested_object_produces_second_level_types() {
    let schema = user().field(
        "address",
        FieldSpec::object(SchemaNode::new().field("city", FieldSpec::primitive("String"))),
    );
    let compiled = compiler(Value::Null).compile(&schema, None).unwrap();

    for segment in ["Self", "Others", "Mixed"] {
        let nested = format!("{segment}UserAddressObject");
        assert_eq!(compiled.graph.levels[1][&nested].fields.len(), 1);
        let holder = compiled.graph.get(&format!("{segment}UserObject")).unwrap();
        assert_eq!(holder.fields["address"].decorated, nested);
    }
    let union = compiled.type_document.get("UserAddressUnion").unwrap();
    assert_eq!(
        union.members,
        vec!["SelfUserAddressObject", "OthersUserAddressObject", "MixedUserAddressObject"]
    );
}

#[test]
fn disabled_query_config_omits_query_extension() {
    let compiled = compiler(json!({"query": false}))
        .compile_all(&[user()], None)
        .unwrap();
    assert_eq!(compiled.type_document.all_named("Query").count(), 0);
    assert!(compiled.resolver_table.get("User").unwrap().query.is_empty());
    assert_eq!(compiled.type_document.all_named("Mutation").count(), 1);
    assert!(!compiled.sdl.contains("PaginationInput"));
}

#[test]
fn disabling_create_single_removes_field_and_resolver() {
    let compiled = compiler(json!({"mutation": {"create": {"single": false}}}))
        .compile_all(&[user()], None)
        .unwrap();
    let names: Vec<_> = mutation_fields(&compiled.type_document)
        .into_iter()
        .map(|field| field.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["createUsers", "updateUser", "updateUsers", "deleteUser", "deleteUsers"]
    );

    assert!(compiled.resolver_table.mutation("createUser").is_none());
    assert!(compiled.resolver_table.mutation("createUsers").is_some());
    assert!(
        compiled
            .operation_documents
            .iter()
            .all(|document| document.operation != "createUser")
    );
}

#[test]
fn fragments_are_idempotent_and_acyclic() {
    let schema = user()
        .field("friends", FieldSpec::reference("User").list())
        .field(
            "profile",
            FieldSpec::object(
                SchemaNode::new()
                    .field("bio", FieldSpec::primitive("String"))
                    .field("mentor", FieldSpec::reference("User")),
            ),
        );
    let compiled = compiler(Value::Null).compile(&schema, None).unwrap();
    let again = FragmentGenerator::new().generate(&[&compiled.graph]);
    assert_eq!(compiled.fragments, again);

    // Spread targets are defined before their users, so no spread chain loops.
    let definitions = &compiled.fragments.definitions;
    for (index, fragment) in definitions.values().enumerate() {
        for spread in fragment.spreads() {
            let target = definitions.get_index_of(spread).unwrap();
            assert!(target < index, "{} spreads later {spread}", fragment.name);
        }
    }

    let whole = compiled.fragments.get("SelfUserWholeFragment").unwrap();
    assert!(whole.spreads().any(|s| s == "MixedUserRefsNoneFragment"));
    assert!(whole.spreads().any(|s| s == "SelfUserProfileWholeFragment"));
}

#[test]
fn custom_fragment_part_reaches_operation_documents() {
    let schema = user()
        .field(
            "address",
            FieldSpec::object(
                SchemaNode::new()
                    .field("city", FieldSpec::primitive("String"))
                    .field("zip", FieldSpec::primitive("String")),
            ),
        )
        .fragment(
            "Card",
            vec![
                FragmentSelection::field("name"),
                FragmentSelection::nested("address", SCALARS_ONLY),
            ],
        );
    let compiled = compiler(Value::Null).compile(&schema, None).unwrap();
    assert!(compiled.fragments.get("SelfUserCardFragment").is_some());

    let names: Vec<_> = compiled
        .operation_documents
        .iter()
        .filter(|document| document.operation == "getIdSelfUsersWhole")
        .map(|document| document.name.as_str())
        .collect();
    assert!(names.contains(&"getIdSelfUsersWhole_Card"));
    assert!(names.contains(&format!("getIdSelfUsersWhole_{WHOLE}").as_str()));
    for document in &compiled.operation_documents {
        assert!(document.to_ast().is_ok(), "{} does not parse", document.name);
    }
}

#[test]
fn initial_document_fields_are_kept() {
    let initial = TypeDocument::from_sdl(
        "type SelfUserObject { id: ID! name: Int legacy: String }\ntype Query { health: Boolean }",
    )
    .unwrap();
    let compiled = compiler(Value::Null)
        .compile_all(&[user()], Some(&initial))
        .unwrap();
    let document = &compiled.type_document;

    assert_eq!(document.definitions()[0].name, "SelfUserObject");
    assert_eq!(document.get("SelfUserObject").unwrap().field("name").unwrap().ty, "Int");
    assert!(
        document
            .definitions()
            .iter()
            .filter(|d| d.name == "SelfUserObject")
            .all(|d| d.fields.iter().filter(|f| f.name == "name").count() <= 1)
    );
    assert!(document.get("Query").unwrap().field("health").is_some());
}

#[test]
fn renamed_operations_keep_signatures() {
    let schema = user().rename_operation("createUser", "register");
    let compiled = compiler(Value::Null).compile_all(&[schema], None).unwrap();
    let mutation = mutation_fields(&compiled.type_document);
    let register = mutation.iter().find(|field| field.name == "register").unwrap();
    assert_eq!(register.arguments[0].ty, "CreateUserInput!");
    assert!(mutation.iter().all(|field| field.name != "createUser"));
    assert!(compiled.resolver_table.mutation("register").is_some());
}

#[test]
fn unknown_scalar_is_a_synthesis_error() {
    let schema = user().field("slug", FieldSpec::scalar("Slug"));
    let err = compiler(Value::Null).compile_all(&[schema], None).unwrap_err();
    assert!(matches!(err, CompileError::UnknownScalar { .. }));
    assert!(!err.is_configuration_error());
}

#[test]
fn irregular_plurals_name_multi_operations() {
    let compiled = compiler(Value::Null)
        .compile_all(&[ResourceSchema::new("Person").field("name", FieldSpec::primitive("String"))], None)
        .unwrap();
    let names: Vec<_> = mutation_fields(&compiled.type_document)
        .into_iter()
        .map(|field| field.name.clone())
        .collect();
    assert!(names.contains(&"createPeople".to_string()));
    assert!(names.contains(&"deletePeople".to_string()));
    assert!(!names.iter().any(|name| name.contains("Persons")));
    assert!(compiled.sdl.contains("getAllSelfPeopleWhole"));
}
