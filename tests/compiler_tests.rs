//! Type Compiler Tests
//!
//! Compiles declared property types into fragments and checks both their
//! exact shape and that a standard validator accepts them.

use std::rc::Rc;

use jsonschema::JSONSchema;
use resource_schema::{
    add_nullability, BuildRequest, ClassSchemaBuilder, MetadataRegistry, PropertyType,
    SchemaBuilder, SchemaDocument, SchemaError, SchemaVersion, SerializationContext,
    StaticResourceClasses, TypeSchemaCompiler,
};
use rstest::rstest;
use serde_json::{json, Value};

fn compiler() -> TypeSchemaCompiler {
    let resolver = StaticResourceClasses::new(["App\\Entity\\Author"])
        .with_parents("App\\Clock\\Moment", ["DateTimeInterface"])
        .with_parents("App\\Id\\BookId", ["Ramsey\\Uuid\\UuidInterface"]);
    TypeSchemaCompiler::new(Rc::new(resolver))
}

fn compile(ty: &PropertyType, document: Option<&SchemaDocument>) -> resource_schema::Result<Value> {
    compiler()
        .compile(ty, "json", None, None, document)
        .map(Value::Object)
}

// =============================================================================
// Literal Scenarios
// =============================================================================

#[rstest]
#[case::integer(PropertyType::int(), json!({"type": "integer"}))]
#[case::nullable_float(PropertyType::float().nullable(true), json!({"type": ["number", "null"]}))]
#[case::boolean_list(
    PropertyType::bool().as_collection(),
    json!({"type": "array", "items": {"type": "boolean"}})
)]
#[case::string_map(
    PropertyType::map_of(PropertyType::string()),
    json!({"type": "object", "additionalProperties": {"type": "string"}})
)]
#[case::date_time_marker(
    PropertyType::object(Some("App\\Clock\\Moment")),
    json!({"type": "string", "format": "date-time"})
)]
#[case::class_without_document(PropertyType::object(Some("App\\Model\\Address")), json!({"type": "object"}))]
fn test_literal_scenarios(#[case] ty: PropertyType, #[case] expected: Value) {
    assert_eq!(compile(&ty, None).unwrap(), expected);
}

#[test]
fn test_delegation_without_builder_is_fatal() {
    let document = SchemaDocument::new(SchemaVersion::JsonSchema);
    let err = compile(&PropertyType::object(Some("App\\Model\\Address")), Some(&document)).unwrap_err();

    match err {
        SchemaError::SchemaBuilderNotConfigured { class_name } => {
            assert_eq!(class_name, "App\\Model\\Address");
        }
        other => panic!("Expected SchemaBuilderNotConfigured, got {:?}", other),
    }
    assert!(document.definitions().is_empty());
}

/// Builder that records nothing and sets a fixed reference
struct FixedBuilder;

impl SchemaBuilder for FixedBuilder {
    fn build(
        &self,
        _request: &BuildRequest<'_>,
        mut document: SchemaDocument,
        _context: Option<&SerializationContext>,
    ) -> resource_schema::Result<SchemaDocument> {
        let reference = document.reference_for("Fixed");
        document.set_reference(reference);
        Ok(document)
    }
}

#[test]
fn test_wired_builder_is_used_until_dropped() {
    let compiler = compiler();
    let document = SchemaDocument::new(SchemaVersion::Swagger);
    let ty = PropertyType::object(Some("App\\Model\\Address"));

    let builder: Rc<dyn SchemaBuilder> = Rc::new(FixedBuilder);
    compiler.set_schema_builder(&builder);
    assert!(compiler.has_schema_builder());
    let schema = compiler.compile(&ty, "json", None, None, Some(&document)).unwrap();
    assert_eq!(Value::Object(schema), json!({"$ref": "#/definitions/Fixed"}));

    drop(builder);
    assert!(!compiler.has_schema_builder());
    let err = compiler.compile(&ty, "json", None, None, Some(&document)).unwrap_err();
    assert!(matches!(err, SchemaError::SchemaBuilderNotConfigured { .. }));
}

#[test]
fn test_class_builder_wires_itself() {
    let builder = ClassSchemaBuilder::new(Rc::new(MetadataRegistry::new()));
    assert!(builder.compiler().has_schema_builder());
}

// =============================================================================
// Value Formats
// =============================================================================

#[rstest]
#[case("DateTimeImmutable", "date-time")]
#[case("\\DateTimeInterface", "date-time")]
#[case("DateInterval", "duration")]
#[case("App\\Id\\BookId", "uuid")]
fn test_value_formats(#[case] class_name: &str, #[case] format: &str) {
    let document = SchemaDocument::new(SchemaVersion::OpenApi);
    let schema = compile(&PropertyType::object(Some(class_name)), Some(&document)).unwrap();

    assert_eq!(schema, json!({"type": "string", "format": format}));
    assert!(document.definitions().is_empty());
}

#[test]
fn test_nullable_list_of_nullable_dates() {
    let ty = PropertyType::list_of(PropertyType::object(Some("DateTime")).nullable(true)).nullable(true);
    assert_eq!(
        compile(&ty, None).unwrap(),
        json!({
            "type": ["array", "null"],
            "items": {"type": ["string", "null"], "format": "date-time"}
        })
    );
}

// =============================================================================
// Resource Links
// =============================================================================

#[test]
fn test_resource_link_leaves_document_untouched() {
    let document = SchemaDocument::new(SchemaVersion::JsonSchema);
    let ty = PropertyType::object(Some("App\\Entity\\Author")).nullable(true);
    let schema = compile(&ty, Some(&document)).unwrap();

    assert_eq!(schema, json!({"type": ["string", "null"], "format": "iri-reference"}));
    assert!(document.definitions().is_empty());
    assert!(document.reference().is_none());
}

#[test]
fn test_resource_link_without_document_is_object() {
    let schema = compile(&PropertyType::object(Some("App\\Entity\\Author")), None).unwrap();
    assert_eq!(schema, json!({"type": "object"}));
}

#[test]
fn test_nested_collections() {
    let ty = PropertyType::map_of(PropertyType::list_of(PropertyType::int()));
    assert_eq!(
        compile(&ty, None).unwrap(),
        json!({
            "type": "object",
            "additionalProperties": {"type": "array", "items": {"type": "integer"}}
        })
    );
}

// =============================================================================
// Nullability
// =============================================================================

#[rstest]
#[case(json!({"type": "string"}), json!({"type": ["string", "null"]}))]
#[case(json!({"type": ["integer", "null"]}), json!({"type": ["integer", "null"]}))]
#[case(json!({"type": ["null", "integer"]}), json!({"type": ["null", "integer"]}))]
#[case(
    json!({"$ref": "#/components/schemas/Tag"}),
    json!({"oneOf": [{"type": "null"}, {"$ref": "#/components/schemas/Tag"}]})
)]
fn test_add_nullability(#[case] schema: Value, #[case] expected: Value) {
    let Value::Object(schema) = schema else {
        panic!("fixture must be an object");
    };
    assert_eq!(Value::Object(add_nullability(schema, true)), expected);
}

#[test]
fn test_compile_is_idempotent() {
    let ty = PropertyType::map_of(PropertyType::object(Some("DateInterval")).nullable(true));
    let first = compile(&ty, Some(&SchemaDocument::new(SchemaVersion::JsonSchema))).unwrap();
    let second = compile(&ty, Some(&SchemaDocument::new(SchemaVersion::JsonSchema))).unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Validation
// =============================================================================

#[rstest]
#[case::nullable_float(PropertyType::float().nullable(true), json!(null), json!("1.5"))]
#[case::float(PropertyType::float(), json!(1.5), json!(null))]
#[case::boolean_list(PropertyType::bool().as_collection(), json!([true, false]), json!([1]))]
#[case::int_map(PropertyType::map_of(PropertyType::int()), json!({"a": 1, "b": 2}), json!({"a": "one"}))]
#[case::nullable_string_list(
    PropertyType::list_of(PropertyType::string()).nullable(true),
    json!(null),
    json!({"a": "b"})
)]
fn test_fragments_validate(#[case] ty: PropertyType, #[case] valid: Value, #[case] invalid: Value) {
    let schema = compile(&ty, None).unwrap();
    let validator = JSONSchema::compile(&schema).expect("fragment should be a valid schema");

    assert!(validator.is_valid(&valid), "{valid} should match {schema}");
    assert!(!validator.is_valid(&invalid), "{invalid} should not match {schema}");
}
