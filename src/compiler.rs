//! Type-to-schema compiler
//!
//! Turns a [`PropertyType`] into a JSON Schema fragment. Collections recurse
//! into their element type, well-known value classes become formatted
//! strings, resource classes become IRI references, and every other class is
//! delegated to a [`SchemaBuilder`] whose definitions land in the caller's
//! shared table. Nullability is applied last, uniformly, on every branch.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::builder::{BuildRequest, SchemaBuilder};
use crate::context::SerializationContext;
use crate::document::{Fragment, SchemaDocument, SchemaKind};
use crate::error::{Result, SchemaError};
use crate::property_type::{BuiltinType, PropertyType};
use crate::resource::ResourceClassResolver;
use crate::value_types::ValueTypeRegistry;

/// Compiles declared property types into JSON Schema fragments.
pub struct TypeSchemaCompiler {
    resolver: Rc<dyn ResourceClassResolver>,
    value_types: ValueTypeRegistry,
    /// Late-bound: the concrete builder usually owns this compiler
    schema_builder: RefCell<Option<Weak<dyn SchemaBuilder>>>,
}

impl TypeSchemaCompiler {
    pub fn new(resolver: Rc<dyn ResourceClassResolver>) -> Self {
        Self::with_value_types(resolver, ValueTypeRegistry::default())
    }

    pub fn with_value_types(
        resolver: Rc<dyn ResourceClassResolver>,
        value_types: ValueTypeRegistry,
    ) -> Self {
        Self {
            resolver,
            value_types,
            schema_builder: RefCell::new(None),
        }
    }

    /// Wire the builder used for class sub-schemas.
    ///
    /// Only a weak reference is kept; the caller keeps the builder alive.
    pub fn set_schema_builder(&self, builder: &Rc<dyn SchemaBuilder>) {
        *self.schema_builder.borrow_mut() = Some(Rc::downgrade(builder));
    }

    pub fn has_schema_builder(&self) -> bool {
        self.schema_builder
            .borrow()
            .as_ref()
            .is_some_and(|builder| builder.strong_count() > 0)
    }

    pub fn value_types(&self) -> &ValueTypeRegistry {
        &self.value_types
    }

    pub fn resolver(&self) -> &dyn ResourceClassResolver {
        self.resolver.as_ref()
    }

    /// Compile `ty` into a complete JSON Schema node.
    ///
    /// `readable_link` set to `Some(true)` embeds resource classes instead of
    /// linking them. Without a `document` only standalone types are produced
    /// and classes degrade to `{"type": "object"}`.
    pub fn compile(
        &self,
        ty: &PropertyType,
        format: &str,
        readable_link: Option<bool>,
        context: Option<&SerializationContext>,
        document: Option<&SchemaDocument>,
    ) -> Result<Fragment> {
        let schema = if ty.is_collection() {
            let element = ty.element_type();
            let inner = self.compile(&element, format, readable_link, context, document)?;
            let string_keyed = matches!(
                ty.collection_key_type().map(PropertyType::builtin),
                Some(BuiltinType::String)
            );

            if string_keyed {
                object(json!({"type": "object", "additionalProperties": inner}))
            } else {
                object(json!({"type": "array", "items": inner}))
            }
        } else {
            self.basic_type(ty, format, readable_link, context, document)?
        };

        Ok(add_nullability(schema, ty.is_nullable()))
    }

    fn basic_type(
        &self,
        ty: &PropertyType,
        format: &str,
        readable_link: Option<bool>,
        context: Option<&SerializationContext>,
        document: Option<&SchemaDocument>,
    ) -> Result<Fragment> {
        trace!(builtin = ty.builtin().name(), "compiling basic type");
        let schema = match ty.builtin() {
            BuiltinType::Int => object(json!({"type": "integer"})),
            BuiltinType::Float => object(json!({"type": "number"})),
            BuiltinType::Bool => object(json!({"type": "boolean"})),
            BuiltinType::Object { class_name } => {
                self.class_type(class_name.as_deref(), format, readable_link, context, document)?
            }
            BuiltinType::String | BuiltinType::Unknown => object(json!({"type": "string"})),
        };
        Ok(schema)
    }

    fn class_type(
        &self,
        class_name: Option<&str>,
        format: &str,
        readable_link: Option<bool>,
        context: Option<&SerializationContext>,
        document: Option<&SchemaDocument>,
    ) -> Result<Fragment> {
        let Some(class_name) = class_name else {
            return Ok(object(json!({"type": "object"})));
        };

        if let Some(value_format) = self.value_types.format_for(class_name, self.resolver()) {
            return Ok(object(json!({"type": "string", "format": value_format.as_str()})));
        }

        // Filters and other standalone callers only support basic types
        let Some(document) = document else {
            return Ok(object(json!({"type": "object"})));
        };

        if self.resolver.is_resource_class(class_name) && readable_link != Some(true) {
            return Ok(object(json!({"type": "string", "format": "iri-reference"})));
        }

        let builder = self
            .schema_builder
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| SchemaError::SchemaBuilderNotConfigured {
                class_name: class_name.to_string(),
            })?;

        debug!(class = class_name, version = %document.version(), "delegating class sub-schema");
        let request = BuildRequest::new(class_name, format, SchemaKind::Output);
        let sub_document = builder.build(&request, SchemaDocument::sharing(document), context)?;

        let reference = sub_document.reference().ok_or_else(|| {
            SchemaError::InvalidMetadata(format!("schema built for {class_name} has no $ref"))
        })?;

        Ok(object(json!({"$ref": reference})))
    }
}

/// Extend `schema` so it also accepts `null`.
///
/// Nodes with a `type` keyword get `"null"` added to it (as a deduplicated
/// list); anything else is wrapped in a `oneOf` with a null schema.
pub fn add_nullability(mut schema: Fragment, nullable: bool) -> Fragment {
    if !nullable {
        return schema;
    }

    let Some(existing) = schema.get("type") else {
        return object(json!({"oneOf": [{"type": "null"}, schema]}));
    };

    let mut types: Vec<Value> = match existing {
        Value::Array(types) => types.clone(),
        other => vec![other.clone()],
    };
    types.push(Value::String("null".to_string()));

    let mut union: Vec<Value> = Vec::with_capacity(types.len());
    for ty in types {
        if !union.contains(&ty) {
            union.push(ty);
        }
    }

    schema.insert("type".to_string(), Value::Array(union));
    schema
}

fn object(value: Value) -> Fragment {
    match value {
        Value::Object(map) => map,
        _ => Fragment::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::StaticResourceClasses;

    fn compiler() -> TypeSchemaCompiler {
        TypeSchemaCompiler::new(Rc::new(StaticResourceClasses::new(["App\\Entity\\Author"])))
    }

    fn compile(ty: &PropertyType) -> Value {
        Value::Object(compiler().compile(ty, "json", None, None, None).unwrap())
    }

    #[test]
    fn test_scalars() {
        assert_eq!(compile(&PropertyType::int()), json!({"type": "integer"}));
        assert_eq!(compile(&PropertyType::float()), json!({"type": "number"}));
        assert_eq!(compile(&PropertyType::bool()), json!({"type": "boolean"}));
        assert_eq!(compile(&PropertyType::string()), json!({"type": "string"}));
        assert_eq!(compile(&PropertyType::unknown()), json!({"type": "string"}));
        assert_eq!(compile(&PropertyType::object(None)), json!({"type": "object"}));
    }

    #[test]
    fn test_nullable_float() {
        assert_eq!(
            compile(&PropertyType::float().nullable(true)),
            json!({"type": ["number", "null"]})
        );
    }

    #[test]
    fn test_nullable_string_keyed_map() {
        let ty = PropertyType::map_of(PropertyType::int()).nullable(true);
        assert_eq!(
            compile(&ty),
            json!({"type": ["object", "null"], "additionalProperties": {"type": "integer"}})
        );
    }

    #[test]
    fn test_collection_without_value_type_uses_own_kind() {
        let ty = PropertyType::bool().as_collection();
        assert_eq!(compile(&ty), json!({"type": "array", "items": {"type": "boolean"}}));
    }

    #[test]
    fn test_non_string_key_is_array() {
        let ty = PropertyType::collection_of(Some(PropertyType::int()), PropertyType::string());
        assert_eq!(compile(&ty), json!({"type": "array", "items": {"type": "string"}}));
    }

    #[test]
    fn test_nullability_deduplicates() {
        let schema = object(json!({"type": ["string", "null"]}));
        assert_eq!(
            Value::Object(add_nullability(schema, true)),
            json!({"type": ["string", "null"]})
        );
    }

    #[test]
    fn test_nullability_wraps_ref() {
        let schema = object(json!({"$ref": "#/definitions/Address"}));
        assert_eq!(
            Value::Object(add_nullability(schema, true)),
            json!({"oneOf": [{"type": "null"}, {"$ref": "#/definitions/Address"}]})
        );
    }

    #[test]
    fn test_not_nullable_is_untouched() {
        let schema = object(json!({"type": "integer"}));
        assert_eq!(add_nullability(schema.clone(), false), schema);
    }

    #[test]
    fn test_missing_builder_is_fatal() {
        let compiler = compiler();
        let document = SchemaDocument::new(Default::default());
        let err = compiler
            .compile(&PropertyType::object(Some("App\\Entity\\Address")), "json", None, None, Some(&document))
            .unwrap_err();

        assert!(matches!(err, SchemaError::SchemaBuilderNotConfigured { .. }));
        assert!(document.definitions().is_empty());
        assert!(!compiler.has_schema_builder());
    }

    #[test]
    fn test_resource_without_builder_still_links() {
        let compiler = compiler();
        let document = SchemaDocument::new(Default::default());
        let schema = compiler
            .compile(&PropertyType::object(Some("App\\Entity\\Author")), "json", None, None, Some(&document))
            .unwrap();

        assert_eq!(Value::Object(schema), json!({"type": "string", "format": "iri-reference"}));
        assert!(document.definitions().is_empty());
    }
}
