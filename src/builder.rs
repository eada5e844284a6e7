//! Class schema builder
//!
//! Builds the object definition of a class from its metadata, compiling each
//! property type with the [`TypeSchemaCompiler`]. The compiler calls back
//! into the builder when a property refers to another class, so both share
//! one definitions table for the whole document.

use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use crate::compiler::TypeSchemaCompiler;
use crate::context::SerializationContext;
use crate::document::{Fragment, SchemaDocument, SchemaKind, SchemaVersion};
use crate::error::{Result, SchemaError};
use crate::metadata::{short_class_name, ClassMetadata, MetadataRegistry, OperationType};
use crate::value_types::ValueTypeRegistry;

/// What to build: a class, in a format, for a direction, optionally for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest<'a> {
    pub class_name: &'a str,
    pub format: &'a str,
    pub kind: SchemaKind,
    pub operation: Option<(OperationType, &'a str)>,
}

impl<'a> BuildRequest<'a> {
    pub fn new(class_name: &'a str, format: &'a str, kind: SchemaKind) -> Self {
        Self {
            class_name,
            format,
            kind,
            operation: None,
        }
    }

    #[must_use]
    pub fn for_operation(mut self, operation_type: OperationType, name: &'a str) -> Self {
        self.operation = Some((operation_type, name));
        self
    }
}

/// Produces the full schema of a class into a (possibly pre-populated) document.
pub trait SchemaBuilder {
    /// Build the schema of `request.class_name` into `document`.
    ///
    /// Implementations merge into the document's definitions rather than
    /// replacing them, and set the document's top-level `$ref`.
    fn build(
        &self,
        request: &BuildRequest<'_>,
        document: SchemaDocument,
        context: Option<&SerializationContext>,
    ) -> Result<SchemaDocument>;
}

/// Metadata-backed [`SchemaBuilder`]
pub struct ClassSchemaBuilder {
    metadata: Rc<MetadataRegistry>,
    compiler: TypeSchemaCompiler,
}

impl ClassSchemaBuilder {
    /// Create a builder and wire it into its own compiler
    pub fn new(metadata: Rc<MetadataRegistry>) -> Rc<Self> {
        Self::with_value_types(metadata, ValueTypeRegistry::default())
    }

    pub fn with_value_types(
        metadata: Rc<MetadataRegistry>,
        value_types: ValueTypeRegistry,
    ) -> Rc<Self> {
        let compiler = TypeSchemaCompiler::with_value_types(metadata.clone(), value_types);
        let builder = Rc::new(Self { metadata, compiler });
        let dyn_builder: Rc<dyn SchemaBuilder> = builder.clone();
        builder.compiler.set_schema_builder(&dyn_builder);
        builder
    }

    pub fn compiler(&self) -> &TypeSchemaCompiler {
        &self.compiler
    }

    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    /// Build a complete document for `request`, starting from `document`
    /// or a fresh one of `version`.
    pub fn build_schema(
        &self,
        request: &BuildRequest<'_>,
        version: SchemaVersion,
        document: Option<SchemaDocument>,
        context: Option<&SerializationContext>,
    ) -> Result<SchemaDocument> {
        let document = document.unwrap_or_else(|| SchemaDocument::new(version));
        self.build(request, document, context)
    }

    fn class(&self, class_name: &str) -> Result<&ClassMetadata> {
        self.metadata
            .get(class_name)
            .ok_or_else(|| SchemaError::UnknownClass(class_name.to_string()))
    }

    /// Context the build runs with: explicit context, then the operation's
    /// groups, then the class defaults
    fn effective_context(
        &self,
        class: &ClassMetadata,
        request: &BuildRequest<'_>,
        context: Option<&SerializationContext>,
    ) -> Option<SerializationContext> {
        if let Some(context) = context {
            return Some(context.clone());
        }

        let operation_groups = request
            .operation
            .and_then(|(operation_type, name)| class.operation(operation_type, name))
            .map(|operation| operation.groups_for(request.kind))
            .filter(|groups| !groups.is_empty());

        let groups = operation_groups.unwrap_or_else(|| class.default_groups(request.kind));
        if groups.is_empty() {
            None
        } else {
            Some(SerializationContext::with_groups(groups.iter().cloned()))
        }
    }

    fn definition_name(
        &self,
        class: &ClassMetadata,
        io_class: Option<&str>,
        format: &str,
        context: Option<&SerializationContext>,
    ) -> String {
        let mut name = class.short_name().to_string();

        if let Some(io_class) = io_class.filter(|io| *io != class.name) {
            let io_short = self
                .metadata
                .get(io_class)
                .map(ClassMetadata::short_name)
                .unwrap_or_else(|| short_class_name(io_class));
            name.push(':');
            name.push_str(io_short);
        }

        if format != "json" {
            name.push('.');
            name.push_str(format);
        }

        if let Some(context) = context.filter(|c| c.has_groups()) {
            name.push('-');
            name.push_str(&context.groups.join("_"));
        }

        encode_definition_name(&name)
    }

    fn build_definition(
        &self,
        class: &ClassMetadata,
        properties_class: &ClassMetadata,
        request: &BuildRequest<'_>,
        document: &SchemaDocument,
        context: Option<&SerializationContext>,
    ) -> Result<Fragment> {
        let mut definition = Fragment::new();
        definition.insert("type".to_string(), json!("object"));

        if let Some(description) = &class.description {
            definition.insert("description".to_string(), json!(description));
        }
        if let Some(iri) = &class.iri {
            definition.insert("externalDocs".to_string(), json!({"url": iri}));
        }
        if context.is_some_and(|c| !c.allow_extra_attributes) {
            definition.insert("additionalProperties".to_string(), json!(false));
        }

        let mut properties = Fragment::new();
        let mut required = Vec::new();
        for property in &properties_class.properties {
            if !property.is_exposed(request.kind) {
                continue;
            }
            if let Some(context) = context {
                if !context.includes(&property.groups) {
                    continue;
                }
            }

            let mut schema = property.json_schema.clone().unwrap_or_default();
            if let Some(description) = &property.description {
                schema
                    .entry("description")
                    .or_insert_with(|| json!(description));
            }
            if request.kind == SchemaKind::Output && !property.writable {
                schema.entry("readOnly").or_insert(json!(true));
            }

            if let Some(ty) = &property.ty {
                let value_schema = self.compiler.compile(
                    ty,
                    request.format,
                    property.link_hint(request.kind),
                    context,
                    Some(document),
                )?;
                for (key, value) in value_schema {
                    schema.entry(key).or_insert(value);
                }
            }

            if property.required && request.kind == SchemaKind::Input {
                required.push(Value::String(property.name.clone()));
            }
            properties.insert(property.name.clone(), Value::Object(schema));
        }

        definition.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            definition.insert("required".to_string(), Value::Array(required));
        }

        Ok(definition)
    }
}

impl SchemaBuilder for ClassSchemaBuilder {
    fn build(
        &self,
        request: &BuildRequest<'_>,
        mut document: SchemaDocument,
        context: Option<&SerializationContext>,
    ) -> Result<SchemaDocument> {
        let class = self.class(request.class_name)?;
        document.set_kind(request.kind);

        let context = self.effective_context(class, request, context);
        let io_class = class.io_class(request.kind);
        let name = self.definition_name(class, io_class, request.format, context.as_ref());
        let reference = document.reference_for(&name);
        document.set_reference(reference);

        let definitions = document.definitions().clone();
        let snapshot = definitions.names();
        if !definitions.reserve(&name) {
            debug!(definition = %name, "definition already present");
            return Ok(document);
        }

        let properties_class = match io_class {
            Some(io) => self.class(io).unwrap_or(class),
            None => class,
        };

        debug!(definition = %name, class = %class.name, kind = %request.kind, "building definition");
        match self.build_definition(class, properties_class, request, &document, context.as_ref()) {
            Ok(definition) => {
                definitions.complete(&name, definition);
                Ok(document)
            }
            Err(err) => {
                // Nested definitions completed during this build go too
                definitions.rollback(&snapshot);
                Err(err)
            }
        }
    }
}

/// Replace characters that are not valid in a definition name with `.`
pub fn encode_definition_name(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let invalid = INVALID.get_or_init(|| {
        Regex::new(r"[^a-zA-Z0-9.\-_]").expect("definition name pattern is valid")
    });
    invalid.replace_all(name, ".").into_owned()
}
