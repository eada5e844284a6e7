//! Resource Schema
//!
//! Metadata-driven JSON Schema generation for API resource classes.
//!
//! ## Features
//!
//! - **Type Compilation**: Declared property types become JSON Schema fragments
//! - **Shared Definitions**: Nested classes are defined once per document and referenced by `$ref`
//! - **Resource Links**: Properties pointing at API resources are emitted as IRI references
//! - **Multiple Vocabularies**: JSON Schema, OpenAPI 3 and Swagger 2 reference layouts
//! - **Access Control**: Expression-based resource access checks
//! - **Subscriptions**: Topic IRIs and hub URLs for real-time updates
//!
//! ## Architecture
//!
//! ```text
//! MetadataRegistry ──► ClassSchemaBuilder ──► SchemaDocument
//!                          │      ▲                 │
//!                          ▼      │ $ref            ▼
//!                     TypeSchemaCompiler ──► Definitions (shared)
//! ```

pub mod builder;
pub mod compiler;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod metadata;
pub mod property_type;
pub mod resource;
pub mod security;
pub mod subscription;
pub mod value_types;

pub use builder::{encode_definition_name, BuildRequest, ClassSchemaBuilder, SchemaBuilder};
pub use compiler::{add_nullability, TypeSchemaCompiler};
pub use config::SchemaConfig;
pub use context::SerializationContext;
pub use document::{Definitions, Fragment, SchemaDocument, SchemaKind, SchemaVersion};
pub use error::{Result, SchemaError};
pub use metadata::{ClassMetadata, MetadataRegistry, OperationType, PropertyMetadata};
pub use property_type::{BuiltinType, PropertyType};
pub use resource::{ResourceClassResolver, StaticResourceClasses};
pub use security::{CelExpressionLanguage, ResourceAccessChecker};
pub use subscription::SubscriptionIriGenerator;
pub use value_types::{ValueFormat, ValueTypeRegistry};
