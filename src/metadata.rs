//! Class metadata
//!
//! Describes the domain classes schemas are built from: their short names,
//! whether they are API resources, the ancestors they declare and the typed
//! properties they expose. Loaded from TOML or JSON files:
//!
//! ```toml
//! [[classes]]
//! name = "App\\Entity\\Book"
//! short_name = "Book"
//! resource = true
//!
//! [[classes.properties]]
//! name = "title"
//! type = { builtin = "string" }
//! required = true
//! groups = ["book:read", "book:write"]
//!
//! [classes.item_operations.get]
//! normalization_groups = ["book:read"]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::debug;

use crate::document::SchemaKind;
use crate::error::{Result, SchemaError};
use crate::property_type::PropertyType;
use crate::resource::{collect_ancestors, ResourceClassResolver};

/// Operation flavour an operation name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Item,
    Collection,
}

/// Serializer groups of one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetadata {
    #[serde(default)]
    pub normalization_groups: Vec<String>,
    #[serde(default)]
    pub denormalization_groups: Vec<String>,
}

impl OperationMetadata {
    /// Groups applying to schemas of `kind`
    pub fn groups_for(&self, kind: SchemaKind) -> &[String] {
        match kind {
            SchemaKind::Output => &self.normalization_groups,
            SchemaKind::Input => &self.denormalization_groups,
        }
    }
}

/// One property of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    pub name: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<PropertyType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub readable: bool,

    #[serde(default = "default_true")]
    pub writable: bool,

    #[serde(default)]
    pub required: bool,

    /// Embed related resources when reading instead of linking them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readable_link: Option<bool>,

    /// Embed related resources when writing instead of linking them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writable_link: Option<bool>,

    /// Serializer groups; empty means the property is only visible when
    /// no groups are requested
    #[serde(default)]
    pub groups: Vec<String>,

    /// Extra JSON Schema keywords merged into the property schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Map<String, serde_json::Value>>,
}

fn default_true() -> bool {
    true
}

impl PropertyMetadata {
    pub fn new(name: impl Into<String>, ty: Option<PropertyType>) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            readable: true,
            writable: true,
            required: false,
            readable_link: None,
            writable_link: None,
            groups: Vec::new(),
            json_schema: None,
        }
    }

    /// Whether the property takes part in schemas of `kind`
    pub fn is_exposed(&self, kind: SchemaKind) -> bool {
        match kind {
            SchemaKind::Output => self.readable,
            SchemaKind::Input => self.writable,
        }
    }

    /// Embedding override for schemas of `kind`
    pub fn link_hint(&self, kind: SchemaKind) -> Option<bool> {
        match kind {
            SchemaKind::Output => self.readable_link,
            SchemaKind::Input => self.writable_link,
        }
    }
}

/// Metadata of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Fully qualified class name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,

    /// Top-level addressable API resource
    #[serde(default)]
    pub resource: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// IRI of the vocabulary term describing the class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iri: Option<String>,

    /// Direct parent classes and implemented interfaces
    #[serde(default)]
    pub parents: Vec<String>,

    /// Class whose properties describe the input representation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Class whose properties describe the output representation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default)]
    pub properties: Vec<PropertyMetadata>,

    #[serde(default)]
    pub normalization_groups: Vec<String>,

    #[serde(default)]
    pub denormalization_groups: Vec<String>,

    #[serde(default)]
    pub item_operations: HashMap<String, OperationMetadata>,

    #[serde(default)]
    pub collection_operations: HashMap<String, OperationMetadata>,
}

impl ClassMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: None,
            resource: false,
            description: None,
            iri: None,
            parents: Vec::new(),
            input: None,
            output: None,
            properties: Vec::new(),
            normalization_groups: Vec::new(),
            denormalization_groups: Vec::new(),
            item_operations: HashMap::new(),
            collection_operations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn resource(mut self) -> Self {
        self.resource = true;
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: PropertyMetadata) -> Self {
        self.properties.push(property);
        self
    }

    /// Declared short name, or the last segment of the class name
    pub fn short_name(&self) -> &str {
        match &self.short_name {
            Some(short) => short,
            None => short_class_name(&self.name),
        }
    }

    pub fn operation(&self, operation_type: OperationType, name: &str) -> Option<&OperationMetadata> {
        match operation_type {
            OperationType::Item => self.item_operations.get(name),
            OperationType::Collection => self.collection_operations.get(name),
        }
    }

    /// Class-wide default groups for schemas of `kind`
    pub fn default_groups(&self, kind: SchemaKind) -> &[String] {
        match kind {
            SchemaKind::Output => &self.normalization_groups,
            SchemaKind::Input => &self.denormalization_groups,
        }
    }

    /// Input or output class declared for `kind`
    pub fn io_class(&self, kind: SchemaKind) -> Option<&str> {
        match kind {
            SchemaKind::Output => self.output.as_deref(),
            SchemaKind::Input => self.input.as_deref(),
        }
    }
}

/// Last segment of a namespaced class name
pub fn short_class_name(class_name: &str) -> &str {
    class_name
        .rsplit(['\\', ':', '.'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(class_name)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetadataFile {
    #[serde(default)]
    classes: Vec<ClassMetadata>,
}

/// Registry of class metadata keyed by fully qualified name
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    classes: HashMap<String, ClassMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a `.toml` or `.json` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut registry = Self::new();
        registry.load_path(path)?;
        Ok(registry)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut registry = Self::new();
        registry.load_file(toml::from_str(content)?)?;
        Ok(registry)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut registry = Self::new();
        registry.load_file(serde_json::from_str(content)?)?;
        Ok(registry)
    }

    /// Merge the classes of another file into this registry
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let file: MetadataFile = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => return Err(SchemaError::UnsupportedFormat(path.display().to_string())),
        };
        debug!(path = %path.display(), classes = file.classes.len(), "loaded class metadata");
        self.load_file(file)
    }

    fn load_file(&mut self, file: MetadataFile) -> Result<()> {
        for class in file.classes {
            self.insert(class)?;
        }
        Ok(())
    }

    /// Add a class; a class name may only be registered once
    pub fn insert(&mut self, class: ClassMetadata) -> Result<()> {
        let name = class.name.trim_start_matches('\\').to_string();
        if name.is_empty() {
            return Err(SchemaError::InvalidMetadata("class without a name".to_string()));
        }
        if self.classes.contains_key(&name) {
            return Err(SchemaError::InvalidMetadata(format!(
                "class {name} is declared more than once"
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for property in &class.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(SchemaError::InvalidMetadata(format!(
                    "property {}::{} is declared more than once",
                    name, property.name
                )));
            }
        }
        self.classes.insert(name, class);
        Ok(())
    }

    pub fn get(&self, class_name: &str) -> Option<&ClassMetadata> {
        self.classes.get(class_name.trim_start_matches('\\'))
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.get(class_name).is_some()
    }

    /// Fully qualified names of every resource class, sorted
    pub fn resource_classes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .classes
            .values()
            .filter(|class| class.resource)
            .map(|class| class.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ResourceClassResolver for MetadataRegistry {
    fn is_resource_class(&self, class_name: &str) -> bool {
        self.get(class_name).is_some_and(|class| class.resource)
    }

    fn ancestors(&self, class_name: &str) -> Vec<String> {
        collect_ancestors(class_name, |name| {
            self.get(name).map(|class| class.parents.clone())
        })
    }
}
