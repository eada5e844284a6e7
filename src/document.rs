//! Schema documents and their shared definitions table
//!
//! A [`SchemaDocument`] owns a root fragment (holding the `$ref` of the class
//! it was built for) and a handle on a [`Definitions`] table. The handle is
//! reference counted: every sub-document created with
//! [`SchemaDocument::sharing`] writes into the same table, so a class reached
//! from several places in one build is defined once.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One JSON Schema node
pub type Fragment = Map<String, Value>;

/// URI of the JSON Schema dialect emitted for standalone documents
pub const JSON_SCHEMA_DIALECT: &str = "http://json-schema.org/draft-07/schema#";

/// Target vocabulary of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaVersion {
    /// Standalone JSON Schema (draft-07)
    #[default]
    JsonSchema,
    /// OpenAPI 3.x (`components/schemas`)
    #[serde(rename = "openapi")]
    OpenApi,
    /// Swagger 2.0 (`definitions`)
    Swagger,
}

impl SchemaVersion {
    /// Prefix of `$ref` pointers into the definitions table
    pub fn ref_prefix(&self) -> &'static str {
        match self {
            SchemaVersion::OpenApi => "#/components/schemas/",
            SchemaVersion::JsonSchema | SchemaVersion::Swagger => "#/definitions/",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "json-schema" | "jsonschema" | "json" => Some(SchemaVersion::JsonSchema),
            "openapi" | "oas" => Some(SchemaVersion::OpenApi),
            "swagger" => Some(SchemaVersion::Swagger),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaVersion::JsonSchema => "json-schema",
            SchemaVersion::OpenApi => "openapi",
            SchemaVersion::Swagger => "swagger",
        };
        f.write_str(name)
    }
}

/// Whether a schema describes data read from (output) or sent to (input) the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Input,
    #[default]
    Output,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Input => f.write_str("input"),
            SchemaKind::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    /// Name claimed by a build that is still running
    Reserved,
    Defined(Fragment),
}

/// Shared table of named definitions.
///
/// Cloning the handle shares the table. Names are unique; once a name is
/// present (defined or reserved) no other caller can replace it.
#[derive(Debug, Clone, Default)]
pub struct Definitions(Rc<RefCell<BTreeMap<String, Slot>>>);

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `name` is defined or reserved
    pub fn contains(&self, name: &str) -> bool {
        self.0.borrow().contains_key(name)
    }

    /// Finished definition for `name`
    pub fn get(&self, name: &str) -> Option<Fragment> {
        match self.0.borrow().get(name) {
            Some(Slot::Defined(fragment)) => Some(fragment.clone()),
            _ => None,
        }
    }

    /// Insert `fragment` unless `name` is already present.
    /// Returns whether the insertion happened.
    pub fn insert(&self, name: &str, fragment: Fragment) -> bool {
        let mut table = self.0.borrow_mut();
        if table.contains_key(name) {
            return false;
        }
        table.insert(name.to_string(), Slot::Defined(fragment));
        true
    }

    /// Claim `name` for a build about to produce it.
    /// Returns false when the name is already present.
    pub fn reserve(&self, name: &str) -> bool {
        let mut table = self.0.borrow_mut();
        if table.contains_key(name) {
            return false;
        }
        table.insert(name.to_string(), Slot::Reserved);
        true
    }

    /// Fill a slot previously claimed with [`Definitions::reserve`].
    /// Returns false (and changes nothing) when the slot is not reserved.
    pub fn complete(&self, name: &str, fragment: Fragment) -> bool {
        let mut table = self.0.borrow_mut();
        match table.get_mut(name) {
            Some(slot @ Slot::Reserved) => {
                *slot = Slot::Defined(fragment);
                true
            }
            _ => false,
        }
    }

    /// Drop every entry whose name is not in `snapshot`, a result of
    /// [`Definitions::names`] taken before a build that then failed
    pub fn rollback(&self, snapshot: &[String]) {
        self.0
            .borrow_mut()
            .retain(|name, _| snapshot.binary_search(name).is_ok());
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Names present in the table, sorted
    pub fn names(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// True when both handles point at the same table
    pub fn shares_with(&self, other: &Definitions) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Snapshot of the finished definitions as a JSON object
    pub fn to_json(&self) -> Fragment {
        self.0
            .borrow()
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Defined(fragment) => Some((name.clone(), Value::Object(fragment.clone()))),
                Slot::Reserved => None,
            })
            .collect()
    }
}

/// A schema document under construction
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    version: SchemaVersion,
    kind: SchemaKind,
    root: Fragment,
    definitions: Definitions,
}

impl SchemaDocument {
    /// Create an empty document with its own definitions table
    pub fn new(version: SchemaVersion) -> Self {
        Self {
            version,
            kind: SchemaKind::default(),
            root: Fragment::new(),
            definitions: Definitions::new(),
        }
    }

    /// Create an empty document whose definitions are shared with `parent`
    pub fn sharing(parent: &SchemaDocument) -> Self {
        Self {
            version: parent.version,
            kind: parent.kind,
            root: Fragment::new(),
            definitions: parent.definitions.clone(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: SchemaKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: SchemaKind) {
        self.kind = kind;
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Top-level `$ref` pointer, once a build has set it
    pub fn reference(&self) -> Option<&str> {
        self.root.get("$ref").and_then(Value::as_str)
    }

    pub fn set_reference(&mut self, reference: impl Into<String>) {
        self.root
            .insert("$ref".to_string(), Value::String(reference.into()));
    }

    /// Pointer to the definition named `name` in this document's vocabulary
    pub fn reference_for(&self, name: &str) -> String {
        format!("{}{}", self.version.ref_prefix(), name)
    }

    pub fn root(&self) -> &Fragment {
        &self.root
    }

    /// Render the whole document
    pub fn to_json(&self) -> Value {
        let mut out = Fragment::new();
        if self.version == SchemaVersion::JsonSchema {
            out.insert(
                "$schema".to_string(),
                Value::String(JSON_SCHEMA_DIALECT.to_string()),
            );
        }
        for (key, value) in &self.root {
            out.insert(key.clone(), value.clone());
        }

        let definitions = Value::Object(self.definitions.to_json());
        match self.version {
            SchemaVersion::OpenApi => {
                let mut components = Fragment::new();
                components.insert("schemas".to_string(), definitions);
                out.insert("components".to_string(), Value::Object(components));
            }
            SchemaVersion::JsonSchema | SchemaVersion::Swagger => {
                out.insert("definitions".to_string(), definitions);
            }
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment(value: Value) -> Fragment {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_sub_document_shares_definitions() {
        let parent = SchemaDocument::new(SchemaVersion::OpenApi);
        let child = SchemaDocument::sharing(&parent);

        child
            .definitions()
            .insert("Book", fragment(json!({"type": "object"})));

        assert!(parent.definitions().contains("Book"));
        assert!(parent.definitions().shares_with(child.definitions()));
        assert_eq!(child.version(), SchemaVersion::OpenApi);
        assert!(child.reference().is_none());
    }

    #[test]
    fn test_insert_is_idempotent_by_name() {
        let definitions = Definitions::new();
        assert!(definitions.insert("Book", fragment(json!({"type": "object"}))));
        assert!(!definitions.insert("Book", fragment(json!({"type": "string"}))));
        assert_eq!(definitions.get("Book"), Some(fragment(json!({"type": "object"}))));
    }

    #[test]
    fn test_reserved_slot_only_completed_once() {
        let definitions = Definitions::new();
        assert!(definitions.reserve("Node"));
        assert!(!definitions.reserve("Node"));
        assert!(definitions.contains("Node"));
        assert!(definitions.get("Node").is_none());

        assert!(definitions.complete("Node", fragment(json!({"type": "object"}))));
        assert!(!definitions.complete("Node", fragment(json!({}))));
        assert_eq!(definitions.get("Node"), Some(fragment(json!({"type": "object"}))));
    }

    #[test]
    fn test_rollback_drops_entries_added_after_snapshot() {
        let definitions = Definitions::new();
        definitions.insert("Kept", Fragment::new());
        let snapshot = definitions.names();

        definitions.reserve("Pending");
        definitions.insert("Done", Fragment::new());
        definitions.rollback(&snapshot);

        assert_eq!(definitions.names(), vec!["Kept".to_string()]);
    }

    #[test]
    fn test_render_per_version() {
        let mut doc = SchemaDocument::new(SchemaVersion::OpenApi);
        doc.definitions().insert("Book", fragment(json!({"type": "object"})));
        let reference = doc.reference_for("Book");
        doc.set_reference(reference);

        assert_eq!(
            doc.to_json(),
            json!({
                "$ref": "#/components/schemas/Book",
                "components": {"schemas": {"Book": {"type": "object"}}}
            })
        );

        let doc = SchemaDocument::new(SchemaVersion::JsonSchema);
        let rendered = doc.to_json();
        assert_eq!(rendered["$schema"], json!(JSON_SCHEMA_DIALECT));
        assert_eq!(rendered["definitions"], json!({}));
    }
}
