//! Declared types of properties and parameters

use serde::{Deserialize, Serialize};

/// Built-in kind of a declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Int,
    Float,
    Bool,
    String,
    /// An object, optionally tied to a fully qualified class name
    Object { class_name: Option<String> },
    /// Anything else (arrays without element info, mixed, iterables...)
    Unknown,
}

impl BuiltinType {
    /// Parse a builtin name as found in metadata files.
    pub fn from_name(name: &str, class_name: Option<String>) -> Self {
        match name {
            "int" | "integer" => BuiltinType::Int,
            "float" | "number" | "double" => BuiltinType::Float,
            "bool" | "boolean" => BuiltinType::Bool,
            "string" => BuiltinType::String,
            "object" => BuiltinType::Object { class_name },
            _ => BuiltinType::Unknown,
        }
    }

    /// Name used when serializing back to metadata
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::Bool => "bool",
            BuiltinType::String => "string",
            BuiltinType::Object { .. } => "object",
            BuiltinType::Unknown => "mixed",
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            BuiltinType::Object { class_name } => class_name.as_deref(),
            _ => None,
        }
    }
}

/// The declared type of one property or parameter.
///
/// Collection key and value types are themselves `PropertyType`s, so
/// list-of-list, map-of-list and deeper nestings are expressible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PropertyTypeDef", into = "PropertyTypeDef")]
pub struct PropertyType {
    builtin: BuiltinType,
    nullable: bool,
    collection: bool,
    key_type: Option<Box<PropertyType>>,
    value_type: Option<Box<PropertyType>>,
}

impl PropertyType {
    pub fn new(builtin: BuiltinType) -> Self {
        Self {
            builtin,
            nullable: false,
            collection: false,
            key_type: None,
            value_type: None,
        }
    }

    pub fn int() -> Self {
        Self::new(BuiltinType::Int)
    }

    pub fn float() -> Self {
        Self::new(BuiltinType::Float)
    }

    pub fn bool() -> Self {
        Self::new(BuiltinType::Bool)
    }

    pub fn string() -> Self {
        Self::new(BuiltinType::String)
    }

    pub fn unknown() -> Self {
        Self::new(BuiltinType::Unknown)
    }

    /// An object type, with or without a class
    pub fn object(class_name: Option<&str>) -> Self {
        Self::new(BuiltinType::Object {
            class_name: class_name.map(String::from),
        })
    }

    /// A collection of `value`, keyed by `key` when given
    pub fn collection_of(key: Option<PropertyType>, value: PropertyType) -> Self {
        Self {
            builtin: BuiltinType::Unknown,
            nullable: false,
            collection: true,
            key_type: key.map(Box::new),
            value_type: Some(Box::new(value)),
        }
    }

    /// A sequential list of `value`
    pub fn list_of(value: PropertyType) -> Self {
        Self::collection_of(Some(PropertyType::int()), value)
    }

    /// A string-keyed map of `value`
    pub fn map_of(value: PropertyType) -> Self {
        Self::collection_of(Some(PropertyType::string()), value)
    }

    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark as a collection without changing the builtin kind. The element
    /// type is left for the compiler to infer unless set with `with_value`.
    #[must_use]
    pub fn as_collection(mut self) -> Self {
        self.collection = true;
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: PropertyType) -> Self {
        self.key_type = Some(Box::new(key));
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: PropertyType) -> Self {
        self.value_type = Some(Box::new(value));
        self
    }

    pub fn builtin(&self) -> &BuiltinType {
        &self.builtin
    }

    pub fn class_name(&self) -> Option<&str> {
        self.builtin.class_name()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    pub fn collection_key_type(&self) -> Option<&PropertyType> {
        self.key_type.as_deref()
    }

    pub fn collection_value_type(&self) -> Option<&PropertyType> {
        self.value_type.as_deref()
    }

    /// Element type of a collection: the declared value type, or the same
    /// builtin kind stripped of its collection and nullable flags.
    pub fn element_type(&self) -> PropertyType {
        match &self.value_type {
            Some(value) => value.as_ref().clone(),
            None => PropertyType::new(self.builtin.clone()),
        }
    }
}

/// Flat wire form used in metadata files
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PropertyTypeDef {
    builtin: String,
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    nullable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    collection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<Box<PropertyType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Box<PropertyType>>,
}

impl From<PropertyTypeDef> for PropertyType {
    fn from(def: PropertyTypeDef) -> Self {
        Self {
            builtin: BuiltinType::from_name(&def.builtin, def.class_name),
            nullable: def.nullable,
            collection: def.collection,
            key_type: def.key,
            value_type: def.value,
        }
    }
}

impl From<PropertyType> for PropertyTypeDef {
    fn from(ty: PropertyType) -> Self {
        Self {
            builtin: ty.builtin.name().to_string(),
            class_name: ty.builtin.class_name().map(String::from),
            nullable: ty.nullable,
            collection: ty.collection,
            key: ty.key_type,
            value: ty.value_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_falls_back_to_own_kind() {
        let ty = PropertyType::object(Some("App\\Entity\\Tag"))
            .nullable(true)
            .as_collection();
        let element = ty.element_type();

        assert_eq!(element.class_name(), Some("App\\Entity\\Tag"));
        assert!(!element.is_collection());
        assert!(!element.is_nullable());
    }

    #[test]
    fn test_element_type_prefers_declared_value() {
        let ty = PropertyType::list_of(PropertyType::bool());
        assert_eq!(ty.element_type(), PropertyType::bool());
    }

    #[test]
    fn test_deserialize_nested_collection() {
        let ty: PropertyType = toml::from_str(
            r#"
            builtin = "array"
            collection = true
            nullable = true
            key = { builtin = "string" }
            value = { builtin = "object", class = "App\\Entity\\Author" }
            "#,
        )
        .unwrap();

        assert!(ty.is_collection());
        assert!(ty.is_nullable());
        assert_eq!(ty.builtin(), &BuiltinType::Unknown);
        assert_eq!(ty.collection_key_type(), Some(&PropertyType::string()));
        assert_eq!(
            ty.collection_value_type().and_then(PropertyType::class_name),
            Some("App\\Entity\\Author")
        );
    }

    #[test]
    fn test_unrecognized_builtin_is_unknown() {
        let ty: PropertyType = serde_json::from_str(r#"{"builtin": "iterable"}"#).unwrap();
        assert_eq!(ty.builtin(), &BuiltinType::Unknown);
    }
}
