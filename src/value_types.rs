//! Well-known value classes rendered as formatted strings

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceClassResolver;

/// String format a value class is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueFormat {
    DateTime,
    Duration,
    Uuid,
}

impl ValueFormat {
    /// JSON Schema `format` keyword value
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueFormat::DateTime => "date-time",
            ValueFormat::Duration => "duration",
            ValueFormat::Uuid => "uuid",
        }
    }
}

impl fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DATE_TIME_MARKERS: &[&str] = &[
    "DateTimeInterface",
    "DateTime",
    "DateTimeImmutable",
    "chrono::DateTime",
    "chrono::NaiveDateTime",
    "java.time.Instant",
    "java.time.OffsetDateTime",
];

const DURATION_MARKERS: &[&str] = &[
    "DateInterval",
    "std::time::Duration",
    "chrono::Duration",
    "java.time.Duration",
];

const UUID_MARKERS: &[&str] = &[
    "Ramsey\\Uuid\\UuidInterface",
    "Symfony\\Component\\Uid\\Uuid",
    "uuid::Uuid",
    "java.util.UUID",
];

/// Registry of marker classes mapped to their string format.
///
/// A class matches when it, or one of the ancestors its resolver declares,
/// is a registered marker.
#[derive(Debug, Clone)]
pub struct ValueTypeRegistry {
    markers: HashMap<String, ValueFormat>,
}

impl Default for ValueTypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (markers, format) in [
            (DATE_TIME_MARKERS, ValueFormat::DateTime),
            (DURATION_MARKERS, ValueFormat::Duration),
            (UUID_MARKERS, ValueFormat::Uuid),
        ] {
            for marker in markers {
                registry.register(*marker, format);
            }
        }
        registry
    }
}

impl ValueTypeRegistry {
    /// Registry with the built-in markers
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no markers at all
    pub fn empty() -> Self {
        Self {
            markers: HashMap::new(),
        }
    }

    /// Register (or re-map) a marker class
    pub fn register(&mut self, class_name: impl Into<String>, format: ValueFormat) {
        self.markers.insert(class_name.into(), format);
    }

    /// Format of the class itself, ignoring ancestry
    pub fn direct_format(&self, class_name: &str) -> Option<ValueFormat> {
        self.markers
            .get(class_name.trim_start_matches('\\'))
            .copied()
    }

    /// Format of `class_name` or its nearest registered ancestor
    pub fn format_for(
        &self,
        class_name: &str,
        resolver: &dyn ResourceClassResolver,
    ) -> Option<ValueFormat> {
        self.direct_format(class_name).or_else(|| {
            resolver
                .ancestors(class_name)
                .iter()
                .find_map(|ancestor| self.direct_format(ancestor))
        })
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::StaticResourceClasses;

    #[test]
    fn test_builtin_markers() {
        let registry = ValueTypeRegistry::new();
        assert_eq!(registry.direct_format("DateTimeImmutable"), Some(ValueFormat::DateTime));
        assert_eq!(registry.direct_format("\\DateInterval"), Some(ValueFormat::Duration));
        assert_eq!(
            registry.direct_format("Ramsey\\Uuid\\UuidInterface"),
            Some(ValueFormat::Uuid)
        );
        assert_eq!(registry.direct_format("App\\Entity\\Book"), None);
    }

    #[test]
    fn test_ancestor_marker_matches() {
        let registry = ValueTypeRegistry::new();
        let resolver = StaticResourceClasses::default()
            .with_parents("App\\Clock\\Moment", ["DateTimeInterface"]);

        assert_eq!(
            registry.format_for("App\\Clock\\Moment", &resolver),
            Some(ValueFormat::DateTime)
        );
    }

    #[test]
    fn test_host_registration() {
        let mut registry = ValueTypeRegistry::empty();
        assert!(registry.is_empty());

        registry.register("App\\Id\\Ulid", ValueFormat::Uuid);
        assert_eq!(registry.direct_format("App\\Id\\Ulid"), Some(ValueFormat::Uuid));
        assert_eq!(registry.len(), 1);
    }
}
