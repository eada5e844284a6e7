//! Serialization context threaded through schema builds

use serde::{Deserialize, Serialize};

/// Serializer settings a schema is built for.
///
/// Groups restrict which properties appear; they also become part of the
/// definition name, so the same class built for different groups yields
/// distinct definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializationContext {
    #[serde(default)]
    pub groups: Vec<String>,

    /// When false, object definitions are closed with `additionalProperties: false`
    #[serde(default = "default_true")]
    pub allow_extra_attributes: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SerializationContext {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            allow_extra_attributes: true,
        }
    }
}

impl SerializationContext {
    pub fn with_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn deny_extra_attributes(mut self) -> Self {
        self.allow_extra_attributes = false;
        self
    }

    pub fn has_groups(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Whether a property tagged with `property_groups` is serialized.
    /// Without context groups every property is.
    pub fn includes(&self, property_groups: &[String]) -> bool {
        !self.has_groups() || property_groups.iter().any(|g| self.groups.contains(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_visibility() {
        let context = SerializationContext::with_groups(["book:read"]);
        assert!(context.includes(&["book:read".to_string(), "admin".to_string()]));
        assert!(!context.includes(&["book:write".to_string()]));
        assert!(!context.includes(&[]));

        let open = SerializationContext::default();
        assert!(open.includes(&[]));
        assert!(open.allow_extra_attributes);
    }
}
