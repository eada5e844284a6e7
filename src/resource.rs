//! Resource class classification

use std::collections::{HashMap, HashSet};

/// Tells the compiler which classes are top-level API resources.
pub trait ResourceClassResolver {
    /// Whether `class_name` is an independently addressable resource
    fn is_resource_class(&self, class_name: &str) -> bool;

    /// Parent classes and interfaces `class_name` declares, nearest first.
    /// Used to match value-type markers against a class's ancestry.
    fn ancestors(&self, class_name: &str) -> Vec<String> {
        let _ = class_name;
        Vec::new()
    }
}

/// In-memory resolver over a fixed set of resource classes
#[derive(Debug, Clone, Default)]
pub struct StaticResourceClasses {
    resources: HashSet<String>,
    parents: HashMap<String, Vec<String>>,
}

impl StaticResourceClasses {
    pub fn new<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resources: resources.into_iter().map(Into::into).collect(),
            parents: HashMap::new(),
        }
    }

    /// Declare the direct parents of `class_name`
    #[must_use]
    pub fn with_parents<I, S>(mut self, class_name: &str, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents.insert(
            class_name.to_string(),
            parents.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl ResourceClassResolver for StaticResourceClasses {
    fn is_resource_class(&self, class_name: &str) -> bool {
        self.resources.contains(class_name)
    }

    fn ancestors(&self, class_name: &str) -> Vec<String> {
        collect_ancestors(class_name, |name| self.parents.get(name).cloned())
    }
}

/// Walk declared parents breadth first, skipping anything already seen
pub(crate) fn collect_ancestors<F>(class_name: &str, direct_parents: F) -> Vec<String>
where
    F: Fn(&str) -> Option<Vec<String>>,
{
    let mut seen: HashSet<String> = HashSet::from([class_name.to_string()]);
    let mut out = Vec::new();
    let mut queue = vec![class_name.to_string()];

    while !queue.is_empty() {
        let mut next = Vec::new();
        for name in queue {
            for parent in direct_parents(&name).unwrap_or_default() {
                if seen.insert(parent.clone()) {
                    out.push(parent.clone());
                    next.push(parent);
                }
            }
        }
        queue = next;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resources() {
        let resolver = StaticResourceClasses::new(["App\\Entity\\Book"]);
        assert!(resolver.is_resource_class("App\\Entity\\Book"));
        assert!(!resolver.is_resource_class("App\\Entity\\Address"));
    }

    #[test]
    fn test_ancestors_are_transitive_and_cycle_safe() {
        let resolver = StaticResourceClasses::default()
            .with_parents("App\\Clock\\Moment", ["App\\Clock\\BaseMoment"])
            .with_parents("App\\Clock\\BaseMoment", ["DateTimeInterface", "App\\Clock\\Moment"]);

        assert_eq!(
            resolver.ancestors("App\\Clock\\Moment"),
            vec!["App\\Clock\\BaseMoment".to_string(), "DateTimeInterface".to_string()]
        );
        assert!(resolver.ancestors("Unrelated").is_empty());
    }
}
