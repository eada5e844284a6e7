//! Real-time subscription addressing
//!
//! Generates the topic IRI a subscriber listens on and the hub URL it
//! connects to.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host used in topic IRIs when the request has none
pub const DEFAULT_HOST: &str = "api-platform.com";

/// Scheme used in topic IRIs when the request has none
pub const DEFAULT_SCHEME: &str = "https";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Unknown hub: {0}")]
    UnknownHub(String),
}

/// Scheme and host of the request being served
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub host: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
        }
    }
}

impl RequestContext {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// An `http` context for `host`
    pub fn for_host(host: impl Into<String>) -> Self {
        Self::new("http", host)
    }
}

/// Named hubs with a default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubRegistry {
    default_hub: String,
    hubs: HashMap<String, String>,
}

impl HubRegistry {
    pub fn new(default_hub_url: impl Into<String>) -> Self {
        Self {
            default_hub: default_hub_url.into(),
            hubs: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_hub(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.hubs.insert(name.into(), url.into());
        self
    }

    /// URL of the hub named `name`, or of the default hub
    pub fn hub_url(&self, name: Option<&str>) -> Result<&str, SubscriptionError> {
        match name {
            None => Ok(&self.default_hub),
            Some(name) => self
                .hubs
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| SubscriptionError::UnknownHub(name.to_string())),
        }
    }
}

/// Where hub URLs come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubSource {
    /// A single hub URL; hub names are ignored
    Url(String),
    Registry(HubRegistry),
}

impl From<HubRegistry> for HubSource {
    fn from(registry: HubRegistry) -> Self {
        HubSource::Registry(registry)
    }
}

impl From<&str> for HubSource {
    fn from(url: &str) -> Self {
        HubSource::Url(url.to_string())
    }
}

/// Builds subscription topic IRIs and hub URLs
#[derive(Debug, Clone)]
pub struct SubscriptionIriGenerator {
    request_context: RequestContext,
    hubs: HubSource,
}

impl SubscriptionIriGenerator {
    pub fn new(request_context: RequestContext, hubs: impl Into<HubSource>) -> Self {
        Self {
            request_context,
            hubs: hubs.into(),
        }
    }

    /// `{scheme}://{host}/subscriptions/{subscription_id}`
    pub fn generate_topic_iri(&self, subscription_id: &str) -> String {
        let scheme = match self.request_context.scheme.as_str() {
            "" => DEFAULT_SCHEME,
            scheme => scheme,
        };
        let host = match self.request_context.host.as_str() {
            "" => DEFAULT_HOST,
            host => host,
        };
        format!("{scheme}://{host}/subscriptions/{subscription_id}")
    }

    /// Hub URL subscribing to the topic of `subscription_id`
    pub fn generate_hub_url(
        &self,
        subscription_id: &str,
        hub: Option<&str>,
    ) -> Result<String, SubscriptionError> {
        let hub_url = match &self.hubs {
            HubSource::Url(url) => url.as_str(),
            HubSource::Registry(registry) => registry.hub_url(hub)?,
        };
        Ok(format!(
            "{hub_url}?topic={}",
            self.generate_topic_iri(subscription_id)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_HUB: &str = "https://demo.mercure.rocks/hub";
    const MANAGED_HUB: &str = "https://demo.mercure.rocks/managed";

    fn registry() -> HubRegistry {
        HubRegistry::new(DEFAULT_HUB)
            .with_hub("default", DEFAULT_HUB)
            .with_hub("managed", MANAGED_HUB)
    }

    #[test]
    fn test_topic_iri() {
        let generator = SubscriptionIriGenerator::new(RequestContext::for_host("example.com"), registry());
        assert_eq!(
            generator.generate_topic_iri("subscription-id"),
            "http://example.com/subscriptions/subscription-id"
        );
    }

    #[test]
    fn test_default_topic_iri() {
        let generator = SubscriptionIriGenerator::new(RequestContext::new("", ""), registry());
        assert_eq!(
            generator.generate_topic_iri("subscription-id"),
            "https://api-platform.com/subscriptions/subscription-id"
        );
    }

    #[test]
    fn test_single_hub_url() {
        let generator = SubscriptionIriGenerator::new(
            RequestContext::for_host("example.com"),
            "https://example.com/.well-known/mercure",
        );
        assert_eq!(
            generator.generate_hub_url("subscription-id", Some("ignored")).unwrap(),
            "https://example.com/.well-known/mercure?topic=http://example.com/subscriptions/subscription-id"
        );
    }

    #[test]
    fn test_registry_hub_urls() {
        let generator = SubscriptionIriGenerator::new(RequestContext::for_host("example.com"), registry());
        let topic = "http://example.com/subscriptions/subscription-id";

        assert_eq!(
            generator.generate_hub_url("subscription-id", None).unwrap(),
            format!("{DEFAULT_HUB}?topic={topic}")
        );
        assert_eq!(
            generator.generate_hub_url("subscription-id", Some("default")).unwrap(),
            format!("{DEFAULT_HUB}?topic={topic}")
        );
        assert_eq!(
            generator.generate_hub_url("subscription-id", Some("managed")).unwrap(),
            format!("{MANAGED_HUB}?topic={topic}")
        );
        assert_eq!(
            generator.generate_hub_url("subscription-id", Some("missing")),
            Err(SubscriptionError::UnknownHub("missing".to_string()))
        );
    }
}
