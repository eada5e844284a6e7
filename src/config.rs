//! Configuration management for schema generation
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (resource-schema.toml)
//! - Environment variables (RESOURCE_SCHEMA__*)
//!
//! ## Example config file (resource-schema.toml):
//! ```toml
//! [schema]
//! version = "openapi"
//! openapi_version = "3.0.2"
//! default_format = "json"
//!
//! [value_types]
//! date_time = ["App\\Clock\\Moment"]
//! uuid = ["App\\Id\\Ulid"]
//!
//! [metadata]
//! paths = ["config/resources.toml"]
//!
//! [security]
//! exception_on_no_token = true
//!
//! [[security.role_hierarchy]]
//! role = "ROLE_ADMIN"
//! reachable = ["ROLE_USER"]
//!
//! [subscriptions]
//! default_hub = "https://example.com/.well-known/mercure"
//!
//! [[subscriptions.hubs]]
//! name = "managed"
//! url = "https://example.com/managed"
//! ```
//!
//! Role and hub names are given as values: the config loader folds table
//! keys to lowercase.

use config_crate::{Config, ConfigError, Environment, File};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::document::SchemaVersion;
use crate::error::Result;
use crate::security::RoleHierarchy;
use crate::subscription::{HubRegistry, HubSource, RequestContext};
use crate::value_types::{ValueFormat, ValueTypeRegistry};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema output settings
    #[serde(default)]
    pub schema: OutputConfig,

    /// Extra value-type markers
    #[serde(default)]
    pub value_types: ValueTypesConfig,

    /// Class metadata sources
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Access control settings
    #[serde(default)]
    pub security: SecurityConfig,

    /// Real-time subscription settings
    #[serde(default)]
    pub subscriptions: SubscriptionConfig,
}

/// Schema output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Target vocabulary
    #[serde(default)]
    pub version: SchemaVersion,

    /// OpenAPI version advertised by exported documents
    #[serde(default = "default_openapi_version")]
    pub openapi_version: String,

    /// Serialization format used when none is requested
    #[serde(default = "default_format")]
    pub default_format: String,
}

/// Additional marker classes per value format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueTypesConfig {
    #[serde(default)]
    pub date_time: Vec<String>,

    #[serde(default)]
    pub duration: Vec<String>,

    #[serde(default)]
    pub uuid: Vec<String>,
}

/// Metadata configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Metadata files (TOML or JSON), loaded in order
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Fail when no token is available instead of evaluating anonymously
    #[serde(default = "default_true")]
    pub exception_on_no_token: bool,

    /// Roles reachable from other roles
    #[serde(default)]
    pub role_hierarchy: Vec<RoleEntry>,
}

/// One role and the roles it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub role: String,
    #[serde(default)]
    pub reachable: Vec<String>,
}

/// A named hub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubEntry {
    pub name: String,
    pub url: String,
}

/// Subscription configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Default hub URL
    #[serde(default)]
    pub default_hub: Option<String>,

    /// Named hubs
    #[serde(default)]
    pub hubs: Vec<HubEntry>,

    /// Scheme used in topic IRIs
    #[serde(default)]
    pub scheme: String,

    /// Host used in topic IRIs
    #[serde(default)]
    pub host: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_openapi_version() -> String {
    "3.0.2".to_string()
}

fn default_format() -> String {
    "json".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            version: SchemaVersion::default(),
            openapi_version: default_openapi_version(),
            default_format: default_format(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            exception_on_no_token: true,
            role_hierarchy: Vec::new(),
        }
    }
}

impl SchemaConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "resource-schema.toml",
            ".resource-schema.toml",
            "config/resource-schema.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "resource-schema", "resource-schema") {
            let xdg_config = config_dir.config_dir().join("resource-schema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (RESOURCE_SCHEMA__*)
        builder = builder.add_source(
            Environment::with_prefix("RESOURCE_SCHEMA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Parsed OpenAPI version
    pub fn openapi_version(&self) -> Result<Version> {
        let raw = self.schema.openapi_version.trim();
        Ok(Version::parse(raw.strip_prefix('v').unwrap_or(raw))?)
    }

    /// Target vocabulary; OpenAPI 2.x is emitted as Swagger
    pub fn schema_version(&self) -> Result<SchemaVersion> {
        if self.schema.version == SchemaVersion::OpenApi && self.openapi_version()?.major < 3 {
            return Ok(SchemaVersion::Swagger);
        }
        Ok(self.schema.version)
    }

    /// Built-in value types plus the configured markers
    pub fn value_type_registry(&self) -> ValueTypeRegistry {
        let mut registry = ValueTypeRegistry::default();
        for (markers, format) in [
            (&self.value_types.date_time, ValueFormat::DateTime),
            (&self.value_types.duration, ValueFormat::Duration),
            (&self.value_types.uuid, ValueFormat::Uuid),
        ] {
            for marker in markers {
                registry.register(marker.clone(), format);
            }
        }
        registry
    }

    /// Role hierarchy; entries repeating a role are merged
    pub fn role_hierarchy(&self) -> RoleHierarchy {
        let mut hierarchy: HashMap<String, Vec<String>> = HashMap::new();
        for entry in &self.security.role_hierarchy {
            hierarchy
                .entry(entry.role.clone())
                .or_default()
                .extend(entry.reachable.iter().cloned());
        }
        RoleHierarchy(hierarchy)
    }

    /// Hub source for subscription URLs, if a default hub is configured
    pub fn hub_source(&self) -> Option<HubSource> {
        let default_hub = self.subscriptions.default_hub.as_ref()?;
        if self.subscriptions.hubs.is_empty() {
            return Some(HubSource::Url(default_hub.clone()));
        }
        let registry = self
            .subscriptions
            .hubs
            .iter()
            .fold(HubRegistry::new(default_hub.clone()), |registry, hub| {
                registry.with_hub(hub.name.clone(), hub.url.clone())
            });
        Some(HubSource::Registry(registry))
    }

    /// Request context for topic IRIs; empty values fall back to defaults
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(
            self.subscriptions.scheme.clone(),
            self.subscriptions.host.clone(),
        )
    }
}
