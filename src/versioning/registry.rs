//! Per-resource version declarations.

use std::collections::HashSet;

use serde_json::Value;

use crate::errors::ConfigError;
use crate::versioning::media_type::{validate_prefix, validate_version_tag, MediaType};

pub const VERSIONS_KEY: &str = "versions";
pub const PREFIX_KEY: &str = "representationPrefix";
/// Older name for [`PREFIX_KEY`], still accepted.
pub const LEGACY_PREFIX_KEY: &str = "vendorPrefix";

/// A validated version declaration: ordered oldest to newest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConfig {
    versions: Vec<String>,
    representation_prefix: String,
}

impl VersionConfig {
    /// Typed constructor for hosts that do not go through JSON.
    pub fn new<I, S>(resource: &str, versions: I, prefix: &str) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let versions: Vec<String> = versions.into_iter().map(Into::into).collect();
        if versions.is_empty() {
            return Err(ConfigError::EmptyVersionsList {
                resource: resource.to_string(),
            });
        }
        Self::checked(resource, versions, prefix.to_string())
    }

    fn checked(
        resource: &str,
        versions: Vec<String>,
        representation_prefix: String,
    ) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for version in &versions {
            validate_version_tag(version).map_err(|source| ConfigError::InvalidVersionTag {
                resource: resource.to_string(),
                source,
            })?;
            if !seen.insert(version.as_str()) {
                return Err(ConfigError::DuplicateVersion {
                    resource: resource.to_string(),
                    version: version.clone(),
                });
            }
        }
        validate_prefix(&representation_prefix).map_err(|source| ConfigError::InvalidPrefix {
            resource: resource.to_string(),
            source,
        })?;

        Ok(Self {
            versions,
            representation_prefix,
        })
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn representation_prefix(&self) -> &str {
        &self.representation_prefix
    }

    pub fn latest_version(&self) -> &str {
        // never empty once constructed
        self.versions.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is_latest(&self, version: &str) -> bool {
        self.latest_version() == version
    }

    pub fn declares(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    /// Candidate media types in declaration order.
    pub fn media_types(&self) -> Vec<MediaType> {
        self.versions
            .iter()
            .filter_map(|v| MediaType::new(&self.representation_prefix, v).ok())
            .collect()
    }

    pub fn latest_media_type(&self) -> Option<MediaType> {
        MediaType::new(&self.representation_prefix, self.latest_version()).ok()
    }
}

/// Validates a raw declaration. The first violation wins.
pub fn load_version_config(resource: &str, raw: Option<&Value>) -> Result<VersionConfig, ConfigError> {
    let owned = || resource.to_string();

    let raw = raw.ok_or_else(|| ConfigError::MissingVersionConfig { resource: owned() })?;
    let map = raw
        .as_object()
        .ok_or_else(|| ConfigError::MalformedVersionConfig { resource: owned() })?;

    let list = match map.get(VERSIONS_KEY) {
        None | Some(Value::Null) => {
            return Err(ConfigError::MissingVersionsList { resource: owned() })
        }
        Some(Value::Array(list)) => list,
        Some(_) => return Err(ConfigError::InvalidVersionsList { resource: owned() }),
    };

    let versions = list
        .iter()
        .enumerate()
        .map(|(index, v)| {
            v.as_str()
                .map(str::to_string)
                .ok_or(ConfigError::InvalidVersionType {
                    resource: owned(),
                    index,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if versions.is_empty() {
        return Err(ConfigError::EmptyVersionsList { resource: owned() });
    }

    let prefix = match map.get(PREFIX_KEY).or_else(|| map.get(LEGACY_PREFIX_KEY)) {
        None | Some(Value::Null) => return Err(ConfigError::MissingPrefix { resource: owned() }),
        Some(Value::String(prefix)) => prefix.clone(),
        Some(_) => return Err(ConfigError::InvalidPrefixType { resource: owned() }),
    };

    VersionConfig::checked(resource, versions, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(raw: Value) -> Result<VersionConfig, ConfigError> {
        load_version_config("user", Some(&raw))
    }

    #[test]
    fn loads_a_valid_declaration() {
        let config = load(json!({
            "versions": ["v1", "v2", "v3"],
            "representationPrefix": "vnd.example.user"
        }))
        .unwrap();

        assert_eq!(config.versions(), ["v1", "v2", "v3"]);
        assert_eq!(config.latest_version(), "v3");
        assert!(config.is_latest("v3"));
        assert!(!config.is_latest("v1"));
        assert_eq!(
            config.latest_media_type().unwrap().as_str(),
            "application/vnd.example.user.v3+json"
        );
        let media: Vec<_> = config.media_types().iter().map(|m| m.to_string()).collect();
        assert_eq!(
            media,
            [
                "application/vnd.example.user.v1+json",
                "application/vnd.example.user.v2+json",
                "application/vnd.example.user.v3+json",
            ]
        );
    }

    #[test]
    fn accepts_the_vendor_prefix_alias() {
        let config = load(json!({ "versions": ["v1"], "vendorPrefix": "vnd.techotom.test.foo" })).unwrap();
        assert_eq!(config.representation_prefix(), "vnd.techotom.test.foo");
        assert_eq!(config.latest_version(), "v1");
    }

    #[test]
    fn missing_declaration_is_rejected() {
        assert_eq!(
            load_version_config("user", None),
            Err(ConfigError::MissingVersionConfig { resource: "user".into() })
        );
    }

    #[test]
    fn validation_order_is_first_violation_wins() {
        let resource = || "user".to_string();
        let cases = [
            (json!(["v1"]), ConfigError::MalformedVersionConfig { resource: resource() }),
            (json!({}), ConfigError::MissingVersionsList { resource: resource() }),
            (
                json!({ "versions": "v1", "representationPrefix": 1 }),
                ConfigError::InvalidVersionsList { resource: resource() },
            ),
            (
                json!({ "versions": ["v1", 2] }),
                ConfigError::InvalidVersionType { resource: resource(), index: 1 },
            ),
            (
                json!({ "versions": [] }),
                ConfigError::EmptyVersionsList { resource: resource() },
            ),
            (
                json!({ "versions": ["v1"] }),
                ConfigError::MissingPrefix { resource: resource() },
            ),
            (
                json!({ "versions": ["v1"], "representationPrefix": ["vnd"] }),
                ConfigError::InvalidPrefixType { resource: resource() },
            ),
            (
                json!({ "versions": ["v1", "v2", "v1"], "representationPrefix": "vnd.x" }),
                ConfigError::DuplicateVersion { resource: resource(), version: "v1".into() },
            ),
        ];

        for (raw, expected) in cases {
            assert_eq!(load(raw.clone()), Err(expected), "input: {raw}");
        }
    }

    #[test]
    fn tags_and_prefix_must_be_media_type_tokens() {
        let err = load(json!({ "versions": ["v1", "v 2"], "representationPrefix": "vnd.x" })).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersionTag { .. }));

        let err = load(json!({ "versions": ["v1"], "representationPrefix": "vnd+x" })).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrefix { .. }));
    }

    #[test]
    fn typed_constructor_runs_the_same_checks() {
        assert!(VersionConfig::new("user", ["v1", "v2"], "vnd.example.user").is_ok());
        assert_eq!(
            VersionConfig::new("user", Vec::<String>::new(), "vnd.example.user"),
            Err(ConfigError::EmptyVersionsList { resource: "user".into() })
        );
        assert!(matches!(
            VersionConfig::new("user", ["v1", "v1"], "vnd.example.user"),
            Err(ConfigError::DuplicateVersion { .. })
        ));
    }
}
