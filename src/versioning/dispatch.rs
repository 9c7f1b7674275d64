//! Registration and lookup of legacy-version transforms.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::errors::{AppError, ConfigError};
use crate::store::ActionInput;
use crate::versioning::media_type::media_type;
use crate::versioning::registry::VersionConfig;

/// The versioned blueprint actions of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Find,
    FindOne,
    Create,
    Update,
    Destroy,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Find,
        ActionKind::FindOne,
        ActionKind::Create,
        ActionKind::Update,
        ActionKind::Destroy,
    ];

    /// Lowercase name used in transform identifiers.
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Find => "find",
            ActionKind::FindOne => "findone",
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Destroy => "destroy",
        }
    }

    pub fn method(self) -> Method {
        match self {
            ActionKind::Find | ActionKind::FindOne => Method::GET,
            ActionKind::Create => Method::POST,
            ActionKind::Update => Method::PATCH,
            ActionKind::Destroy => Method::DELETE,
        }
    }

    pub fn has_id(self) -> bool {
        matches!(
            self,
            ActionKind::FindOne | ActionKind::Update | ActionKind::Destroy
        )
    }

    /// Canonical axum path template for this action on `resource`.
    pub fn path(self, resource: &str) -> String {
        if self.has_id() {
            format!("/{resource}/:id")
        } else {
            format!("/{resource}")
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `resource` can stand as a literal segment of a route path.
pub fn is_plain_segment(resource: &str) -> bool {
    !resource.is_empty()
        && resource
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.~".contains(c))
}

/// `{versionTag}{CapitalizedResourceName}{lowercaseActionName}`, e.g. `v2Userfind`.
pub fn handler_name(version: &str, resource: &str, action: ActionKind) -> String {
    let lower = resource.to_lowercase();
    let mut chars = lower.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{version}{capitalized}{}", action.name())
}

/// Type-erased async transform.
pub type TransformFn =
    Arc<dyn Fn(ActionInput) -> BoxFuture<'static, Result<Value, AppError>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformKey {
    pub version: String,
    pub resource: String,
    pub action: ActionKind,
}

impl TransformKey {
    pub fn new(version: &str, resource: &str, action: ActionKind) -> Self {
        Self {
            version: version.to_string(),
            resource: resource.to_string(),
            action,
        }
    }

    pub fn handler_name(&self) -> String {
        handler_name(&self.version, &self.resource, self.action)
    }
}

/// Mutable collection of transforms, filled by the host before startup.
#[derive(Default, Clone)]
pub struct TransformRegistry {
    transforms: HashMap<TransformKey, TransformFn>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, version: &str, resource: &str, action: ActionKind, transform: F)
    where
        F: Fn(ActionInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        let key = TransformKey::new(version, resource, action);
        let transform: TransformFn = Arc::new(move |input| transform(input).boxed());
        if self.transforms.insert(key.clone(), transform).is_some() {
            tracing::warn!(handler = %key.handler_name(), "Transform registered twice, keeping the last one");
        }
    }

    /// Adds every transform of `other`; on a clash `other` wins.
    pub fn merge(&mut self, other: TransformRegistry) {
        self.transforms.extend(other.transforms);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub(crate) fn into_inner(self) -> HashMap<TransformKey, TransformFn> {
        self.transforms
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.transforms.keys().map(TransformKey::handler_name).collect();
        names.sort();
        f.debug_struct("TransformRegistry").field("transforms", &names).finish()
    }
}

/// Immutable lookup table for one resource, built once at startup.
#[derive(Clone)]
pub struct DispatchTable {
    resource: String,
    transforms: HashMap<(String, ActionKind), TransformFn>,
}

impl DispatchTable {
    /// Takes the transforms of `resource` out of `pending` and checks every
    /// non-latest `(version, action)` pair has one.
    ///
    /// A gap is logged and left to fail per request, unless `strict` is set.
    pub fn build(
        resource: &str,
        config: &VersionConfig,
        pending: &mut HashMap<TransformKey, TransformFn>,
        strict: bool,
    ) -> Result<Self, ConfigError> {
        let keys: Vec<TransformKey> = pending
            .keys()
            .filter(|key| key.resource == resource)
            .cloned()
            .collect();

        let mut transforms = HashMap::new();
        for key in keys {
            if !config.declares(&key.version) {
                return Err(ConfigError::UnknownVersion {
                    resource: resource.to_string(),
                    version: key.version.clone(),
                    handler: key.handler_name(),
                });
            }
            if config.is_latest(&key.version) {
                return Err(ConfigError::TransformForLatest {
                    resource: resource.to_string(),
                    version: key.version.clone(),
                    handler: key.handler_name(),
                });
            }
            if let Some(transform) = pending.remove(&key) {
                transforms.insert((key.version, key.action), transform);
            }
        }

        for version in config.versions() {
            if config.is_latest(version) {
                continue;
            }
            for action in ActionKind::ALL {
                if transforms.contains_key(&(version.clone(), action)) {
                    continue;
                }
                let handler = handler_name(version, resource, action);
                let method = action.method();
                let path = action.path(resource);
                let accept = media_type(config.representation_prefix(), version);
                if strict {
                    return Err(ConfigError::MissingTransform {
                        handler,
                        method: method.to_string(),
                        path,
                        accept,
                    });
                }
                tracing::error!(
                    handler = %handler,
                    "No transform defined '{}', required when {} {} is called with Accept '{}'",
                    handler,
                    method,
                    path,
                    accept
                );
            }
        }

        Ok(Self {
            resource: resource.to_string(),
            transforms,
        })
    }

    /// Looks up the transform for a negotiated legacy version.
    pub fn resolve(&self, version: &str, action: ActionKind) -> Result<&TransformFn, AppError> {
        self.transforms
            .get(&(version.to_string(), action))
            .ok_or_else(|| AppError::MissingTransform(handler_name(version, &self.resource, action)))
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("resource", &self.resource)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> VersionConfig {
        VersionConfig::new("user", ["v1", "v2", "v3"], "vnd.example.user").unwrap()
    }

    fn full_registry() -> TransformRegistry {
        let mut registry = TransformRegistry::new();
        for version in ["v1", "v2"] {
            for action in ActionKind::ALL {
                registry.register(version, "user", action, move |_| async move {
                    Ok(json!({ "version": version, "action": action.name() }))
                });
            }
        }
        registry
    }

    #[test]
    fn handler_names_follow_the_convention() {
        assert_eq!(handler_name("v2", "user", ActionKind::Find), "v2Userfind");
        assert_eq!(handler_name("v1", "FOO", ActionKind::FindOne), "v1Foofindone");
        assert_eq!(handler_name("v1", "userProfile", ActionKind::Destroy), "v1Userprofiledestroy");
    }

    #[test]
    fn actions_map_to_canonical_routes() {
        let routes: Vec<_> = ActionKind::ALL
            .iter()
            .map(|a| format!("{} {}", a.method(), a.path("user")))
            .collect();
        assert_eq!(
            routes,
            ["GET /user", "GET /user/:id", "POST /user", "PATCH /user/:id", "DELETE /user/:id"]
        );
    }

    #[tokio::test]
    async fn resolves_registered_transforms() {
        let mut pending = full_registry().into_inner();
        let table = DispatchTable::build("user", &config(), &mut pending, true).unwrap();
        assert_eq!(table.len(), 10);
        assert!(pending.is_empty());

        let transform = table.resolve("v2", ActionKind::Update).unwrap();
        let out = transform(ActionInput::default()).await.unwrap();
        assert_eq!(out, json!({ "version": "v2", "action": "update" }));
    }

    #[test]
    fn missing_transform_is_reported_at_request_time() {
        let mut pending = TransformRegistry::new().into_inner();
        let table = DispatchTable::build("foo", &config(), &mut pending, false).unwrap();

        match table.resolve("v2", ActionKind::Find) {
            Err(err @ AppError::MissingTransform(_)) => {
                assert!(err.to_string().contains("'v2Foofind'"));
            }
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("transform should be missing"),
        }
    }

    #[test]
    fn strict_mode_fails_on_the_first_gap() {
        let mut pending = TransformRegistry::new().into_inner();
        let err = DispatchTable::build("user", &config(), &mut pending, true).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingTransform {
                handler: "v1Userfind".into(),
                method: "GET".into(),
                path: "/user".into(),
                accept: "application/vnd.example.user.v1+json".into(),
            }
        );
    }

    #[test]
    fn transform_for_latest_or_unknown_version_is_rejected() {
        let mut registry = TransformRegistry::new();
        registry.register("v3", "user", ActionKind::Find, |_| async { Ok(Value::Null) });
        let err = DispatchTable::build("user", &config(), &mut registry.into_inner(), false).unwrap_err();
        assert!(matches!(err, ConfigError::TransformForLatest { .. }));

        let mut registry = TransformRegistry::new();
        registry.register("v9", "user", ActionKind::Find, |_| async { Ok(Value::Null) });
        let err = DispatchTable::build("user", &config(), &mut registry.into_inner(), false).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVersion { .. }));
    }

    #[test]
    fn other_resources_are_left_pending() {
        let mut registry = full_registry();
        registry.register("v1", "group", ActionKind::Find, |_| async { Ok(Value::Null) });
        let mut pending = registry.into_inner();
        DispatchTable::build("user", &config(), &mut pending, true).unwrap();
        assert_eq!(pending.len(), 1);
    }
}
