//! Accept-header API versioning.
//!
//! Every resource that declares a version list gets one route per blueprint
//! action. Each route negotiates the representation from the `Accept`
//! header: the latest version is served by the resource's own store, older
//! versions by registered transforms.
//!
//! ```text
//! versioning/
//! ├── registry     - VersionConfig loading and validation
//! ├── media_type   - (prefix, tag) <-> application/{prefix}.{tag}+json
//! ├── negotiate    - Accept header matching
//! ├── dispatch     - ActionKind, transform registry and lookup table
//! ├── gateway      - per-resource request gateway and routes
//! └── response     - success response with the negotiated content type
//! ```

pub mod dispatch;
pub mod gateway;
pub mod media_type;
pub mod negotiate;
pub mod registry;
pub mod response;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use axum::Router;
use serde_json::Value;

use crate::errors::{AppError, ConfigError};
use crate::store::{ActionInput, ResourceStore};

pub use dispatch::{handler_name, ActionKind, DispatchTable, TransformRegistry};
pub use gateway::ResourceGateway;
pub use media_type::{media_type, parse_version_tag, MediaType};
pub use negotiate::{negotiate, AcceptHeader, Negotiation};
pub use registry::{load_version_config, VersionConfig};
pub use response::respond_ok;

/// A resource as the host defines it. Without a version declaration the
/// resource is left alone.
pub struct ResourceDefinition {
    pub name: String,
    pub version_config: Option<Value>,
    pub store: Arc<dyn ResourceStore>,
}

impl ResourceDefinition {
    pub fn new(name: impl Into<String>, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            name: name.into(),
            version_config: None,
            store,
        }
    }

    pub fn with_version_config(mut self, raw: Value) -> Self {
        self.version_config = Some(raw);
        self
    }
}

/// Collects resources and transforms, then binds the versioned routes once.
#[derive(Default)]
pub struct ApiVersioning {
    resources: Vec<ResourceDefinition>,
    transforms: TransformRegistry,
    strict_transforms: bool,
}

impl ApiVersioning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat a missing transform as a startup error instead of logging it.
    pub fn strict_transforms(mut self, strict: bool) -> Self {
        self.strict_transforms = strict;
        self
    }

    pub fn resource(mut self, resource: ResourceDefinition) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn transform<F, Fut>(
        mut self,
        version: &str,
        resource: &str,
        action: ActionKind,
        transform: F,
    ) -> Self
    where
        F: Fn(ActionInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        self.transforms.register(version, resource, action, transform);
        self
    }

    pub fn transforms(mut self, registry: TransformRegistry) -> Self {
        self.transforms.merge(registry);
        self
    }

    /// Validates every declaration and builds the routes.
    #[tracing::instrument(name = "bind_versioned_routes", skip(self), fields(resources = self.resources.len(), transforms = self.transforms.len()))]
    pub fn build(self) -> Result<Router, ConfigError> {
        let mut pending = self.transforms.into_inner();
        let mut seen = HashSet::new();
        let mut router = Router::new();

        for resource in self.resources {
            if !seen.insert(resource.name.clone()) {
                return Err(ConfigError::DuplicateResource {
                    resource: resource.name,
                });
            }

            if resource.version_config.is_none() {
                tracing::debug!(
                    "Model '{}' doesn't define the 'versionConfig' key, *not* enabling API versioning for this model.",
                    resource.name
                );
                continue;
            }

            if !dispatch::is_plain_segment(&resource.name) {
                return Err(ConfigError::InvalidResourceName {
                    resource: resource.name,
                });
            }

            let config = load_version_config(&resource.name, resource.version_config.as_ref())?;
            let dispatch = DispatchTable::build(
                &resource.name,
                &config,
                &mut pending,
                self.strict_transforms,
            )?;
            let gateway = ResourceGateway::new(&resource.name, config, resource.store, dispatch)?;
            tracing::info!(
                resource = %gateway.name(),
                versions = ?gateway.config().versions(),
                latest = %gateway.config().latest_version(),
                "API versioning enabled"
            );
            router = router.merge(Arc::new(gateway).into_router());
        }

        if let Some(key) = pending.keys().next() {
            return Err(ConfigError::UnknownResource {
                resource: key.resource.clone(),
                handler: key.handler_name(),
            });
        }

        Ok(router)
    }
}
