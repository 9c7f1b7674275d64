//! The single route-bound entry point per resource action.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap},
    response::Response,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use bytes::Bytes;
use serde_json::Value;

use crate::errors::{AppError, ConfigError};
use crate::store::{run_native, ActionInput, ResourceStore};
use crate::versioning::dispatch::{ActionKind, DispatchTable};
use crate::versioning::media_type::MediaType;
use crate::versioning::negotiate::{negotiate, Negotiation};
use crate::versioning::registry::VersionConfig;
use crate::versioning::response::respond_ok;

/// Everything the gateway needs to serve one versioned resource.
pub struct ResourceGateway {
    name: String,
    config: VersionConfig,
    candidates: Vec<MediaType>,
    latest: MediaType,
    store: Arc<dyn ResourceStore>,
    dispatch: DispatchTable,
}

impl std::fmt::Debug for ResourceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGateway")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

impl ResourceGateway {
    pub fn new(
        name: &str,
        config: VersionConfig,
        store: Arc<dyn ResourceStore>,
        dispatch: DispatchTable,
    ) -> Result<Self, ConfigError> {
        let candidates = config.media_types();
        let latest = config
            .latest_media_type()
            .ok_or_else(|| ConfigError::EmptyVersionsList {
                resource: name.to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            config,
            candidates,
            latest,
            store,
            dispatch,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &VersionConfig {
        &self.config
    }

    /// Negotiates, then serves natively or through the legacy transform.
    #[tracing::instrument(name = "versioned_request", skip(self, action, input), fields(resource = %self.name, action = %action))]
    pub async fn handle(
        &self,
        action: ActionKind,
        accept: Option<&str>,
        input: ActionInput,
    ) -> Result<Response, AppError> {
        tracing::trace!(accept = ?accept, "Negotiating representation");

        match negotiate(accept, &self.candidates, &self.latest)? {
            Negotiation::Latest(media) => {
                let body = run_native(self.store.as_ref(), action, input).await?;
                Ok(respond_ok(Some(&media), body))
            }
            Negotiation::Legacy(media) => {
                let transform = self.dispatch.resolve(media.version(), action)?;
                let body = transform(input).await?;
                Ok(respond_ok(Some(&media), Some(body)))
            }
        }
    }

    /// One route per action at its canonical path.
    pub fn into_router(self: Arc<Self>) -> Router {
        ActionKind::ALL
            .into_iter()
            .fold(Router::new(), |router, action| {
                let path = action.path(&self.name);
                tracing::debug!("Applying API versioning to '{} {}' route", action.method(), path);
                router.route(&path, gateway_route(self.clone(), action))
            })
    }
}

/// All `Accept` field lines, combined into one list as HTTP allows.
fn accept_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<_> = headers
        .get_all(header::ACCEPT)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();
    (!values.is_empty()).then(|| values.join(", "))
}

fn gateway_route(gateway: Arc<ResourceGateway>, action: ActionKind) -> MethodRouter {
    let filter = match action {
        ActionKind::Find | ActionKind::FindOne => MethodFilter::GET,
        ActionKind::Create => MethodFilter::POST,
        ActionKind::Update => MethodFilter::PATCH,
        ActionKind::Destroy => MethodFilter::DELETE,
    };

    on(
        filter,
        move |headers: HeaderMap,
              id: Option<Path<String>>,
              Query(query): Query<HashMap<String, String>>,
              body: Bytes| {
            let gateway = gateway.clone();
            async move {
                let accept = accept_header(&headers);
                let body = if body.is_empty() {
                    None
                } else {
                    Some(serde_json::from_slice::<Value>(&body)?)
                };
                let input = ActionInput {
                    id: id.map(|Path(id)| id),
                    query,
                    body,
                };
                gateway.handle(action, accept.as_deref(), input).await
            }
        },
    )
}
