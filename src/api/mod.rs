//! Resources exposed by the server and the router that serves them.

pub mod common;
pub mod users;

use std::sync::Arc;

use axum::Router;

use crate::settings::Settings;
use crate::versioning::ApiVersioning;

/// Creates the router for every versioned resource.
#[tracing::instrument(name = "create_api_router", skip(settings))]
pub async fn create_api_router(settings: &Settings) -> anyhow::Result<Router> {
    tracing::info!(
        strict_transforms = settings.strict_transforms,
        "Creating versioned API router"
    );

    let user_store = Arc::new(users::seed_store().await?);
    let (user, user_transforms) = users::user_resource(user_store);

    let router = ApiVersioning::new()
        .strict_transforms(settings.strict_transforms)
        .resource(user)
        .transforms(user_transforms)
        .build()?;

    Ok(router)
}
