use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error as StdError;

/// Startup-time defects in a resource's versioning setup.
///
/// These are never recovered: `ApiVersioning::build` returns them and the
/// host is expected to refuse to serve.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config problem: model '{resource}' needs the 'versionConfig' field defined")]
    MissingVersionConfig { resource: String },

    #[error("Config problem: {resource}.versionConfig must be a plain object/dict")]
    MalformedVersionConfig { resource: String },

    #[error("Config problem: {resource}.versionConfig needs the 'versions' field defined as string[]")]
    MissingVersionsList { resource: String },

    #[error("Config problem: {resource}.versionConfig.versions must be a list")]
    InvalidVersionsList { resource: String },

    #[error("Config problem: {resource}.versionConfig.versions[{index}] should be of type 'string'")]
    InvalidVersionType { resource: String, index: usize },

    #[error("Config problem: {resource}.versionConfig.versions should have at least one element")]
    EmptyVersionsList { resource: String },

    #[error("Config problem: {resource}.versionConfig needs the 'representationPrefix' field defined as string")]
    MissingPrefix { resource: String },

    #[error("Config problem: {resource}.versionConfig.representationPrefix should be of type 'string'")]
    InvalidPrefixType { resource: String },

    #[error("Config problem: {resource}.versionConfig.versions declares '{version}' more than once")]
    DuplicateVersion { resource: String, version: String },

    #[error("Config problem: {resource}.versionConfig.versions has an invalid tag: {source}")]
    InvalidVersionTag {
        resource: String,
        #[source]
        source: MediaTypeError,
    },

    #[error("Config problem: {resource}.versionConfig.representationPrefix is invalid: {source}")]
    InvalidPrefix {
        resource: String,
        #[source]
        source: MediaTypeError,
    },

    #[error("Config problem: resource '{resource}' is declared more than once")]
    DuplicateResource { resource: String },

    #[error("Config problem: resource name '{resource}' is not a plain path segment")]
    InvalidResourceName { resource: String },

    #[error("Config problem: transform '{handler}' targets unknown resource '{resource}'")]
    UnknownResource { resource: String, handler: String },

    #[error("Config problem: transform '{handler}' targets version '{version}' which {resource} does not declare")]
    UnknownVersion {
        resource: String,
        version: String,
        handler: String,
    },

    #[error("Config problem: transform '{handler}' targets '{version}', the latest version of {resource}, which is always served natively")]
    TransformForLatest {
        resource: String,
        version: String,
        handler: String,
    },

    #[error("Config problem: no transform defined '{handler}', required for {method} {path} with Accept '{accept}'")]
    MissingTransform {
        handler: String,
        method: String,
        path: String,
        accept: String,
    },
}

/// Rejected media-type building blocks.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("'{0}' must not be empty")]
    Empty(&'static str),

    #[error("'{value}' contains '{found}', which is not allowed in a media type {part}")]
    InvalidCharacter {
        part: &'static str,
        value: String,
        found: char,
    },
}

/// Per-request failures, rendered as JSON responses.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("We have no representation to satisfy '{accept}'")]
    NotAcceptable {
        accept: String,
        supported_types: Vec<String>,
    },

    #[error("No transform defined '{0}', implement it to serve this representation")]
    MissingTransform(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotAcceptable { .. } => (StatusCode::NOT_ACCEPTABLE, self.to_string()),
            AppError::MissingTransform(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unexpected(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An unexpected error occurred: {}", e),
            ),
        };

        // 406 is ordinary negotiation traffic, everything else is worth an error line
        if status == StatusCode::NOT_ACCEPTABLE {
            tracing::debug!(
                error_message = %error_message,
                status_code = %status,
                "Request not acceptable"
            );
        } else {
            tracing::error!(
                error_type = ?self,
                error_message = %error_message,
                status_code = %status,
                "Request error"
            );
        }

        if let AppError::Unexpected(e) = &self {
            let mut source_chain = String::new();
            let mut current_err: Option<&(dyn StdError + 'static)> = Some(e.as_ref());
            while let Some(err) = current_err {
                source_chain.push_str(&format!("\n  Caused by: {}", err));
                current_err = err.source();
            }
            if !source_chain.is_empty() {
                tracing::error!("Unexpected error source chain:{}", source_chain);
            }
        }

        let body = match self {
            AppError::NotAcceptable {
                supported_types, ..
            } => Json(json!({
                "status": status.as_u16(),
                "message": error_message,
                "supportedTypes": supported_types,
            })),
            _ => Json(json!({
                "message": error_message,
                "status": status.as_u16()
            })),
        };
        (status, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("Invalid JSON body: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[tokio::test]
    async fn unexpected_error_renders_outermost_message() {
        let err: anyhow::Error = Err::<(), _>(std::io::Error::other("disk gone"))
            .context("reading user store")
            .unwrap_err();
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({ "message": "An unexpected error occurred: reading user store", "status": 500 })
        );
    }
}
