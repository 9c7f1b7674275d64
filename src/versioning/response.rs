use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::versioning::media_type::MediaType;

/// The success response for every versioned action.
///
/// When a media type is forced it becomes the `Content-Type`, whatever the
/// body serializer chose. A missing body yields a bare 200.
pub fn respond_ok(forced: Option<&MediaType>, body: Option<Value>) -> Response {
    let mut response = match body {
        Some(body) => (StatusCode::OK, Json(body)).into_response(),
        None => StatusCode::OK.into_response(),
    };

    if let Some(media) = forced {
        tracing::trace!(content_type = %media, "Forcing negotiated content type");
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, media.header_value());
    }

    response
}
