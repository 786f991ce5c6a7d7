//! Trim handlers.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::{Extension, Json};
use serde_json::{json, Value};
use tracing::{info, warn};

use recut_models::TrimRequest;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{RequestId, TRIM_STRATEGY_HEADER};
use crate::state::AppState;

/// Liveness of the trim route itself.
pub async fn trim_status() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Cut `[start, end]` out of `url` and return the clip as MP4 bytes.
///
/// The body is parsed by hand so that malformed JSON gets the same
/// `invalid payload` response as a structurally wrong object.
pub async fn trim(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<Response> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(request_id = %request_id, error = %e, "Trim body is not JSON");
        ApiError::invalid_payload(e.to_string())
    })?;
    let request = TrimRequest::from_value(&value).map_err(|e| {
        warn!(request_id = %request_id, error = %e, "Rejected trim payload");
        ApiError::invalid_payload(e.to_string())
    })?;

    // held until the response is built
    let _permit = match &state.trim_slots {
        Some(slots) => Some(
            slots
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| ApiError::internal("trim admission closed"))?,
        ),
        None => None,
    };

    let outcome = state.pipeline.run(&request, &request_id).await?;
    info!(
        request_id = %request_id,
        strategy = outcome.strategy,
        bytes = outcome.clip.len(),
        "Returning clip"
    );

    let disposition = content_disposition(&outcome.clip.suggested_filename)?;
    let length = outcome.clip.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, outcome.clip.mime_type)
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(TRIM_STRATEGY_HEADER, outcome.strategy)
        .body(Body::from(outcome.clip.bytes))
        .map_err(|e| ApiError::internal(e.to_string()))
}

fn content_disposition(filename: &str) -> ApiResult<HeaderValue> {
    let safe: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .map_err(|e| ApiError::internal(format!("bad clip filename: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_quotes_filename() {
        assert_eq!(
            content_disposition("clip.mp4").unwrap(),
            "attachment; filename=\"clip.mp4\""
        );
        assert_eq!(
            content_disposition("a\"b.mp4").unwrap(),
            "attachment; filename=\"a_b.mp4\""
        );
    }
}
