//! Synchronous publish endpoint.

use axum::extract::{Form, Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::{bad_request, ApiError};
use crate::app::AppState;

/// Publish parameters, readable from the query string or an urlencoded form
/// body. Both fields are optional here; `message` is validated as required
/// after the two sources are merged.
#[derive(Debug, Default, Deserialize)]
pub struct PublishParams {
    /// Record payload. Required; may be empty.
    pub message: Option<String>,
    /// Optional record key; absent means broker-default partitioning.
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: DateTime<Utc>,
}

/// `POST /api/kafka/publish/{topic}` — send one record and block until the
/// broker acknowledges its placement. No retries; failures surface
/// immediately. Parameters are taken from the query string, falling back to
/// an `application/x-www-form-urlencoded` body per field.
pub async fn publish(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Query(query): Query<PublishParams>,
    form: Option<Form<PublishParams>>,
) -> Result<Json<PublishResponse>, ApiError> {
    let form = form.map(|Form(params)| params).unwrap_or_default();
    let message = query
        .message
        .or(form.message)
        .ok_or_else(|| bad_request("missing required parameter: message"))?;
    let key = query.key.or(form.key);
    debug!(%topic, key = ?key, "publish request");
    let placement = state
        .publisher
        .publish(&topic, key.as_deref(), &message)
        .await?;
    Ok(Json(PublishResponse {
        topic: placement.topic,
        partition: placement.partition,
        offset: placement.offset,
        timestamp: placement.timestamp,
    }))
}
