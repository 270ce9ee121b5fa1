//! Publish endpoint.

use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

use crate::error::RelayResult;
use crate::protocol::PublishAck;
use crate::state::AppState;

/// Relay one envelope to all observers.
///
/// POST /broadcast
///
/// Responds `{"ok":true}` once fan-out has been attempted, regardless of how
/// many observers actually took the frame. A malformed body yields 400.
pub async fn publish_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> RelayResult<Json<PublishAck>> {
    state.publish(&body)?;
    Ok(Json(PublishAck::accepted()))
}
