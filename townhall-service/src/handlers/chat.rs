use axum::{extract::rejection::JsonRejection, Json};
use tracing::info;

use super::body;
use crate::chat::{self, ChatReply};
use crate::error::ApiError;
use crate::types::ChatRequest;

/// POST /api/chat
pub async fn chat(payload: Result<Json<ChatRequest>, JsonRejection>) -> Result<Json<ChatReply>, ApiError> {
    let req = body(payload)?;
    let reply = chat::respond(&req.messages, req.municipality_name.as_deref())?;
    info!(
        "POST /api/chat - {} messages, municipality={:?}",
        req.messages.len(),
        req.municipality_name
    );
    Ok(Json(reply))
}
