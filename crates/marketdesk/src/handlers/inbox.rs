use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::require_user;
use crate::error::DeskError;
use crate::storage::*;
use marketdesk_models::*;

pub async fn list_inbox(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Vec<InboxItem>>, DeskError> {
    let user_id = require_user(&identity)?;
    let items = state
        .storage
        .inbox(user_id, query.unread.unwrap_or(false))?;
    Ok(Json(items))
}

pub async fn ack(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<Json<Value>, DeskError> {
    let user_id = require_user(&identity)?;
    if state.storage.ack_notification(user_id, id)? {
        Ok(Json(json!({"ok": true})))
    } else {
        Err(DeskError::NotFound("Notification not found".into()))
    }
}

pub async fn ack_all(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Value>, DeskError> {
    let user_id = require_user(&identity)?;
    let acked = state.storage.ack_all_notifications(user_id)?;
    Ok(Json(json!({"ok": true, "acked": acked})))
}
