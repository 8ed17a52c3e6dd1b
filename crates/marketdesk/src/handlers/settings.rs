use axum::{extract::State, Json};

use crate::app::AppState;
use crate::auth::require_role;
use crate::error::DeskError;
use crate::storage::*;
use marketdesk_models::*;

pub async fn get_settings(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<SyncSettings>, DeskError> {
    require_role(state.storage.as_ref(), &identity, Role::Cmo)?;
    Ok(Json(state.storage.get_sync_settings()?))
}

/// `sync_time` must be `HH:MM` on a 24h clock; anything else is a 400.
pub async fn update_settings(
    State(state): State<AppState>,
    identity: Identity,
    Json(input): Json<UpdateSyncSettings>,
) -> Result<Json<SyncSettings>, DeskError> {
    let profile = require_role(state.storage.as_ref(), &identity, Role::Cmo)?;
    let settings = state
        .storage
        .set_sync_time(input.sync_time.trim(), &profile.id)?;
    tracing::info!(user_id = %profile.id, sync_time = ?settings.sync_time, "sync time updated");
    Ok(Json(settings))
}
