use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::DeskError;
use crate::storage::*;
use marketdesk_models::*;

pub async fn me(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Value>, DeskError> {
    match identity {
        Identity::User { id, email } => {
            let profile = state.storage.get_profile(&id)?;
            Ok(Json(json!({
                "type": "user",
                "id": id,
                "email": email,
                "profile": profile,
            })))
        }
        Identity::Anonymous => Ok(Json(json!({
            "type": "anonymous",
        }))),
    }
}
