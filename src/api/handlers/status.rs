use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::{error::api_error, state::AppState};
use crate::services::StatusEntry;

/// GET /status/:transaction_id
pub async fn get_status(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> std::result::Result<Json<Vec<StatusEntry>>, (StatusCode, String)> {
    let transaction_id = Uuid::parse_str(&transaction_id).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid transaction id: {}", transaction_id),
        )
    })?;

    let entries = state
        .status
        .execute(transaction_id)
        .await
        .map_err(api_error)?;

    Ok(Json(entries))
}
