use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::api::{error::balance_error, state::AppState};

/// GET /users/:user_key/balance/:contract_number
///
/// The body is the cached JSON when present, so it is passed through as-is.
pub async fn get_balance(
    State(state): State<AppState>,
    Path((user_key, contract_number)): Path<(String, String)>,
) -> std::result::Result<impl IntoResponse, (StatusCode, String)> {
    let body = state
        .balances
        .get_balance(&user_key, &contract_number)
        .await
        .map_err(balance_error)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}
