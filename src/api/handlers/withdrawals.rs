use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::{error::api_error, state::AppState, types::WithdrawalRequest};
use crate::domain::Money;
use crate::services::WithdrawalResponse;

/// POST /users/:user_key/withdrawals
pub async fn create_withdrawal(
    State(state): State<AppState>,
    Path(user_key): Path<String>,
    Json(request): Json<WithdrawalRequest>,
) -> std::result::Result<Json<WithdrawalResponse>, (StatusCode, String)> {
    let requested = Money::from_major_units(request.requested_value).map_err(api_error)?;

    let response = state
        .withdrawals
        .execute(&user_key, requested, &request.contract_number)
        .await
        .map_err(api_error)?;

    Ok(Json(response))
}
