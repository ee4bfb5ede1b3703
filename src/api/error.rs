use axum::http::StatusCode;
use tracing::error;

use crate::error::PensionError;

/// Map a service error to the status code and body returned to clients
pub fn api_error(err: PensionError) -> (StatusCode, String) {
    let status = match &err {
        PensionError::NotFound(_) => StatusCode::NOT_FOUND,
        PensionError::Conflict(_) | PensionError::InvalidStateTransition { .. } => {
            StatusCode::CONFLICT
        }
        PensionError::InvalidAmount(_) | PensionError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("request failed: {}", err);
    }
    (status, err.to_string())
}

/// Like `api_error`, but amount errors on the balance path come from stored
/// data (an overdrawn plan) and map to 500
pub fn balance_error(err: PensionError) -> (StatusCode, String) {
    match err {
        PensionError::InvalidAmount(_) => {
            error!("balance computation failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        other => api_error(other),
    }
}
