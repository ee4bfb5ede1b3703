use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /users/:user_key/withdrawals`; the value is in major units
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub requested_value: Decimal,
    pub contract_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: i64,
    pub version: String,
}
