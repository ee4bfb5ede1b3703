use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::services::{BalanceQuery, CheckStatusUseCase, Metrics, WithdrawalRequestUseCase};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub balances: Arc<BalanceQuery>,
    pub withdrawals: Arc<WithdrawalRequestUseCase>,
    pub status: Arc<CheckStatusUseCase>,
    pub metrics: Arc<Metrics>,
    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        balances: Arc<BalanceQuery>,
        withdrawals: Arc<WithdrawalRequestUseCase>,
        status: Arc<CheckStatusUseCase>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            balances,
            withdrawals,
            status,
            metrics,
            start_time: Utc::now(),
        }
    }
}
