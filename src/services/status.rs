use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::adapters::WithdrawalRepository;
use crate::domain::{Withdrawal, WithdrawalStatus};
use crate::error::{NotFound, Result};

/// One record of a transaction's history; values are in minor units
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub transaction_id: Uuid,
    pub pension_plan_id: Uuid,
    pub requested_value: i64,
    pub redeemable_value: i64,
    pub request_date: DateTime<Utc>,
    pub status: WithdrawalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_date: Option<DateTime<Utc>>,
}

impl From<&Withdrawal> for StatusEntry {
    fn from(w: &Withdrawal) -> Self {
        Self {
            transaction_id: w.transaction_id,
            pension_plan_id: w.pension_plan_id,
            requested_value: w.requested_value.amount(),
            redeemable_value: w.redeemable_value.amount(),
            request_date: w.request_date,
            status: w.status,
            rejection_reason: w.rejection_reason.clone(),
            confirmation_date: w.confirmation_date,
        }
    }
}

pub struct CheckStatusUseCase {
    withdrawals: Arc<dyn WithdrawalRepository>,
}

impl CheckStatusUseCase {
    pub fn new(withdrawals: Arc<dyn WithdrawalRepository>) -> Self {
        Self { withdrawals }
    }

    /// Full history of a transaction, oldest record first
    #[instrument(skip(self))]
    pub async fn execute(&self, transaction_id: Uuid) -> Result<Vec<StatusEntry>> {
        let records = self.withdrawals.find_by_transaction_id(transaction_id).await?;
        if records.is_empty() {
            return Err(NotFound::Transaction.into());
        }
        Ok(records.iter().map(StatusEntry::from).collect())
    }
}
