use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{Withdrawal, WithdrawalStatus};
use crate::error::{PensionError, Result};

/// Broker queues used by the withdrawal flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    RequestedWithdrawal,
    ConfirmedWithdrawal,
    RejectedWithdrawal,
}

impl Topic {
    pub const ALL: [Topic; 3] = [
        Topic::RequestedWithdrawal,
        Topic::ConfirmedWithdrawal,
        Topic::RejectedWithdrawal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::RequestedWithdrawal => "requested-withdrawal",
            Topic::ConfirmedWithdrawal => "confirmed-withdrawal",
            Topic::RejectedWithdrawal => "rejected-withdrawal",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Topic {
    type Err = PensionError;

    fn from_str(raw: &str) -> Result<Self> {
        Topic::ALL
            .into_iter()
            .find(|t| t.as_str() == raw)
            .ok_or_else(|| PensionError::Broker(format!("unknown topic '{}'", raw)))
    }
}

/// Payload shared by the three withdrawal topics.
///
/// `key` carries the transaction id for broker-side partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalEvent {
    pub key: Uuid,
    pub transaction_id: Uuid,
    pub withdrawal_id: Uuid,
    pub user_key: String,
    pub contract_number: String,
    pub pension_plan_id: Uuid,
    pub value: i64,
    pub redeemable_value: i64,
    pub request_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WithdrawalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_date: Option<DateTime<Utc>>,
}

impl WithdrawalEvent {
    /// Base payload for `requested-withdrawal` / `rejected-withdrawal`
    pub fn from_withdrawal(withdrawal: &Withdrawal, user_key: &str, contract_number: &str) -> Self {
        Self {
            key: withdrawal.transaction_id,
            transaction_id: withdrawal.transaction_id,
            withdrawal_id: withdrawal.id,
            user_key: user_key.to_string(),
            contract_number: contract_number.to_string(),
            pension_plan_id: withdrawal.pension_plan_id,
            value: withdrawal.requested_value.amount(),
            redeemable_value: withdrawal.redeemable_value.amount(),
            request_date: withdrawal.request_date.format("%Y-%m-%d").to_string(),
            status: None,
            rejection_reason: withdrawal.rejection_reason.clone(),
            confirmation_date: None,
        }
    }

    /// Payload for `confirmed-withdrawal`, carrying the outcome
    pub fn confirmed(withdrawal: &Withdrawal, user_key: &str, contract_number: &str) -> Self {
        Self {
            status: Some(withdrawal.status),
            confirmation_date: withdrawal.confirmation_date,
            ..Self::from_withdrawal(withdrawal, user_key, contract_number)
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}
