use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Money;
use crate::error::{PensionError, Result};

pub const INSUFFICIENT_FUNDS_REASON: &str = "Requested value is higher than the available";
pub const ALREADY_CONFIRMED_REASON: &str = "Withdrawal already confirmed";
pub const ALREADY_REJECTED_REASON: &str = "Withdrawal already rejected";

/// Withdrawal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WithdrawalStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "PENDING",
            WithdrawalStatus::Confirmed => "CONFIRMED",
            WithdrawalStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Confirmed | WithdrawalStatus::Rejected
        )
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = PensionError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(WithdrawalStatus::Pending),
            "CONFIRMED" => Ok(WithdrawalStatus::Confirmed),
            "REJECTED" => Ok(WithdrawalStatus::Rejected),
            other => Err(PensionError::Validation(format!(
                "unknown withdrawal status '{}'",
                other
            ))),
        }
    }
}

/// One immutable version of a withdrawal.
///
/// Every lifecycle transition yields a new record with a fresh `id` and the
/// same `transaction_id`; the store only ever appends. The history of a
/// withdrawal attempt is the ordered sequence of records sharing a
/// transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub pension_plan_id: Uuid,
    pub requested_value: Money,
    pub redeemable_value: Money,
    pub request_date: DateTime<Utc>,
    pub status: WithdrawalStatus,
    pub rejection_reason: Option<String>,
    pub confirmation_date: Option<DateTime<Utc>>,
}

impl Withdrawal {
    /// New withdrawal attempt awaiting confirmation
    pub fn pending(
        pension_plan_id: Uuid,
        requested_value: Money,
        redeemable_value: Money,
        request_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            pension_plan_id,
            requested_value,
            redeemable_value,
            request_date,
            status: WithdrawalStatus::Pending,
            rejection_reason: None,
            confirmation_date: None,
        }
    }

    /// New withdrawal attempt rejected at request time
    pub fn rejected(
        pension_plan_id: Uuid,
        requested_value: Money,
        redeemable_value: Money,
        request_date: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: WithdrawalStatus::Rejected,
            rejection_reason: Some(reason.into()),
            ..Self::pending(pension_plan_id, requested_value, redeemable_value, request_date)
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == WithdrawalStatus::Confirmed
    }

    pub fn is_rejected(&self) -> bool {
        self.status == WithdrawalStatus::Rejected
    }

    /// Next version in CONFIRMED state. Only valid from PENDING.
    pub fn confirm(&self, at: DateTime<Utc>) -> Result<Withdrawal> {
        self.ensure_pending(WithdrawalStatus::Confirmed)?;
        Ok(Withdrawal {
            status: WithdrawalStatus::Confirmed,
            confirmation_date: Some(at),
            ..self.next_version()
        })
    }

    /// Next version in REJECTED state. Only valid from PENDING.
    pub fn reject(&self, reason: impl Into<String>) -> Result<Withdrawal> {
        self.ensure_pending(WithdrawalStatus::Rejected)?;
        Ok(self.rejection_record(reason))
    }

    /// REJECTED record appended to a transaction that already terminated,
    /// used to record a refused duplicate confirmation.
    pub fn compensating_rejection(&self, reason: impl Into<String>) -> Withdrawal {
        self.rejection_record(reason)
    }

    fn rejection_record(&self, reason: impl Into<String>) -> Withdrawal {
        Withdrawal {
            status: WithdrawalStatus::Rejected,
            rejection_reason: Some(reason.into()),
            confirmation_date: None,
            ..self.next_version()
        }
    }

    fn next_version(&self) -> Withdrawal {
        Withdrawal {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    fn ensure_pending(&self, to: WithdrawalStatus) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(PensionError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            })
        }
    }
}

/// Outcome of an incoming confirm action against a transaction's status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationDecision {
    /// Transition the pending withdrawal to CONFIRMED
    Confirm,
    /// Transaction already confirmed: record a rejection and report a conflict
    RejectDuplicate,
    /// Transaction already rejected: nothing to confirm
    AlreadyRejected,
}

impl ConfirmationDecision {
    pub fn decide(current: WithdrawalStatus) -> Self {
        match current {
            WithdrawalStatus::Pending => ConfirmationDecision::Confirm,
            WithdrawalStatus::Confirmed => ConfirmationDecision::RejectDuplicate,
            WithdrawalStatus::Rejected => ConfirmationDecision::AlreadyRejected,
        }
    }
}

/// Effective status of the transaction `record` belongs to.
///
/// CONFIRMED as soon as any record of the transaction is confirmed, so a
/// redelivered message naming the original PENDING record is still caught.
pub fn transaction_status(record: &Withdrawal, history: &[Withdrawal]) -> WithdrawalStatus {
    let confirmed = history
        .iter()
        .any(|w| w.transaction_id == record.transaction_id && w.is_confirmed());
    if confirmed {
        WithdrawalStatus::Confirmed
    } else {
        record.status
    }
}
