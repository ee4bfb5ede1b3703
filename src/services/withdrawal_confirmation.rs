//! Second phase of a withdrawal: confirm a PENDING record exactly once.
//!
//! Delivery is at-least-once, so the same confirmation can arrive again
//! after the transaction already reached a terminal state. A repeated
//! confirmation of a CONFIRMED transaction is answered with a compensating
//! REJECTED record and a `rejected-withdrawal` event; a REJECTED transaction
//! is left untouched. Both surface as `Conflict`, which the broker drops.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::plan_lookup::resolve_plan;
use super::Metrics;
use crate::adapters::{EventPublisher, PensionPlanRepository, UserRepository, WithdrawalRepository};
use crate::domain::{
    transaction_status, ConfirmationDecision, Withdrawal, ALREADY_CONFIRMED_REASON,
    ALREADY_REJECTED_REASON,
};
use crate::error::{NotFound, PensionError, Result};
use crate::messaging::{Topic, WithdrawalEvent};

pub struct WithdrawalConfirmation {
    users: Arc<dyn UserRepository>,
    plans: Arc<dyn PensionPlanRepository>,
    withdrawals: Arc<dyn WithdrawalRepository>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
}

impl WithdrawalConfirmation {
    pub fn new(
        users: Arc<dyn UserRepository>,
        plans: Arc<dyn PensionPlanRepository>,
        withdrawals: Arc<dyn WithdrawalRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            users,
            plans,
            withdrawals,
            publisher,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub async fn confirm(
        &self,
        withdrawal_id: Uuid,
        transaction_id: Uuid,
        user_key: &str,
        contract_number: &str,
    ) -> Result<Withdrawal> {
        self.confirm_at(
            withdrawal_id,
            transaction_id,
            user_key,
            contract_number,
            Utc::now(),
        )
        .await
    }

    #[instrument(skip(self, now))]
    pub async fn confirm_at(
        &self,
        withdrawal_id: Uuid,
        transaction_id: Uuid,
        user_key: &str,
        contract_number: &str,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal> {
        let started = Instant::now();
        let (user, plan) = resolve_plan(
            self.users.as_ref(),
            self.plans.as_ref(),
            user_key,
            contract_number,
        )
        .await?;

        let record = plan
            .find_withdrawal(withdrawal_id)
            .filter(|w| w.transaction_id == transaction_id)
            .ok_or(NotFound::Withdrawal(withdrawal_id))?;

        let current = transaction_status(record, &plan.withdrawals);
        match ConfirmationDecision::decide(current) {
            ConfirmationDecision::Confirm => {
                let confirmed = record.confirm(now)?;
                self.withdrawals.append(&confirmed).await?;
                self.metrics.inc_confirmed(started.elapsed());
                info!(
                    transaction_id = %confirmed.transaction_id,
                    "withdrawal confirmed"
                );
                Ok(confirmed)
            }
            ConfirmationDecision::RejectDuplicate => {
                let rejection = record.compensating_rejection(ALREADY_CONFIRMED_REASON);
                self.withdrawals.append(&rejection).await?;
                self.metrics.inc_duplicate();
                let event =
                    WithdrawalEvent::from_withdrawal(&rejection, &user.key, &plan.contract_number);
                self.publisher
                    .publish(Topic::RejectedWithdrawal, event.encode()?)
                    .await?;
                warn!(%transaction_id, "duplicate confirmation rejected");
                Err(PensionError::Conflict(ALREADY_CONFIRMED_REASON.to_string()))
            }
            ConfirmationDecision::AlreadyRejected => {
                self.metrics.inc_already_rejected();
                warn!(%transaction_id, "confirmation of a rejected withdrawal ignored");
                Err(PensionError::Conflict(ALREADY_REJECTED_REASON.to_string()))
            }
        }
    }
}
