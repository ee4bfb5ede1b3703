//! Broker consumers for the three withdrawal topics

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{Topic, WithdrawalEvent};
use crate::adapters::{EventPublisher, MessageHandler};
use crate::error::Result;
use crate::services::{BalanceQuery, WithdrawalConfirmation};

/// Confirms requested withdrawals and announces the outcome
pub struct RequestedWithdrawalConsumer {
    confirmation: Arc<WithdrawalConfirmation>,
    publisher: Arc<dyn EventPublisher>,
}

impl RequestedWithdrawalConsumer {
    pub fn new(confirmation: Arc<WithdrawalConfirmation>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            confirmation,
            publisher,
        }
    }
}

#[async_trait]
impl MessageHandler for RequestedWithdrawalConsumer {
    fn name(&self) -> &'static str {
        "requested-withdrawal-consumer"
    }

    #[instrument(skip_all, name = "requested_withdrawal")]
    async fn handle(&self, payload: &[u8]) -> Result<()> {
        let event = WithdrawalEvent::decode(payload)?;
        info!(transaction_id = %event.transaction_id, "processing withdrawal confirmation");

        let confirmed = self
            .confirmation
            .confirm(
                event.withdrawal_id,
                event.transaction_id,
                &event.user_key,
                &event.contract_number,
            )
            .await
            .inspect_err(|e| {
                warn!(transaction_id = %event.transaction_id, "confirmation failed: {}", e)
            })?;

        let outcome = WithdrawalEvent::confirmed(&confirmed, &event.user_key, &event.contract_number);
        self.publisher
            .publish(Topic::ConfirmedWithdrawal, outcome.encode()?)
            .await
    }
}

/// Drops the cached balance of a plan once a withdrawal is confirmed
pub struct ConfirmedWithdrawalConsumer {
    balances: Arc<BalanceQuery>,
}

impl ConfirmedWithdrawalConsumer {
    pub fn new(balances: Arc<BalanceQuery>) -> Self {
        Self { balances }
    }
}

#[async_trait]
impl MessageHandler for ConfirmedWithdrawalConsumer {
    fn name(&self) -> &'static str {
        "confirmed-withdrawal-consumer"
    }

    #[instrument(skip_all, name = "confirmed_withdrawal")]
    async fn handle(&self, payload: &[u8]) -> Result<()> {
        let event = WithdrawalEvent::decode(payload)?;
        self.balances
            .invalidate(&event.user_key, &event.contract_number)
            .await?;
        info!(
            transaction_id = %event.transaction_id,
            contract_number = %event.contract_number,
            "balance cache invalidated"
        );
        Ok(())
    }
}

/// Terminal sink for rejections
#[derive(Debug, Default)]
pub struct RejectedWithdrawalConsumer;

#[async_trait]
impl MessageHandler for RejectedWithdrawalConsumer {
    fn name(&self) -> &'static str {
        "rejected-withdrawal-consumer"
    }

    async fn handle(&self, payload: &[u8]) -> Result<()> {
        let event = WithdrawalEvent::decode(payload)?;
        warn!(
            transaction_id = %event.transaction_id,
            user_key = %event.user_key,
            reason = event.rejection_reason.as_deref().unwrap_or("unknown"),
            "withdrawal rejected"
        );
        Ok(())
    }
}
