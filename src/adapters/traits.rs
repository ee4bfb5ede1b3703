use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{PensionPlan, User, Withdrawal};
use crate::error::Result;
use crate::messaging::Topic;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_key(&self, key: &str) -> Result<Option<User>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PensionPlanRepository: Send + Sync {
    /// Plan with its contributions and withdrawal records loaded
    async fn find_by_user_and_contract(
        &self,
        user_id: Uuid,
        contract_number: &str,
    ) -> Result<Option<PensionPlan>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WithdrawalRepository: Send + Sync {
    /// Append one record; records are never updated in place
    async fn append(&self, withdrawal: &Withdrawal) -> Result<()>;

    /// Every record of a transaction, in insertion order
    async fn find_by_transaction_id(&self, transaction_id: Uuid) -> Result<Vec<Withdrawal>>;
}

/// Side cache holding serialized values under string keys
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Publishing side of the message broker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: Topic, payload: Vec<u8>) -> Result<()>;
}

/// Consuming side: one handler per subscribed topic.
///
/// `Ok` acknowledges the delivery. An error is redelivered when
/// `PensionError::is_retryable` holds and dropped otherwise.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, payload: &[u8]) -> Result<()>;
}
