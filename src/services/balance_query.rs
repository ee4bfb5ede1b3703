//! Cache-aside balance reads
//!
//! A hit returns the stored JSON untouched. A miss computes the balance from
//! the plan and stores it for `ttl`. Only confirmations invalidate.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::plan_lookup::resolve_plan;
use crate::adapters::{BalanceCache, PensionPlanRepository, UserRepository};
use crate::domain::BalanceDto;
use crate::error::Result;

pub fn balance_cache_key(user_key: &str, contract_number: &str) -> String {
    format!("balance:{}:{}", user_key, contract_number)
}

pub struct BalanceQuery {
    users: Arc<dyn UserRepository>,
    plans: Arc<dyn PensionPlanRepository>,
    cache: Arc<dyn BalanceCache>,
    ttl: Duration,
}

impl BalanceQuery {
    pub fn new(
        users: Arc<dyn UserRepository>,
        plans: Arc<dyn PensionPlanRepository>,
        cache: Arc<dyn BalanceCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            users,
            plans,
            cache,
            ttl,
        }
    }

    /// Serialized `BalanceDto` for the plan
    #[instrument(skip(self))]
    pub async fn get_balance(&self, user_key: &str, contract_number: &str) -> Result<String> {
        let key = balance_cache_key(user_key, contract_number);

        // A broken cache degrades to recomputation rather than failing reads
        match self.cache.get(&key).await {
            Ok(Some(cached)) => {
                debug!("balance cache hit");
                return Ok(cached);
            }
            Ok(None) => debug!("balance cache miss"),
            Err(e) => warn!("balance cache read failed: {}", e),
        }

        let (_, plan) =
            resolve_plan(self.users.as_ref(), self.plans.as_ref(), user_key, contract_number)
                .await?;
        let balance = plan.calculate_balance()?;
        let body = serde_json::to_string(&BalanceDto::from(&balance))?;

        if let Err(e) = self.cache.set(&key, &body, self.ttl).await {
            warn!("balance cache write failed: {}", e);
        }
        Ok(body)
    }

    /// Drop the cached balance after a confirmed withdrawal
    #[instrument(skip(self))]
    pub async fn invalidate(&self, user_key: &str, contract_number: &str) -> Result<()> {
        self.cache
            .delete(&balance_cache_key(user_key, contract_number))
            .await
    }
}
