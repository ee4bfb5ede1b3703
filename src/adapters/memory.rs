//! In-memory adapters for local runs and tests

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::traits::{BalanceCache, PensionPlanRepository, UserRepository, WithdrawalRepository};
use crate::domain::{Contribution, PensionPlan, PlanType, User, Withdrawal};
use crate::error::{PensionError, Result};

#[derive(Debug, Clone)]
struct PlanRow {
    id: Uuid,
    user_id: Uuid,
    // stored as the type code, parsed on load like a database column
    plan_type: String,
    contract_number: String,
    start_date: NaiveDate,
}

/// Thread-safe store backing all three repositories
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    users: Arc<DashMap<String, User>>,
    plans: Arc<DashMap<(Uuid, String), PlanRow>>,
    contributions: Arc<DashMap<Uuid, Vec<Contribution>>>,
    withdrawals: Arc<DashMap<Uuid, Vec<(u64, Withdrawal)>>>,
    seq: Arc<AtomicU64>,
    yield_rate: Option<Decimal>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield rate stamped on every loaded plan
    pub fn with_yield_rate(mut self, yield_rate: Decimal) -> Self {
        self.yield_rate = Some(yield_rate);
        self
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.key.clone(), user);
    }

    /// Register a plan for a user; contract numbers are unique per user
    pub fn insert_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        plan_type: PlanType,
        contract_number: &str,
        start_date: NaiveDate,
    ) -> Result<()> {
        self.insert_plan_row(user_id, plan_id, plan_type.as_str(), contract_number, start_date)
    }

    #[cfg(test)]
    pub(crate) fn insert_plan_with_type_code(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        type_code: &str,
        contract_number: &str,
        start_date: NaiveDate,
    ) -> Result<()> {
        self.insert_plan_row(user_id, plan_id, type_code, contract_number, start_date)
    }

    fn insert_plan_row(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        type_code: &str,
        contract_number: &str,
        start_date: NaiveDate,
    ) -> Result<()> {
        let key = (user_id, contract_number.to_string());
        if self.plans.contains_key(&key) {
            return Err(PensionError::Validation(format!(
                "contract number {} already exists for user {}",
                contract_number, user_id
            )));
        }
        self.plans.insert(
            key,
            PlanRow {
                id: plan_id,
                user_id,
                plan_type: type_code.to_string(),
                contract_number: contract_number.to_string(),
                start_date,
            },
        );
        Ok(())
    }

    pub fn insert_contribution(&self, plan_id: Uuid, contribution: Contribution) {
        self.contributions
            .entry(plan_id)
            .or_default()
            .push(contribution);
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<User>> {
        Ok(self.users.get(key).map(|u| u.clone()))
    }
}

#[async_trait]
impl PensionPlanRepository for MemoryStore {
    async fn find_by_user_and_contract(
        &self,
        user_id: Uuid,
        contract_number: &str,
    ) -> Result<Option<PensionPlan>> {
        let Some(row) = self
            .plans
            .get(&(user_id, contract_number.to_string()))
            .map(|r| r.clone())
        else {
            return Ok(None);
        };
        debug_assert_eq!(row.user_id, user_id);
        let plan_type: PlanType = row.plan_type.parse()?;

        let contributions = self
            .contributions
            .get(&row.id)
            .map(|c| c.clone())
            .unwrap_or_default();
        let withdrawals = self
            .withdrawals
            .get(&row.id)
            .map(|records| records.iter().map(|(_, w)| w.clone()).collect())
            .unwrap_or_default();

        let plan = PensionPlan::new(
            row.id,
            plan_type,
            row.contract_number,
            row.start_date,
            contributions,
            withdrawals,
        );
        Ok(Some(match self.yield_rate {
            Some(rate) => plan.with_yield_rate(rate),
            None => plan,
        }))
    }
}

#[async_trait]
impl WithdrawalRepository for MemoryStore {
    async fn append(&self, withdrawal: &Withdrawal) -> Result<()> {
        let seq = self.next_seq();
        self.withdrawals
            .entry(withdrawal.pension_plan_id)
            .or_default()
            .push((seq, withdrawal.clone()));
        Ok(())
    }

    async fn find_by_transaction_id(&self, transaction_id: Uuid) -> Result<Vec<Withdrawal>> {
        let mut records: Vec<(u64, Withdrawal)> = self
            .withdrawals
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|(_, w)| w.transaction_id == transaction_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        records.sort_by_key(|(seq, _)| *seq);
        Ok(records.into_iter().map(|(_, w)| w).collect())
    }
}

/// Side cache with per-entry expiry
#[derive(Debug, Default, Clone)]
pub struct MemoryBalanceCache {
    entries: Arc<DashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryBalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl BalanceCache for MemoryBalanceCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now();
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.value().1 > now)
            .map(|entry| entry.value().0.clone());
        if hit.is_none() {
            self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| PensionError::Cache(format!("invalid ttl: {}", e)))?;
        self.entries
            .insert(key.to_string(), (value.to_string(), Utc::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
