use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

use super::plan_lookup::resolve_plan;
use super::Metrics;
use crate::adapters::{EventPublisher, PensionPlanRepository, UserRepository, WithdrawalRepository};
use crate::domain::{Money, Withdrawal, WithdrawalRequestService, WithdrawalStatus};
use crate::error::Result;
use crate::messaging::{Topic, WithdrawalEvent};

/// Outcome of a withdrawal request; values are in minor units
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResponse {
    pub transaction_id: Uuid,
    pub requested_value: i64,
    pub redeemable_value: i64,
    pub request_date: String,
    pub status: WithdrawalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl From<&Withdrawal> for WithdrawalResponse {
    fn from(w: &Withdrawal) -> Self {
        Self {
            transaction_id: w.transaction_id,
            requested_value: w.requested_value.amount(),
            redeemable_value: w.redeemable_value.amount(),
            request_date: w.request_date.format("%Y-%m-%d").to_string(),
            status: w.status,
            rejection_reason: w.rejection_reason.clone(),
        }
    }
}

/// Request entry point: validate, persist, then hand off to the broker
pub struct WithdrawalRequestUseCase {
    users: Arc<dyn UserRepository>,
    plans: Arc<dyn PensionPlanRepository>,
    withdrawals: Arc<dyn WithdrawalRepository>,
    publisher: Arc<dyn EventPublisher>,
    service: WithdrawalRequestService,
    metrics: Arc<Metrics>,
}

impl WithdrawalRequestUseCase {
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
            service: WithdrawalRequestService::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub async fn execute(
        &self,
        user_key: &str,
        requested: Money,
        contract_number: &str,
    ) -> Result<WithdrawalResponse> {
        self.execute_at(user_key, requested, contract_number, Utc::now())
            .await
    }

    #[instrument(skip(self, requested, now), fields(requested = %requested))]
    pub async fn execute_at(
        &self,
        user_key: &str,
        requested: Money,
        contract_number: &str,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalResponse> {
        let started = Instant::now();
        let (user, plan) = resolve_plan(
            self.users.as_ref(),
            self.plans.as_ref(),
            user_key,
            contract_number,
        )
        .await?;

        let withdrawal = self.service.request(requested, &plan, now)?;
        self.withdrawals.append(&withdrawal).await?;

        let event = WithdrawalEvent::from_withdrawal(&withdrawal, &user.key, &plan.contract_number);
        let topic = if withdrawal.is_rejected() {
            Topic::RejectedWithdrawal
        } else {
            Topic::RequestedWithdrawal
        };
        self.publisher.publish(topic, event.encode()?).await?;
        self.metrics.record_request(withdrawal.status, started.elapsed());

        info!(
            transaction_id = %withdrawal.transaction_id,
            status = %withdrawal.status,
            "withdrawal request recorded"
        );
        Ok(WithdrawalResponse::from(&withdrawal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::traits::{MockEventPublisher, MockWithdrawalRepository};
    use crate::adapters::MemoryStore;
    use crate::domain::{Contribution, PlanType, User, INSUFFICIENT_FUNDS_REASON};
    use crate::error::{NotFound, PensionError};
    use chrono::{NaiveDate, TimeZone};
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 18, 12, 0, 0).unwrap()
    }

    fn seeded_store(plan_type: PlanType, available: i64) -> MemoryStore {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            key: "02070893103".to_string(),
            name: "Lucas Costa".to_string(),
            email: "lucas@teste.com".to_string(),
        };
        let plan_id = Uuid::new_v4();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        store
            .insert_plan(user.id, plan_id, plan_type, "12345", start)
            .unwrap();
        store.insert_contribution(
            plan_id,
            Contribution::new(
                Uuid::new_v4(),
                Money::from_minor_units(available).unwrap(),
                start,
                start,
            ),
        );
        store.insert_user(user);
        store
    }

    fn capturing_publisher(sink: Arc<Mutex<Vec<(Topic, WithdrawalEvent)>>>) -> MockEventPublisher {
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().returning(move |topic, payload| {
            let event = WithdrawalEvent::decode(&payload).unwrap();
            sink.lock().unwrap().push((topic, event));
            Ok(())
        });
        publisher
    }

    fn use_case(store: MemoryStore, publisher: MockEventPublisher) -> WithdrawalRequestUseCase {
        let store = Arc::new(store);
        WithdrawalRequestUseCase::new(store.clone(), store.clone(), store, Arc::new(publisher))
    }

    #[tokio::test]
    async fn test_valid_pgbl_request_is_pending_and_published() {
        let store = seeded_store(PlanType::Pgbl, 500000);
        let sink = Arc::new(Mutex::new(Vec::new()));
        let uc = use_case(store.clone(), capturing_publisher(sink.clone()));

        let response = uc
            .execute_at(
                "02070893103",
                Money::from_minor_units(100000).unwrap(),
                "12345",
                now(),
            )
            .await
            .unwrap();

        assert_eq!(response.status, WithdrawalStatus::Pending);
        assert_eq!(response.redeemable_value, 85000);
        assert_eq!(response.request_date, "2025-10-18");

        let published = sink.lock().unwrap().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, Topic::RequestedWithdrawal);
        assert_eq!(published[0].1.transaction_id, response.transaction_id);
        assert_eq!(published[0].1.contract_number, "12345");

        let stored = store
            .find_by_transaction_id(response.transaction_id)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_pending());
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_rejected_and_published_as_rejection() {
        let store = seeded_store(PlanType::Vgbl, 50000);
        let sink = Arc::new(Mutex::new(Vec::new()));
        let uc = use_case(store, capturing_publisher(sink.clone()));

        let response = uc
            .execute_at(
                "02070893103",
                Money::from_minor_units(100000).unwrap(),
                "12345",
                now(),
            )
            .await
            .unwrap();

        assert_eq!(response.status, WithdrawalStatus::Rejected);
        assert_eq!(response.redeemable_value, 50000);
        assert_eq!(
            response.rejection_reason.as_deref(),
            Some(INSUFFICIENT_FUNDS_REASON)
        );

        let published = sink.lock().unwrap().clone();
        assert_eq!(published[0].0, Topic::RejectedWithdrawal);
        assert_eq!(
            published[0].1.rejection_reason.as_deref(),
            Some(INSUFFICIENT_FUNDS_REASON)
        );
    }

    #[tokio::test]
    async fn test_unknown_contract_is_not_found_and_nothing_is_written() {
        let store = seeded_store(PlanType::Pgbl, 500000);
        let mut withdrawals = MockWithdrawalRepository::new();
        withdrawals.expect_append().never();
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();

        let store = Arc::new(store);
        let uc = WithdrawalRequestUseCase::new(
            store.clone(),
            store,
            Arc::new(withdrawals),
            Arc::new(publisher),
        );

        let err = uc
            .execute("02070893103", Money::from_minor_units(1).unwrap(), "00000")
            .await
            .unwrap_err();
        assert!(matches!(err, PensionError::NotFound(NotFound::PensionPlan)));
        assert_eq!(
            err.to_string(),
            "This contract number does not exist or is not related to this Pension Plan"
        );
    }

    #[tokio::test]
    async fn test_stored_unsupported_plan_type_fails_the_request() {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            key: "02070893103".to_string(),
            name: "Lucas Costa".to_string(),
            email: "lucas@teste.com".to_string(),
        };
        store
            .insert_plan_with_type_code(
                user.id,
                Uuid::new_v4(),
                "XPTO",
                "12345",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
            .unwrap();
        store.insert_user(user);

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().never();
        let uc = use_case(store, publisher);

        let err = uc
            .execute("02070893103", Money::from_minor_units(100).unwrap(), "12345")
            .await
            .unwrap_err();
        assert!(matches!(err, PensionError::UnsupportedPlanType(ref t) if t == "XPTO"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_response_wire_format() {
        let w = Withdrawal::pending(
            Uuid::new_v4(),
            Money::from_minor_units(10000).unwrap(),
            Money::from_minor_units(8500).unwrap(),
            now(),
        );
        let json = serde_json::to_value(WithdrawalResponse::from(&w)).unwrap();
        assert_eq!(json["transactionId"], w.transaction_id.to_string());
        assert_eq!(json["requestedValue"], 10000);
        assert_eq!(json["redeemableValue"], 8500);
        assert_eq!(json["status"], "PENDING");
        assert!(json.get("rejectionReason").is_none());
    }
}
