use chrono::{DateTime, Utc};

use super::{Money, PensionPlan, Withdrawal, INSUFFICIENT_FUNDS_REASON};
use crate::error::Result;

/// Validates a withdrawal request against the plan balance and taxes it.
///
/// Pure: persistence and event emission belong to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithdrawalRequestService;

impl WithdrawalRequestService {
    pub fn new() -> Self {
        Self
    }

    pub fn request(
        &self,
        requested: Money,
        plan: &PensionPlan,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal> {
        let balance = plan.calculate_balance_at(now)?;

        if requested.amount() > balance.available.amount() {
            return Ok(Withdrawal::rejected(
                plan.id,
                requested,
                balance.available,
                now,
                INSUFFICIENT_FUNDS_REASON,
            ));
        }

        let redeemable = plan.taxation().apply_tax(&requested, &balance.available)?;
        Ok(Withdrawal::pending(plan.id, requested, redeemable, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contribution, PlanType, WithdrawalStatus};
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    fn money(amount: i64) -> Money {
        Money::from_minor_units(amount).unwrap()
    }

    fn plan_with_available(plan_type: PlanType, available: i64) -> PensionPlan {
        let vested = (Utc::now() - Duration::days(10)).date_naive();
        PensionPlan::new(
            Uuid::new_v4(),
            plan_type,
            "12345",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec![Contribution::new(
                Uuid::new_v4(),
                money(available),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                vested,
            )],
            vec![],
        )
    }

    #[test]
    fn test_rejects_when_requested_exceeds_available() {
        let plan = plan_with_available(PlanType::Pgbl, 100000);
        let w = WithdrawalRequestService::new()
            .request(money(500000), &plan, Utc::now())
            .unwrap();

        assert_eq!(w.status, WithdrawalStatus::Rejected);
        assert_eq!(w.redeemable_value.amount(), 100000);
        assert_eq!(w.requested_value.amount(), 500000);
        assert_eq!(w.rejection_reason.as_deref(), Some(INSUFFICIENT_FUNDS_REASON));
    }

    #[test]
    fn test_pgbl_request_is_pending_and_taxed() {
        let plan = plan_with_available(PlanType::Pgbl, 100000);
        let now = Utc::now();
        let w = WithdrawalRequestService::new()
            .request(money(10000), &plan, now)
            .unwrap();

        assert_eq!(w.status, WithdrawalStatus::Pending);
        assert_eq!(w.redeemable_value.amount(), 8500);
        assert_eq!(w.pension_plan_id, plan.id);
        assert_eq!(w.request_date, now);
        assert!(w.rejection_reason.is_none());
    }

    #[test]
    fn test_vgbl_request_within_contributions_is_untaxed() {
        let plan = plan_with_available(PlanType::Vgbl, 100000);
        let w = WithdrawalRequestService::new()
            .request(money(100000), &plan, Utc::now())
            .unwrap();

        assert_eq!(w.status, WithdrawalStatus::Pending);
        assert_eq!(w.redeemable_value.amount(), 100000);
    }

    #[test]
    fn test_each_request_gets_fresh_ids() {
        let plan = plan_with_available(PlanType::Pgbl, 100000);
        let service = WithdrawalRequestService::new();
        let a = service.request(money(100), &plan, Utc::now()).unwrap();
        let b = service.request(money(100), &plan, Utc::now()).unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.transaction_id, b.transaction_id);
    }
}
