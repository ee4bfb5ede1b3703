use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::{Balance, Contribution, Grace, Money, PlanType, TaxationStrategy, Withdrawal};
use crate::error::Result;

/// Yield applied to contributions when no plan-specific rate is configured
pub const DEFAULT_YIELD_RATE: Decimal = dec!(0.20);

/// Pension plan aggregate, loaded per call with its contributions and
/// withdrawal records
#[derive(Debug, Clone)]
pub struct PensionPlan {
    pub id: Uuid,
    pub plan_type: PlanType,
    pub contract_number: String,
    pub start_date: NaiveDate,
    pub contributions: Vec<Contribution>,
    pub withdrawals: Vec<Withdrawal>,
    yield_rate: Decimal,
}

impl PensionPlan {
    pub fn new(
        id: Uuid,
        plan_type: PlanType,
        contract_number: impl Into<String>,
        start_date: NaiveDate,
        contributions: Vec<Contribution>,
        withdrawals: Vec<Withdrawal>,
    ) -> Self {
        Self {
            id,
            plan_type,
            contract_number: contract_number.into(),
            start_date,
            contributions,
            withdrawals,
            yield_rate: DEFAULT_YIELD_RATE,
        }
    }

    pub fn with_yield_rate(mut self, yield_rate: Decimal) -> Self {
        self.yield_rate = yield_rate;
        self
    }

    pub fn taxation(&self) -> &'static dyn TaxationStrategy {
        self.plan_type.taxation()
    }

    pub fn find_withdrawal(&self, id: Uuid) -> Option<&Withdrawal> {
        self.withdrawals.iter().find(|w| w.id == id)
    }

    pub fn calculate_balance(&self) -> Result<Balance> {
        self.calculate_balance_at(Utc::now())
    }

    /// Balance as of `now`.
    ///
    /// Yield is applied to `total` and to locked (grace) amounts but not to
    /// the available figure. Confirmed withdrawals are deducted from both
    /// `total` and `available`.
    pub fn calculate_balance_at(&self, now: DateTime<Utc>) -> Result<Balance> {
        let yield_factor = Decimal::ONE + self.yield_rate;

        let mut total = Money::zero();
        let mut available = Money::zero();
        let mut not_available = Money::zero();
        let mut grace = Vec::new();

        for contribution in &self.contributions {
            let yielded = contribution.amount.multiply_by(yield_factor)?;
            total = total.add(&yielded)?;

            if contribution.is_available(now) {
                available = available.add(&contribution.amount)?;
            } else {
                not_available = not_available.add(&yielded)?;
                grace.push(Grace::new(yielded, contribution.availability_date));
            }
        }

        let total_withdrawn = self
            .withdrawals
            .iter()
            .filter(|w| w.is_confirmed())
            .try_fold(Money::zero(), |acc, w| acc.add(&w.redeemable_value))?;

        Ok(Balance {
            total: total.subtract(&total_withdrawn)?,
            available: available.subtract(&total_withdrawn)?,
            not_available,
            grace,
        })
    }
}
