use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::Money;

/// A deposited amount that vests on its availability date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub id: Uuid,
    pub amount: Money,
    pub start_date: NaiveDate,
    pub availability_date: NaiveDate,
}

impl Contribution {
    pub fn new(id: Uuid, amount: Money, start_date: NaiveDate, availability_date: NaiveDate) -> Self {
        Self {
            id,
            amount,
            start_date,
            availability_date,
        }
    }

    /// Vested once its availability date has been reached (UTC calendar day)
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.availability_date <= now.date_naive()
    }
}
