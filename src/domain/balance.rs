use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Money;

/// Yielded amount still locked until its availability date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grace {
    pub value: Money,
    pub availability_date: NaiveDate,
}

impl Grace {
    pub fn new(value: Money, availability_date: NaiveDate) -> Self {
        Self {
            value,
            availability_date,
        }
    }
}

/// Derived balance of a pension plan; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub total: Money,
    pub available: Money,
    pub not_available: Money,
    pub grace: Vec<Grace>,
}

/// Wire shape of a balance, also the serialized form kept in the side cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDto {
    pub total: String,
    pub available: String,
    pub not_available: String,
    pub graces: Vec<GraceDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraceDto {
    pub value: String,
    pub availability_date: String,
}

impl From<&Balance> for BalanceDto {
    fn from(balance: &Balance) -> Self {
        Self {
            total: balance.total.to_string(),
            available: balance.available.to_string(),
            not_available: balance.not_available.to_string(),
            graces: balance
                .grace
                .iter()
                .map(|grace| GraceDto {
                    value: grace.value.to_string(),
                    availability_date: grace.availability_date.format("%Y-%m-%d").to_string(),
                })
                .collect(),
        }
    }
}
