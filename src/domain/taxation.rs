use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Money;
use crate::error::{PensionError, Result};

/// Income tax rate applied on withdrawals, for both regimes
pub const TAX_RATE: Decimal = dec!(0.15);

/// Tax computation for a withdrawal
pub trait TaxationStrategy: Send + Sync {
    /// Net (redeemable) value of `requested` given what was contributed
    fn apply_tax(&self, requested: &Money, total_contributed: &Money) -> Result<Money>;
}

/// PGBL: tax on the gross requested value
#[derive(Debug, Clone, Copy, Default)]
pub struct PgblTaxation;

impl TaxationStrategy for PgblTaxation {
    fn apply_tax(&self, requested: &Money, _total_contributed: &Money) -> Result<Money> {
        requested.multiply_by(Decimal::ONE - TAX_RATE)
    }
}

/// VGBL: tax only on the profit above the contributed total
#[derive(Debug, Clone, Copy, Default)]
pub struct VgblTaxation;

impl TaxationStrategy for VgblTaxation {
    fn apply_tax(&self, requested: &Money, total_contributed: &Money) -> Result<Money> {
        // Profit computed on raw amounts: a negative Money is not representable
        let profit = (requested.amount() - total_contributed.amount()).max(0);
        let taxable = Money::with_currency(profit, requested.currency())?;
        let tax = taxable.multiply_by(TAX_RATE)?;
        requested.subtract(&tax)
    }
}

static PGBL: PgblTaxation = PgblTaxation;
static VGBL: VgblTaxation = VgblTaxation;

/// Pension plan regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanType {
    Pgbl,
    Vgbl,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Pgbl => "PGBL",
            PlanType::Vgbl => "VGBL",
        }
    }

    /// Taxation strategy for this regime
    pub fn taxation(&self) -> &'static dyn TaxationStrategy {
        match self {
            PlanType::Pgbl => &PGBL,
            PlanType::Vgbl => &VGBL,
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = PensionError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "PGBL" => Ok(PlanType::Pgbl),
            "VGBL" => Ok(PlanType::Vgbl),
            other => Err(PensionError::UnsupportedPlanType(other.to_string())),
        }
    }
}
