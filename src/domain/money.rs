use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{PensionError, Result};

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Currency([u8; 3]);

impl Currency {
    pub const BRL: Currency = Currency(*b"BRL");

    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII uppercase letters
        std::str::from_utf8(&self.0).unwrap_or("???")
    }

    pub fn symbol(&self) -> &str {
        match &self.0 {
            b"BRL" => "R$",
            b"USD" => "US$",
            b"EUR" => "€",
            _ => self.as_str(),
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::BRL
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Currency {
    type Err = PensionError;

    fn from_str(raw: &str) -> Result<Self> {
        let code = raw.trim().to_ascii_uppercase();
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(PensionError::Validation(format!(
                "invalid currency code '{}'",
                raw
            )));
        }
        Ok(Currency([bytes[0], bytes[1], bytes[2]]))
    }
}

/// Exact monetary value in integer minor units (cents).
///
/// The amount is never negative: every constructor and arithmetic operation
/// that would produce a negative value fails with `InvalidAmount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    pub const ZERO: Money = Money {
        amount: 0,
        currency: Currency::BRL,
    };

    /// Build from minor units in the default currency
    pub fn from_minor_units(amount: i64) -> Result<Self> {
        Self::with_currency(amount, Currency::default())
    }

    pub fn with_currency(amount: i64, currency: Currency) -> Result<Self> {
        if amount < 0 {
            return Err(PensionError::InvalidAmount(
                "Amount should be higher than 0".to_string(),
            ));
        }
        Ok(Self { amount, currency })
    }

    /// Build from major units (e.g. reais), rounding to the nearest cent
    pub fn from_major_units(value: Decimal) -> Result<Self> {
        let scaled = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| PensionError::InvalidAmount(format!("{} is out of range", value)))?;
        let minor = round_to_minor(scaled)?;
        Self::from_minor_units(minor)
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Value in major units, exact
    pub fn to_major_units(&self) -> Decimal {
        Decimal::new(self.amount, 2)
    }

    pub fn add(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        let amount = self.amount.checked_add(other.amount).ok_or_else(|| {
            PensionError::InvalidAmount("Amount overflows the representable range".to_string())
        })?;
        Money::with_currency(amount, self.currency)
    }

    pub fn subtract(&self, other: &Money) -> Result<Money> {
        self.ensure_same_currency(other)?;
        Money::with_currency(self.amount - other.amount, self.currency)
    }

    /// Multiply by a real factor, rounding half away from zero
    pub fn multiply_by(&self, factor: Decimal) -> Result<Money> {
        let product = Decimal::from(self.amount)
            .checked_mul(factor)
            .ok_or_else(|| PensionError::InvalidAmount("Multiplication overflow".to_string()))?;
        Money::with_currency(round_to_minor(product)?, self.currency)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency != other.currency {
            return Err(PensionError::InvalidAmount(format!(
                "Currency mismatch: {} vs {}",
                self.currency, other.currency
            )));
        }
        Ok(())
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.currency != other.currency {
            return None;
        }
        Some(self.amount.cmp(&other.amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency.symbol(), self.to_major_units())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn round_to_minor(value: Decimal) -> Result<i64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| PensionError::InvalidAmount(format!("{} is out of range", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn money(amount: i64) -> Money {
        Money::from_minor_units(amount).unwrap()
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let err = Money::from_minor_units(-1).unwrap_err();
        assert!(matches!(err, PensionError::InvalidAmount(_)));
    }

    #[test]
    fn test_from_major_units_rounds_to_cents() {
        assert_eq!(Money::from_major_units(dec!(100)).unwrap().amount(), 10000);
        assert_eq!(Money::from_major_units(dec!(10.005)).unwrap().amount(), 1001);
        assert_eq!(Money::from_major_units(dec!(10.004)).unwrap().amount(), 1000);
        assert!(Money::from_major_units(dec!(-0.01)).is_err());
    }

    #[test]
    fn test_subtract_below_zero_fails() {
        let err = money(100).subtract(&money(101)).unwrap_err();
        assert!(matches!(err, PensionError::InvalidAmount(_)));
        assert_eq!(money(100).subtract(&money(100)).unwrap(), Money::zero());
    }

    #[test]
    fn test_multiply_rounds_half_away_from_zero() {
        // 10001 * 0.85 = 8500.85
        assert_eq!(money(10001).multiply_by(dec!(0.85)).unwrap().amount(), 8501);
        // 5 * 0.5 = 2.5
        assert_eq!(money(5).multiply_by(dec!(0.5)).unwrap().amount(), 3);
        assert_eq!(money(10000).multiply_by(dec!(1.2)).unwrap().amount(), 12000);
    }

    #[test]
    fn test_currency_mismatch_fails() {
        let usd = Money::with_currency(100, "usd".parse().unwrap()).unwrap();
        assert!(money(100).add(&usd).is_err());
        assert_eq!(money(100).partial_cmp(&usd), None);
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(money(12000).to_string(), "R$ 120.00");
        assert_eq!(money(5).to_string(), "R$ 0.05");
        assert_eq!(
            serde_json::to_string(&money(123456)).unwrap(),
            "\"R$ 1234.56\""
        );
    }

    #[test]
    fn test_invalid_currency_code() {
        assert!("BR".parse::<Currency>().is_err());
        assert!("B1L".parse::<Currency>().is_err());
        assert_eq!("brl".parse::<Currency>().unwrap(), Currency::BRL);
    }

    proptest! {
        #[test]
        fn prop_construction_preserves_non_negative(amount in 0i64..i64::MAX) {
            prop_assert_eq!(money(amount).amount(), amount);
        }

        #[test]
        fn prop_construction_rejects_negative(amount in i64::MIN..0i64) {
            prop_assert!(Money::from_minor_units(amount).is_err());
        }

        #[test]
        fn prop_add_then_subtract_is_identity(a in 0i64..1_000_000_000_000, b in 0i64..1_000_000_000_000) {
            let (a, b) = (money(a), money(b));
            prop_assert_eq!(a.add(&b).unwrap().subtract(&b).unwrap(), a);
        }
    }
}
