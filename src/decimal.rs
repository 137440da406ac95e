use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::errors::{MarketError, Result};

/// fractional digits supported by the btc unit
pub const BTC_SCALE: u32 = 8;

const SATS_PER_BTC: i64 = 100_000_000;

/// money as an integer count of satoshis
///
/// all arithmetic happens on the integer minor units; Decimal is used only
/// at the parse/display boundary and for rate math, so repeated operations
/// never accumulate rounding drift. values are always non-negative, signed
/// differences go through [`Money::signed_delta_sats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    /// one minor unit, the smallest representable payment
    pub const SATOSHI: Money = Money(1);

    /// create from a satoshi count
    pub fn from_sats(sats: i64) -> Result<Self> {
        if sats < 0 {
            return Err(MarketError::InvalidAmount {
                amount: Decimal::new(sats, BTC_SCALE).to_string(),
            });
        }
        Ok(Money(sats))
    }

    /// parse a btc decimal string, e.g. "1.06" or "0.00000001"
    pub fn from_btc_str(s: &str) -> Result<Self> {
        let d = Decimal::from_str(s).map_err(|_| MarketError::InvalidFormat {
            input: s.to_string(),
        })?;
        Money::from_btc_decimal(d)
    }

    /// convert an exact decimal btc value, rejecting sub-satoshi precision
    pub fn from_btc_decimal(d: Decimal) -> Result<Self> {
        if d.is_sign_negative() && !d.is_zero() {
            return Err(MarketError::InvalidAmount {
                amount: d.to_string(),
            });
        }
        if d.normalize().scale() > BTC_SCALE {
            return Err(MarketError::InvalidFormat {
                input: d.to_string(),
            });
        }
        let sats = d
            .checked_mul(Decimal::from(SATS_PER_BTC))
            .and_then(|v| v.to_i64())
            .ok_or_else(|| MarketError::CalculationError {
                message: format!("amount out of range: {}", d),
            })?;
        Ok(Money(sats))
    }

    /// round a computed decimal btc value to the nearest satoshi, half-up
    pub fn from_btc_decimal_rounded(d: Decimal) -> Result<Self> {
        let rounded = d.round_dp_with_strategy(BTC_SCALE, RoundingStrategy::MidpointAwayFromZero);
        Money::from_btc_decimal(rounded)
    }

    /// underlying satoshi count
    pub fn sats(&self) -> i64 {
        self.0
    }

    /// decimal btc view at fixed scale 8
    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(self.0, BTC_SCALE)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// addition that surfaces an error instead of overflowing the
    /// satoshi count
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| MarketError::CalculationError {
                message: format!("amount out of range: {} + {}", self, other),
            })
    }

    /// subtraction that refuses to go below zero
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        if other.0 > self.0 {
            return Err(MarketError::NegativeResult {
                minuend: self,
                subtrahend: other,
            });
        }
        Ok(Money(self.0 - other.0))
    }

    /// signed difference in satoshis
    ///
    /// the one sanctioned way to observe a negative quantity: boundary
    /// callers that display or reconcile deltas use this instead of
    /// holding a negative Money, which cannot exist.
    pub fn signed_delta_sats(self, other: Self) -> i64 {
        self.0 - other.0
    }

    /// interest for a period: amount * rate% * period_fraction,
    /// rounded half-up to one satoshi
    pub fn multiply_by_rate(&self, rate: Rate, period_fraction: Decimal) -> Result<Self> {
        let interest = self.as_decimal() * rate.as_percent() / Decimal::from(100) * period_fraction;
        Money::from_btc_decimal_rounded(interest)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal())
    }
}

impl FromStr for Money {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        Money::from_btc_str(s)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Money::from_btc_str(&s).map_err(serde::de::Error::custom)
    }
}

/// total interest rate over the loan's life, expressed in percent and
/// annualized (6 months at 12% costs 6% of principal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from a percent value, e.g. dec!(12) for 12%
    pub fn from_percent(percent: Decimal) -> Result<Self> {
        if percent.is_sign_negative() && !percent.is_zero() {
            return Err(MarketError::InvalidTerms {
                message: format!("interest rate must be non-negative, got {}%", percent),
            });
        }
        Ok(Rate(percent))
    }

    /// create from an integer percent
    pub fn from_percent_u32(percent: u32) -> Self {
        Rate(Decimal::from(percent))
    }

    pub fn as_percent(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_btc_string() {
        let m = Money::from_btc_str("1.06").unwrap();
        assert_eq!(m.sats(), 106_000_000);
        assert_eq!(m.to_string(), "1.06000000");

        let sat = Money::from_btc_str("0.00000001").unwrap();
        assert_eq!(sat, Money::SATOSHI);
    }

    #[test]
    fn test_parse_rejects_sub_satoshi_precision() {
        let err = Money::from_btc_str("0.000000001").unwrap_err();
        assert!(matches!(err, MarketError::InvalidFormat { .. }));

        // trailing zeros beyond scale 8 are still exact
        assert!(Money::from_btc_str("1.0000000000").is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage_and_negatives() {
        assert!(matches!(
            Money::from_btc_str("abc").unwrap_err(),
            MarketError::InvalidFormat { .. }
        ));
        assert!(matches!(
            Money::from_btc_str("-0.5").unwrap_err(),
            MarketError::InvalidAmount { .. }
        ));
        assert!(matches!(
            Money::from_sats(-1).unwrap_err(),
            MarketError::InvalidAmount { .. }
        ));
    }

    #[test]
    fn test_checked_add_surfaces_overflow() {
        let max = Money::from_sats(i64::MAX).unwrap();
        assert!(matches!(
            max.checked_add(Money::SATOSHI).unwrap_err(),
            MarketError::CalculationError { .. }
        ));
        assert_eq!(
            max.checked_add(Money::ZERO).unwrap(),
            max
        );
    }

    #[test]
    fn test_checked_sub_refuses_negative() {
        let a = Money::from_sats(100).unwrap();
        let b = Money::from_sats(150).unwrap();

        assert_eq!(b.checked_sub(a).unwrap(), Money::from_sats(50).unwrap());
        assert!(matches!(
            a.checked_sub(b).unwrap_err(),
            MarketError::NegativeResult { .. }
        ));
        assert_eq!(a.signed_delta_sats(b), -50);
    }

    #[test]
    fn test_multiply_by_rate_annualized() {
        // 1 btc at 12% over 6 months -> 0.06 btc interest
        let principal = Money::from_btc_str("1.0").unwrap();
        let rate = Rate::from_percent_u32(12);
        let interest = principal
            .multiply_by_rate(rate, Decimal::from(6) / Decimal::from(12))
            .unwrap();
        assert_eq!(interest, Money::from_btc_str("0.06").unwrap());
    }

    #[test]
    fn test_multiply_by_rate_rounds_half_up() {
        // 1 sat at 50% over a full year is 0.5 sat, rounds up to 1 sat
        let one_sat = Money::SATOSHI;
        let rate = Rate::from_percent(dec!(50)).unwrap();
        let interest = one_sat.multiply_by_rate(rate, Decimal::ONE).unwrap();
        assert_eq!(interest, Money::SATOSHI);
    }

    #[test]
    fn test_rate_rejects_negative() {
        assert!(Rate::from_percent(dec!(-1)).is_err());
        assert!(Rate::from_percent(dec!(0)).is_ok());
    }

    #[test]
    fn test_money_serde_as_string() {
        let m = Money::from_btc_str("1.06").unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"1.06000000\"");

        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_sum_over_history() {
        let payments = vec![
            Money::from_btc_str("0.25").unwrap(),
            Money::from_btc_str("0.25").unwrap(),
            Money::from_btc_str("0.5").unwrap(),
        ];
        let total: Money = payments.into_iter().sum();
        assert_eq!(total, Money::from_btc_str("1.0").unwrap());
    }
}
