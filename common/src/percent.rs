//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

use crate::Money;

/// Positive percentage not exceeding `100`.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Percent(Decimal);

impl Percent {
    /// Creates a new [`Percent`] by checking the provided value is greater
    /// than `0` and doesn't exceed `100`.
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        (val > Decimal::ZERO && val <= Decimal::ONE_HUNDRED).then_some(Self(val))
    }

    /// Returns the [`Decimal`] value of this [`Percent`].
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Calculates this [`Percent`] of the provided [`Money`] amount.
    ///
    /// The result is exact and is not rounded to [`Money::SCALE`].
    #[must_use]
    pub fn of(self, money: Money) -> Decimal {
        money.amount() * self.0 / Decimal::ONE_HUNDRED
    }
}

impl FromStr for Percent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .ok()
            .and_then(Self::new)
            .ok_or("invalid percent value")
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use crate::Money;

    use super::Percent;

    #[test]
    fn bounds() {
        assert!(Percent::from_str("0").is_err());
        assert!(Percent::from_str("-5").is_err());
        assert!(Percent::from_str("100.01").is_err());
        assert!(Percent::from_str("100").is_ok());
        assert!(Percent::from_str("0.5").is_ok());
    }

    #[test]
    fn of_is_exact() {
        let half = Percent::from_str("50").unwrap();
        let third = Percent::from_str("33.335").unwrap();
        let ten = Money::from_str("10.00").unwrap();

        assert_eq!(half.of(ten), Decimal::from(5));
        assert_eq!(third.of(ten), Decimal::from_str("3.3335").unwrap());
    }
}
