//! [`Discount`] definitions.

use common::{define_kind, Money, Percent};
use rust_decimal::Decimal;

#[cfg(doc)]
use crate::domain::Coupon;

/// Discount granted by a [`Coupon`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Discount {
    /// Percentage of the applicable subtotal.
    Percent(Percent),

    /// Fixed amount.
    Fixed(Money),
}

impl Discount {
    /// Creates a new [`Discount`] out of its [`Kind`] and raw value.
    ///
    /// [`None`] is returned if the value is out of the [`Kind`] bounds.
    #[must_use]
    pub fn new(kind: Kind, value: Decimal) -> Option<Self> {
        match kind {
            Kind::Percent => Percent::new(value).map(Self::Percent),
            Kind::Fixed => {
                Some(Money::new(value)).filter(|m| m.is_positive()).map(Self::Fixed)
            }
        }
    }

    /// Returns [`Kind`] of this [`Discount`].
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Percent(_) => Kind::Percent,
            Self::Fixed(_) => Kind::Fixed,
        }
    }

    /// Returns raw value of this [`Discount`].
    #[must_use]
    pub fn value(&self) -> Decimal {
        match self {
            Self::Percent(p) => p.value(),
            Self::Fixed(m) => m.amount(),
        }
    }

    /// Calculates the amount this [`Discount`] takes off the provided
    /// applicable subtotal.
    ///
    /// The amount never exceeds the subtotal and is zero for a non-positive
    /// subtotal.
    #[must_use]
    pub fn amount(&self, applicable_subtotal: Money) -> Money {
        if !applicable_subtotal.is_positive() {
            return Money::ZERO;
        }

        let amount = match self {
            Self::Percent(p) => p.of(applicable_subtotal),
            Self::Fixed(m) => m.amount(),
        };
        Money::new(amount.min(applicable_subtotal.amount()))
    }
}

define_kind! {
    #[doc = "Kind of a [`Discount`]."]
    enum Kind {
        #[doc = "[`Discount::Percent`]."]
        Percent = 1,

        #[doc = "[`Discount::Fixed`]."]
        Fixed = 2,
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Money;
    use rust_decimal::Decimal;

    use super::{Discount, Kind};

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn percent(s: &str) -> Discount {
        Discount::new(Kind::Percent, Decimal::from_str(s).unwrap()).unwrap()
    }

    fn fixed(s: &str) -> Discount {
        Discount::new(Kind::Fixed, Decimal::from_str(s).unwrap()).unwrap()
    }

    #[test]
    fn bounds_values() {
        assert!(Discount::new(Kind::Percent, Decimal::ZERO).is_none());
        assert!(Discount::new(Kind::Percent, Decimal::from(101)).is_none());
        assert!(Discount::new(Kind::Fixed, Decimal::ZERO).is_none());
        assert!(Discount::new(Kind::Fixed, Decimal::from(-1)).is_none());
    }

    #[test]
    fn percent_of_subtotal() {
        assert_eq!(percent("50").amount(money("10.00")), money("5.00"));
        assert_eq!(percent("100").amount(money("12.34")), money("12.34"));
    }

    #[test]
    fn percent_rounds_half_up() {
        // 50% of 66.67 is exactly 33.335.
        assert_eq!(percent("50").amount(money("66.67")).to_string(), "33.34");
        // 33.335% of 100.00 is exactly 33.335.
        assert_eq!(
            percent("33.335").amount(money("100.00")).to_string(),
            "33.34",
        );
        assert_eq!(percent("10").amount(money("0.05")).to_string(), "0.01");
    }

    #[test]
    fn fixed_is_capped() {
        assert_eq!(fixed("15").amount(money("200.00")), money("15.00"));
        assert_eq!(fixed("15").amount(money("9.99")), money("9.99"));
    }

    #[test]
    fn nothing_off_non_positive_subtotal() {
        assert_eq!(fixed("15").amount(Money::ZERO), Money::ZERO);
        assert_eq!(percent("20").amount(money("-3")), Money::ZERO);
    }

    #[test]
    fn never_exceeds_subtotal() {
        for subtotal in ["0.01", "0.99", "1.00", "15.00", "15.01", "1000"] {
            let subtotal = money(subtotal);
            for d in [fixed("15"), fixed("0.01"), percent("100"), percent("0.5")]
            {
                let amount = d.amount(subtotal);
                assert!(amount <= subtotal, "{d:?} of {subtotal}");
                assert!(subtotal.saturating_sub(amount) >= Money::ZERO);
            }
        }
    }
}
