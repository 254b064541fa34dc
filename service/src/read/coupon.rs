//! [`Coupon`]-related read definitions.

use common::Money;
use derive_more::{Display, From, Into};

use crate::domain::{
    coupon::{Rejection, Scope},
    Coupon,
};

/// Result of validating a [`Coupon`] against a selection of products,
/// categories and a customer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Validation {
    /// Validated [`Coupon`].
    pub coupon: Coupon,

    /// [`Scope`] the [`Coupon`] applies within, or the [`Rejection`] reason.
    pub verdict: Result<Scope, Rejection>,

    /// Discount granted for the provided subtotal.
    ///
    /// Zero if no subtotal was provided or the [`Coupon`] is rejected.
    pub discount_amount: Money,
}

impl Validation {
    /// Indicates whether the [`Coupon`] is applicable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.verdict.is_ok()
    }
}

/// Number of times a [`Coupon`] has been redeemed.
#[derive(Clone, Copy, Debug, Display, Eq, From, Into, PartialEq)]
pub struct UsedCount(u32);
