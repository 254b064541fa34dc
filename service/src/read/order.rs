//! [`Order`]-related read definitions.

use common::Money;

#[cfg(doc)]
use crate::domain::{order::Status, Order, User};

/// Statistics of the [`Order`]s placed by a [`User`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    /// Number of all the [`Order`]s.
    pub total_orders: u64,

    /// Number of the [`Status::Delivered`] [`Order`]s.
    pub completed_orders: u64,

    /// Sum of the [`Status::Delivered`] [`Order`]s totals.
    pub total_spent: Money,
}
