//! Stock ledger operations.
//!
//! [`Decrement`] and [`Increment`] are the only operations moving a
//! [`Product`] stock while checking out. Both are executed by a [`Database`]
//! as a single atomic statement:
//! - [`Decrement`] takes the units only if the stock holds enough of them,
//!   reporting whether it did so;
//! - [`Increment`] returns the units unconditionally.
//!
//! Reading the [`Product::stock`] beforehand is advisory only, and never
//! decides whether a [`Decrement`] may happen.
//!
//! [`Database`]: crate::infra::Database
//! [`Product`]: crate::domain::Product
//! [`Product::stock`]: crate::domain::Product::stock

use crate::domain::{cart, product};

/// Conditional decrement of a [`Product`] stock.
///
/// [`Product`]: crate::domain::Product
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decrement {
    /// ID of the [`Product`] to take the units of.
    ///
    /// [`Product`]: crate::domain::Product
    pub product_id: product::Id,

    /// Number of units to take.
    pub quantity: cart::Quantity,
}

/// Unconditional increment of a [`Product`] stock.
///
/// [`Product`]: crate::domain::Product
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Increment {
    /// ID of the [`Product`] to return the units to.
    ///
    /// [`Product`]: crate::domain::Product
    pub product_id: product::Id,

    /// Number of units to return.
    pub quantity: cart::Quantity,
}

impl From<Decrement> for Increment {
    fn from(Decrement { product_id, quantity }: Decrement) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}
