//! [`Cart`]-related read definitions.

use common::define_kind;

use crate::domain::{
    cart::{pricing::Line, Pricing},
    Cart,
};

/// [`Cart`] along with its priced [`Line`]s.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct View {
    /// Viewed [`Cart`] with its persisted snapshot.
    pub cart: Cart,

    /// Priced [`Line`]s of the [`Cart`].
    pub lines: Vec<Line>,

    /// Total number of units in all the [`Line`]s.
    pub total_quantity: u32,

    /// [`Source`] of the [`Cart`] snapshot figures.
    pub source: Source,
}

impl View {
    /// Creates a new [`View`] of the provided [`Cart`] out of its
    /// [`Pricing`].
    #[must_use]
    pub fn new(cart: Cart, pricing: Pricing, source: Source) -> Self {
        Self {
            cart,
            lines: pricing.lines,
            total_quantity: pricing.total_quantity,
            source,
        }
    }
}

define_kind! {
    #[doc = "Source of the [`Cart`] snapshot figures."]
    enum Source {
        #[doc = "Computed by the server out of the live products."]
        Server = 1,

        #[doc = "Supplied by a client and trusted as is."]
        Client = 2,
    }
}
