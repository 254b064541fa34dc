//! [`Product`]-related read definitions.

use std::collections::HashMap;

use derive_more::Deref;

use crate::domain::product;
#[cfg(doc)]
use crate::domain::{product::stock::Decrement, Product};

/// Indicator whether a [`Decrement`] has taken the [`Product`] units.
#[derive(Clone, Copy, Debug, Deref, Eq, Hash, PartialEq)]
pub struct Decremented(pub bool);

impl PartialEq<bool> for Decremented {
    fn eq(&self, other: &bool) -> bool {
        self.0 == *other
    }
}

/// Units of [`Product`]s available at the moment, by their IDs.
pub type Availability = HashMap<product::Id, u32>;
