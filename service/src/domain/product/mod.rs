//! [`Product`] definitions.

pub mod stock;

use common::Money;
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::category;

/// Catalog product.
///
/// Products are managed by the catalog, while this service only reads them
/// and moves their stock with the [`stock`] operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Product {
    /// ID of this [`Product`].
    pub id: Id,

    /// [`Name`] of this [`Product`].
    pub name: Name,

    /// List price of this [`Product`].
    pub price: Money,

    /// Reduced price of this [`Product`], if any.
    pub discounted_price: Option<Money>,

    /// Number of units of this [`Product`] available for sale.
    pub stock: u32,

    /// ID of the category this [`Product`] belongs to, if any.
    pub category_id: Option<category::Id>,
}

impl Product {
    /// Returns the price a single unit of this [`Product`] is sold for.
    ///
    /// That's the [`Product::discounted_price`] if it's set and is lower
    /// than the [`Product::price`], or the [`Product::price`] otherwise.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        self.discounted_price
            .filter(|d| *d < self.price)
            .unwrap_or(self.price)
    }

    /// Indicates whether this [`Product`] has any units left.
    #[must_use]
    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// ID of a [`Product`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name of a [`Product`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 255
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}
