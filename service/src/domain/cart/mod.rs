//! [`Cart`] definitions.

pub mod pricing;

use std::collections::HashSet;

use common::{define_kind, unit, DateTime, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{category, coupon, product, user, Product};

pub use self::pricing::Pricing;

/// Shopping cart of a guest or a registered [`User`].
///
/// [`Item`]s of a [`Cart`] are stored separately and addressed by the
/// [`Cart::id`].
///
/// [`User`]: crate::domain::User
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cart {
    /// ID of this [`Cart`].
    pub id: Id,

    /// ID of the [`User`] owning this [`Cart`], if it's not a guest one.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: Option<user::Id>,

    /// [`coupon::Code`] applied to this [`Cart`], if any.
    pub coupon_code: Option<coupon::Code>,

    /// Persisted monetary [`Snapshot`] of this [`Cart`].
    pub snapshot: Snapshot,

    /// [`DateTime`] when this [`Cart`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Cart`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Cart {
    /// Creates a new empty [`Cart`] owned by the provided [`User`], if any.
    ///
    /// [`User`]: crate::domain::User
    #[must_use]
    pub fn new(user_id: Option<user::Id>) -> Self {
        let now = DateTime::now();
        Self {
            id: Id::new(),
            user_id,
            coupon_code: None,
            snapshot: Snapshot::default(),
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    /// Applies the provided [`Pricing`] to this [`Cart`].
    ///
    /// Returns whether anything has changed, meaning this [`Cart`] should be
    /// persisted.
    pub fn apply(&mut self, pricing: &Pricing) -> bool {
        if self.snapshot == pricing.snapshot
            && self.coupon_code == pricing.coupon_code
        {
            return false;
        }

        self.snapshot = pricing.snapshot;
        self.coupon_code.clone_from(&pricing.coupon_code);
        self.touch();
        true
    }

    /// Resets this [`Cart`] to the empty state after its [`Item`]s have been
    /// ordered or removed.
    pub fn reset(&mut self) {
        self.coupon_code = None;
        self.snapshot = Snapshot::default();
        self.touch();
    }

    /// Marks this [`Cart`] as modified right now.
    pub fn touch(&mut self) {
        self.updated_at = DateTime::now().coerce();
    }
}

/// ID of a [`Cart`].
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
    PartialEq,
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

/// Monetary snapshot of a [`Cart`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Snapshot {
    /// Sum of all the line totals.
    pub subtotal: Money,

    /// Amount taken off by the applied [`Coupon`].
    ///
    /// [`Coupon`]: crate::domain::Coupon
    pub discount: Money,

    /// Amount to be paid.
    pub total: Money,
}

impl Snapshot {
    /// Creates a new [`Snapshot`] out of the provided `subtotal` and
    /// `discount`, never letting the total go below zero.
    #[must_use]
    pub fn new(subtotal: Money, discount: Money) -> Self {
        Self {
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount),
        }
    }
}

/// Line of a [`Cart`] holding some [`Quantity`] of a [`Product`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Item {
    /// ID of the [`Cart`] this [`Item`] belongs to.
    pub cart_id: Id,

    /// ID of the [`Product`] this [`Item`] holds.
    pub product_id: product::Id,

    /// [`Quantity`] of the [`Product`] units.
    pub quantity: Quantity,

    /// [`DateTime`] when this [`Item`] was added to the [`Cart`].
    pub created_at: ItemCreationDateTime,
}

impl Item {
    /// Creates a new [`Item`] of the provided [`Product`].
    #[must_use]
    pub fn new(cart_id: Id, product_id: product::Id, quantity: Quantity) -> Self {
        Self {
            cart_id,
            product_id,
            quantity,
            created_at: DateTime::now().coerce(),
        }
    }
}

/// Positive number of [`Product`] units.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Quantity(u32);

impl Quantity {
    /// Single unit.
    pub const ONE: Self = Self(1);

    /// Creates a new [`Quantity`] if the provided value is positive.
    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Creates a new [`Quantity`] of the `desired` units, limited by the
    /// units available in `stock`.
    ///
    /// [`None`] is returned if nothing is left after limiting, meaning no
    /// [`Item`] should be kept at all.
    #[must_use]
    pub fn clamped(desired: u32, stock: u32) -> Option<Self> {
        Self::new(desired.min(stock))
    }

    /// Returns the number of units.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Set of [`Product`]s and their categories present in a [`Cart`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Contents {
    /// IDs of the present [`Product`]s.
    product_ids: HashSet<product::Id>,

    /// IDs of the categories of the present [`Product`]s.
    category_ids: HashSet<category::Id>,
}

impl Contents {
    /// Creates new [`Contents`] out of the raw IDs.
    #[must_use]
    pub fn new(
        product_ids: impl IntoIterator<Item = product::Id>,
        category_ids: impl IntoIterator<Item = category::Id>,
    ) -> Self {
        Self {
            product_ids: product_ids.into_iter().collect(),
            category_ids: category_ids.into_iter().collect(),
        }
    }

    /// Iterates over IDs of the present [`Product`]s.
    pub fn product_ids(&self) -> impl Iterator<Item = &product::Id> {
        self.product_ids.iter()
    }

    /// Iterates over IDs of the categories of the present [`Product`]s.
    pub fn category_ids(&self) -> impl Iterator<Item = &category::Id> {
        self.category_ids.iter()
    }
}

impl<'p> FromIterator<&'p Product> for Contents {
    fn from_iter<I: IntoIterator<Item = &'p Product>>(iter: I) -> Self {
        let mut contents = Self::default();
        for p in iter {
            _ = contents.product_ids.insert(p.id);
            if let Some(category_id) = p.category_id {
                _ = contents.category_ids.insert(category_id);
            }
        }
        contents
    }
}

define_kind! {
    #[doc = "Strategy of merging a guest [`Cart`] into a [`User`] one."]
    enum MergeStrategy {
        #[doc = "Quantities of the same [`Product`] are summed up."]
        Sum = 1,

        #[doc = "Guest [`Cart`] quantities replace the existing ones."]
        Replace = 2,
    }
}

impl Default for MergeStrategy {
    fn default() -> Self {
        Self::Sum
    }
}

/// [`DateTime`] when a [`Cart`] was created.
pub type CreationDateTime = DateTimeOf<(Cart, unit::Creation)>;

/// [`DateTime`] when a [`Cart`] was modified.
pub type ModificationDateTime = DateTimeOf<(Cart, unit::Modification)>;

/// [`DateTime`] when an [`Item`] was added to a [`Cart`].
pub type ItemCreationDateTime = DateTimeOf<(Item, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::Quantity;

    #[test]
    fn quantity_is_clamped_to_stock() {
        assert_eq!(Quantity::clamped(5, 3), Quantity::new(3));
        assert_eq!(Quantity::clamped(2, 3), Quantity::new(2));
        assert_eq!(Quantity::clamped(2, 0), None);
        assert_eq!(Quantity::clamped(0, 10), None);
    }
}
