//! [`Order`] definitions.

pub mod payment;

use std::{fmt, time::Duration};

use common::{define_kind, unit, DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{cart, coupon, product, user, User};

pub use self::payment::{Method as PaymentMethod, Payment};

/// Immutable snapshot of a [`Cart`] taken at the checkout.
///
/// Only the [`Order::status`] changes after the [`Order`] is placed.
///
/// [`Cart`]: crate::domain::Cart
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    /// ID of this [`Order`].
    pub id: Id,

    /// Sequential [`Number`] of this [`Order`] shown to humans.
    pub number: Number,

    /// ID of the [`User`] who placed this [`Order`], if not a guest.
    pub user_id: Option<user::Id>,

    /// Current [`Status`] of this [`Order`].
    pub status: Status,

    /// [`PaymentMethod`] chosen for this [`Order`].
    pub payment_method: PaymentMethod,

    /// [`Contact`] of the recipient.
    pub contact: Contact,

    /// [`ShippingAddress`] this [`Order`] is delivered to.
    pub shipping_address: ShippingAddress,

    /// Monetary figures copied from the [`Cart`] as is.
    ///
    /// [`Cart`]: crate::domain::Cart
    pub snapshot: cart::Snapshot,

    /// [`coupon::Code`] that was applied to the [`Cart`], if any.
    ///
    /// [`Cart`]: crate::domain::Cart
    pub coupon_code: Option<coupon::Code>,

    /// Ordered [`Item`]s.
    pub items: Vec<Item>,

    /// [`DateTime`] when this [`Order`] was placed.
    pub created_at: CreationDateTime,
}

impl Order {
    /// Indicates whether this [`Order`] may be viewed by the provided
    /// [`User`].
    ///
    /// Guest [`Order`]s are visible to anyone knowing their [`Id`] or
    /// [`Number`], while others only to their owners and administrators.
    #[must_use]
    pub fn is_visible_to(&self, viewer: Option<&User>) -> bool {
        match self.user_id {
            None => true,
            Some(owner) => {
                viewer.is_some_and(|u| u.id == owner || u.is_admin())
            }
        }
    }

    /// Checks whether this [`Order`] may be cancelled by the provided
    /// [`User`] at the provided moment.
    ///
    /// # Errors
    ///
    /// See [`CancellationError`] for details.
    pub fn check_cancellable(
        &self,
        by: user::Id,
        now: DateTime,
        window: Duration,
    ) -> Result<(), CancellationError> {
        use CancellationError as E;

        if self.user_id != Some(by) {
            return Err(E::NotOwner);
        }
        if matches!(self.status, Status::Cancelled | Status::Delivered) {
            return Err(E::Final(self.status));
        }
        if now.duration_since(self.created_at) >= window {
            return Err(E::WindowExpired);
        }
        Ok(())
    }
}

/// Error of cancelling an [`Order`] by its owner.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum CancellationError {
    /// [`Order`] doesn't belong to the [`User`].
    #[display("`Order` belongs to another `User`")]
    NotOwner,

    /// [`Order`] is in a final [`Status`] already.
    #[display("`Order` is `{_0}` already")]
    Final(#[error(not(source))] Status),

    /// Cancellation window of the [`Order`] has passed.
    #[display("`Order` cancellation window has expired")]
    WindowExpired,
}

/// ID of an [`Order`].
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

/// Sequential number of an [`Order`] assigned by the store.
///
/// Displayed padded with zeroes to three digits, like `007`.
#[derive(
    Clone, Copy, Debug, Eq, From, FromStr, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Number(i32);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Allocation of the next [`Number`] for an [`Order`] being placed.
///
/// Allocated [`Number`]s are never reused, even if the [`Order`] is not
/// placed eventually.
#[derive(Clone, Copy, Debug)]
pub struct AllocateNumber;

/// Line of an [`Order`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Item {
    /// ID of the ordered [`Product`].
    ///
    /// [`Product`]: crate::domain::Product
    pub product_id: product::Id,

    /// Name of the [`Product`] at the moment of ordering.
    ///
    /// [`Product`]: crate::domain::Product
    pub name: product::Name,

    /// Effective unit price at the moment of ordering.
    pub price: Money,

    /// Ordered [`cart::Quantity`].
    pub quantity: cart::Quantity,
}

/// Contact details of an [`Order`] recipient.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Contact {
    /// Name of the recipient.
    pub name: Option<String>,

    /// Email of the recipient.
    pub email: Option<String>,

    /// Phone of the recipient.
    pub phone: Option<String>,
}

/// Postal address an [`Order`] is delivered to.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Address {
    /// Street address.
    pub street: Option<String>,

    /// City.
    pub city: Option<String>,

    /// Postal code.
    pub postal_code: Option<String>,
}

/// Printable shipping label of an [`Order`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ShippingAddress(String);

impl ShippingAddress {
    /// Composes a new [`ShippingAddress`] out of the provided [`Contact`]
    /// and [`Address`], one non-blank part per line and the city followed
    /// by the postal code on the last one.
    #[must_use]
    pub fn new(contact: &Contact, address: &Address) -> Self {
        fn filled(s: Option<&str>) -> Option<&str> {
            Some(s?.trim()).filter(|s| !s.is_empty())
        }

        let mut lines = [
            contact.name.as_deref(),
            contact.email.as_deref(),
            contact.phone.as_deref(),
            address.street.as_deref(),
        ]
        .into_iter()
        .filter_map(filled)
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();

        let locality =
            [address.city.as_deref(), address.postal_code.as_deref()]
                .into_iter()
                .filter_map(filled)
                .collect::<Vec<_>>()
                .join(" ");
        if !locality.is_empty() {
            lines.push(locality);
        }

        Self(lines.join("\n"))
    }
}

define_kind! {
    #[doc = "Status of an [`Order`]."]
    enum Status {
        #[doc = "[`Order`] is placed and awaits processing."]
        Pending = 1,

        #[doc = "[`Order`] is being prepared."]
        Processing = 2,

        #[doc = "[`Order`] is handed over to a carrier."]
        Shipped = 3,

        #[doc = "[`Order`] is delivered to the recipient."]
        Delivered = 4,

        #[doc = "[`Order`] is cancelled."]
        Cancelled = 5,
    }
}

/// [`DateTime`] when an [`Order`] was placed.
pub type CreationDateTime = DateTimeOf<(Order, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{
        cart, user::{self, Role},
        User,
    };

    use super::{
        Address, CancellationError, Contact, Id, Number, Order, PaymentMethod,
        ShippingAddress, Status,
    };

    const WINDOW: Duration = Duration::from_secs(12 * 60 * 60);

    fn order(user_id: Option<user::Id>, created_at: DateTime) -> Order {
        Order {
            id: Id::new(),
            number: Number::from(1),
            user_id,
            status: Status::Pending,
            payment_method: PaymentMethod::Cod,
            contact: Contact::default(),
            shipping_address: ShippingAddress::new(
                &Contact::default(),
                &Address::default(),
            ),
            snapshot: cart::Snapshot::default(),
            coupon_code: None,
            items: vec![],
            created_at: created_at.coerce(),
        }
    }

    #[test]
    fn number_is_zero_padded() {
        assert_eq!(Number::from(7).to_string(), "007");
        assert_eq!(Number::from(1234).to_string(), "1234");
    }

    #[test]
    fn shipping_address_skips_blank_parts() {
        let contact = Contact {
            name: Some("Ann".into()),
            email: Some("  ".into()),
            phone: Some("+100200300".into()),
        };
        let address = Address {
            street: Some("1 Main St".into()),
            city: Some("Springfield".into()),
            postal_code: Some("12345".into()),
        };

        assert_eq!(
            ShippingAddress::new(&contact, &address).to_string(),
            "Ann\n+100200300\n1 Main St\nSpringfield 12345",
        );
        assert_eq!(
            ShippingAddress::new(&Contact::default(), &Address::default())
                .to_string(),
            "",
        );
    }

    #[test]
    fn visibility() {
        let owner = User {
            id: user::Id::new(),
            role: Role::Customer,
        };
        let stranger = User {
            id: user::Id::new(),
            role: Role::Customer,
        };
        let admin = User {
            id: user::Id::new(),
            role: Role::Admin,
        };

        let guest = order(None, DateTime::now());
        assert!(guest.is_visible_to(None));
        assert!(guest.is_visible_to(Some(&stranger)));

        let owned = order(Some(owner.id), DateTime::now());
        assert!(owned.is_visible_to(Some(&owner)));
        assert!(owned.is_visible_to(Some(&admin)));
        assert!(!owned.is_visible_to(Some(&stranger)));
        assert!(!owned.is_visible_to(None));
    }

    #[test]
    fn cancellation_window() {
        let me = user::Id::new();
        let placed = DateTime::now();
        let o = order(Some(me), placed);

        let almost = placed + WINDOW - Duration::from_secs(60);
        assert_eq!(o.check_cancellable(me, almost, WINDOW), Ok(()));
        assert_eq!(
            o.check_cancellable(me, placed + WINDOW, WINDOW),
            Err(CancellationError::WindowExpired),
        );
        assert_eq!(
            o.check_cancellable(me, placed + WINDOW * 2, WINDOW),
            Err(CancellationError::WindowExpired),
        );
    }

    #[test]
    fn only_owner_cancels_non_final_order() {
        let me = user::Id::new();
        let now = DateTime::now();

        assert_eq!(
            order(None, now).check_cancellable(me, now, WINDOW),
            Err(CancellationError::NotOwner),
        );
        assert_eq!(
            order(Some(user::Id::new()), now).check_cancellable(me, now, WINDOW),
            Err(CancellationError::NotOwner),
        );

        let mut o = order(Some(me), now);
        for status in [Status::Cancelled, Status::Delivered] {
            o.status = status;
            assert_eq!(
                o.check_cancellable(me, now, WINDOW),
                Err(CancellationError::Final(status)),
            );
        }
        o.status = Status::Shipped;
        assert_eq!(o.check_cancellable(me, now, WINDOW), Ok(()));
    }
}
