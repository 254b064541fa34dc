//! [`Coupon`] definitions.

pub mod assignment;
pub mod discount;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{cart, user, Product};

pub use self::{
    assignment::{Assignment, Target},
    discount::Discount,
};

/// Discount coupon.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Coupon {
    /// ID of this [`Coupon`].
    pub id: Id,

    /// [`Code`] customers apply this [`Coupon`] with.
    pub code: Code,

    /// [`Discount`] this [`Coupon`] grants.
    pub discount: Discount,

    /// [`DateTime`] after which this [`Coupon`] cannot be used anymore, if
    /// any.
    pub expires_at: Option<ExpirationDateTime>,

    /// Number of times this [`Coupon`] may be redeemed, if limited.
    pub max_uses: Option<u32>,

    /// Number of times this [`Coupon`] has been redeemed.
    pub used_count: u32,

    /// Indicator whether this [`Coupon`] is enabled by an administrator.
    pub is_active: bool,

    /// [`Assignment`]s restricting this [`Coupon`] applicability.
    ///
    /// No [`Assignment`]s means this [`Coupon`] applies to anything.
    pub assignments: Vec<Assignment>,
}

impl Coupon {
    /// Indicates whether this [`Coupon`] is expired at the provided moment,
    /// either by time or by exhausting its uses.
    #[must_use]
    pub fn is_expired(&self, now: ExpirationDateTime) -> bool {
        self.expires_at.is_some_and(|at| now > at)
            || self.max_uses.is_some_and(|max| self.used_count >= max)
    }

    /// Indicates whether this [`Coupon`] is active and not expired at the
    /// provided moment.
    #[must_use]
    pub fn is_usable(&self, now: ExpirationDateTime) -> bool {
        self.is_active && !self.is_expired(now)
    }

    /// Validates this [`Coupon`] against the provided [`cart::Contents`] and
    /// customer, resolving the [`Scope`] it applies within.
    ///
    /// When several [`Assignment`]s match, the [`Scope`] is chosen in the
    /// customer, product, category order.
    ///
    /// # Errors
    ///
    /// With a [`Rejection`] if this [`Coupon`] cannot be applied.
    pub fn validate(
        &self,
        contents: &cart::Contents,
        customer_id: Option<user::Id>,
        now: ExpirationDateTime,
    ) -> Result<Scope, Rejection> {
        if !self.is_active {
            return Err(Rejection::Inactive);
        }
        if self.is_expired(now) {
            return Err(Rejection::Expired);
        }
        if self.assignments.is_empty() {
            return Ok(Scope::Global);
        }

        [Scope::Customer, Scope::Product, Scope::Category]
            .into_iter()
            .find(|scope| {
                self.assignments
                    .iter()
                    .filter(|a| Scope::from(a.kind) == *scope)
                    .any(|a| a.matches(contents, customer_id))
            })
            .ok_or(Rejection::NotApplicable)
    }

    /// Resolves the [`Scope`] this [`Coupon`] applies within, if it does.
    ///
    /// See [`Coupon::validate()`] for details.
    #[must_use]
    pub fn scope(
        &self,
        contents: &cart::Contents,
        customer_id: Option<user::Id>,
        now: ExpirationDateTime,
    ) -> Option<Scope> {
        self.validate(contents, customer_id, now).ok()
    }

    /// Indicates whether this [`Coupon`] may be applied to the provided
    /// [`cart::Contents`] of the provided customer.
    ///
    /// Any single matching [`Assignment`] is enough.
    #[must_use]
    pub fn is_applicable(
        &self,
        contents: &cart::Contents,
        customer_id: Option<user::Id>,
        now: ExpirationDateTime,
    ) -> bool {
        self.scope(contents, customer_id, now).is_some()
    }

    /// Indicates whether the provided [`Product`] counts towards the
    /// subtotal this [`Coupon`] discounts.
    ///
    /// Only product and category [`Assignment`]s narrow the counted
    /// [`Product`]s. Without any of them every [`Product`] counts.
    #[must_use]
    pub fn covers(&self, product: &Product) -> bool {
        let mut narrowing = self
            .assignments
            .iter()
            .filter(|a| a.kind != assignment::Kind::Customer)
            .peekable();
        if narrowing.peek().is_none() {
            return true;
        }
        narrowing.any(|a| a.covers(product))
    }

    /// Calculates the discount this [`Coupon`] grants for the provided
    /// `(product, line total)` pairs.
    ///
    /// Applicability is not checked here, see [`Coupon::is_applicable()`].
    #[must_use]
    pub fn discount_for<'p>(
        &self,
        lines: impl IntoIterator<Item = (&'p Product, Money)>,
    ) -> Money {
        let applicable = lines
            .into_iter()
            .filter(|(product, _)| self.covers(product))
            .map(|(_, total)| total)
            .sum();
        self.discount.amount(applicable)
    }
}

/// Reason of a [`Coupon`] being not applicable.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum Rejection {
    /// [`Coupon`] is disabled by an administrator.
    #[display("Coupon inactive")]
    Inactive,

    /// [`Coupon`] is expired by time or by exhausting its uses.
    #[display("Coupon expired")]
    Expired,

    /// None of the [`Coupon`] [`Assignment`]s match.
    #[display("Coupon not applicable to selection")]
    NotApplicable,
}

/// Atomic redemption of a [`Coupon`].
///
/// Increments the [`Coupon::used_count`] only if it stays within the
/// [`Coupon::max_uses`], as a single conditional update.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Redeem {
    /// ID of the [`Coupon`] to redeem.
    pub coupon_id: Id,
}

/// ID of a [`Coupon`].
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

/// Code of a [`Coupon`].
///
/// Codes are compared ignoring ASCII case.
#[derive(AsRef, Clone, Debug, Display)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Code(String);

impl Code {
    /// Creates a new [`Code`] out of the provided input, trimming the
    /// surrounding whitespace.
    ///
    /// [`None`] is returned if nothing is left after trimming, or the input
    /// is not ASCII.
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Option<Self> {
        let code = code.as_ref().trim();
        Self::check(code).then(|| Self(code.to_owned()))
    }

    /// Checks whether the given `code` is a valid [`Code`].
    fn check(code: &str) -> bool {
        code.is_ascii()
            && !code.is_empty()
            && code.len() <= 64
            && !code.chars().any(char::is_whitespace)
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Code {}

impl FromStr for Code {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Code`")
    }
}

define_kind! {
    #[doc = "Scope a [`Coupon`] is applied within."]
    enum Scope {
        #[doc = "[`Coupon`] without any restrictions."]
        Global = 1,

        #[doc = "[`Coupon`] assigned to the customer."]
        Customer = 2,

        #[doc = "[`Coupon`] assigned to a product in the cart."]
        Product = 3,

        #[doc = "[`Coupon`] assigned to a category of a product in the cart."]
        Category = 4,
    }
}

impl From<assignment::Kind> for Scope {
    fn from(kind: assignment::Kind) -> Self {
        match kind {
            assignment::Kind::Customer => Self::Customer,
            assignment::Kind::Product => Self::Product,
            assignment::Kind::Category => Self::Category,
        }
    }
}

/// [`DateTime`] of a [`Coupon`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Coupon, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::{str::FromStr as _, time::Duration};

    use common::{DateTime, Money};

    use crate::domain::{cart, category, product, user, Product};

    use super::{
        Assignment, Code, Coupon, Discount, Id, Rejection, Scope, Target,
    };

    fn coupon(discount: Discount) -> Coupon {
        Coupon {
            id: Id::new(),
            code: Code::new("SAVE").unwrap(),
            discount,
            expires_at: None,
            max_uses: None,
            used_count: 0,
            is_active: true,
            assignments: vec![],
        }
    }

    fn fixed(amount: &str) -> Discount {
        Discount::Fixed(Money::from_str(amount).unwrap())
    }

    fn product(category_id: Option<category::Id>) -> Product {
        Product {
            id: product::Id::new(),
            name: product::Name::new("Lamp").unwrap(),
            price: Money::from_str("10.00").unwrap(),
            discounted_price: None,
            stock: 10,
            category_id,
        }
    }

    fn contents(products: &[&Product]) -> cart::Contents {
        products.iter().copied().collect()
    }

    #[test]
    fn codes_ignore_case() {
        assert_eq!(Code::new("save10").unwrap(), Code::new(" SAVE10 ").unwrap());
        assert_ne!(Code::new("SAVE10").unwrap(), Code::new("SAVE11").unwrap());
        assert!(Code::new("   ").is_none());
    }

    #[test]
    fn codes_are_ascii_only() {
        assert!(Code::new("ÉTÉ10").is_none());
        assert!(Code::new("straße").is_none());
        assert!(Code::new("SUMMER-10_x").is_some());
    }

    #[test]
    fn inactive_or_expired_is_never_applicable() {
        let now = DateTime::now().coerce();
        let empty = cart::Contents::default();

        let mut c = coupon(fixed("5"));
        c.is_active = false;
        assert!(!c.is_usable(now));
        assert!(!c.is_applicable(&empty, None, now));

        let mut c = coupon(fixed("5"));
        c.expires_at = Some(now - Duration::from_secs(1));
        assert!(c.is_expired(now));
        assert!(!c.is_usable(now));
        assert!(!c.is_applicable(&empty, None, now));

        let mut c = coupon(fixed("5"));
        c.max_uses = Some(3);
        c.used_count = 3;
        assert!(!c.is_applicable(&empty, None, now));

        c.used_count = 2;
        assert!(c.is_usable(now));
        assert!(c.is_applicable(&empty, None, now));
    }

    #[test]
    fn validation_reports_rejection_reason() {
        let now = DateTime::now().coerce();
        let empty = cart::Contents::default();

        let mut c = coupon(fixed("5"));
        c.is_active = false;
        c.used_count = 1;
        c.max_uses = Some(1);
        assert_eq!(c.validate(&empty, None, now), Err(Rejection::Inactive));

        c.is_active = true;
        assert_eq!(c.validate(&empty, None, now), Err(Rejection::Expired));

        c.max_uses = None;
        c.assignments = vec![Assignment::product(Target::Id("x".into()))];
        assert_eq!(
            c.validate(&empty, None, now),
            Err(Rejection::NotApplicable),
        );
        assert_eq!(
            Rejection::NotApplicable.to_string(),
            "Coupon not applicable to selection",
        );
    }

    #[test]
    fn no_assignments_means_global() {
        let now = DateTime::now().coerce();
        let c = coupon(fixed("5"));

        assert_eq!(
            c.scope(&cart::Contents::default(), None, now),
            Some(Scope::Global),
        );
    }

    #[test]
    fn any_matching_assignment_is_enough() {
        let now = DateTime::now().coerce();
        let lamp = product(Some(category::Id::from(uuid::Uuid::new_v4())));
        let other = product(None);

        let mut c = coupon(fixed("5"));
        c.assignments = vec![
            Assignment::product(Target::Id(other.id.to_string())),
            Assignment::category(Target::Id(
                lamp.category_id.unwrap().to_string(),
            )),
        ];

        assert!(c.is_applicable(&contents(&[&lamp]), None, now));
        assert_eq!(
            c.scope(&contents(&[&lamp]), None, now),
            Some(Scope::Category),
        );
        assert!(!c.is_applicable(&contents(&[&product(None)]), None, now));
    }

    #[test]
    fn customer_wildcard_requires_customer() {
        let now = DateTime::now().coerce();
        let mut c = coupon(fixed("5"));
        c.assignments = vec![Assignment::customer(Target::Any)];

        assert!(!c.is_applicable(&cart::Contents::default(), None, now));
        assert_eq!(
            c.scope(&cart::Contents::default(), Some(user::Id::new()), now),
            Some(Scope::Customer),
        );
    }

    #[test]
    fn customer_assignment_matches_exact_customer() {
        let now = DateTime::now().coerce();
        let me = user::Id::new();
        let mut c = coupon(fixed("5"));
        c.assignments = vec![Assignment::customer(Target::Id(
            me.to_string().to_uppercase(),
        ))];

        assert!(c.is_applicable(&cart::Contents::default(), Some(me), now));
        assert!(!c.is_applicable(
            &cart::Contents::default(),
            Some(user::Id::new()),
            now,
        ));
    }

    #[test]
    fn product_wildcard_matches_any_cart() {
        let now = DateTime::now().coerce();
        let mut c = coupon(fixed("5"));
        c.assignments = vec![Assignment::product(Target::Any)];

        assert!(c.is_applicable(&cart::Contents::default(), None, now));
    }

    #[test]
    fn customer_assignments_do_not_narrow_lines() {
        let mut c = coupon(fixed("100"));
        c.assignments = vec![Assignment::customer(Target::Any)];
        let (a, b) = (product(None), product(None));

        assert_eq!(
            c.discount_for([
                (&a, Money::from_str("10.00").unwrap()),
                (&b, Money::from_str("5.00").unwrap()),
            ]),
            Money::from_str("15.00").unwrap(),
        );
    }

    #[test]
    fn product_assignments_narrow_lines() {
        let (a, b) = (product(None), product(None));
        let mut c = coupon(Discount::Percent("50".parse().unwrap()));
        c.assignments = vec![
            Assignment::customer(Target::Any),
            Assignment::product(Target::Id(a.id.to_string())),
        ];

        assert_eq!(
            c.discount_for([
                (&a, Money::from_str("10.00").unwrap()),
                (&b, Money::from_str("30.00").unwrap()),
            ]),
            Money::from_str("5.00").unwrap(),
        );
    }
}
