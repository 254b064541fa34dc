//! [`Assignment`] definitions.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{fmt, str::FromStr};

use common::define_kind;
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};

use crate::domain::{cart, user, Product};
#[cfg(doc)]
use crate::domain::Coupon;

/// Restriction of a [`Coupon`] to a product, category or customer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assignment {
    /// [`Kind`] of this [`Assignment`].
    pub kind: Kind,

    /// [`Target`] of this [`Assignment`].
    pub target: Target,
}

impl Assignment {
    /// Creates a new product [`Assignment`].
    #[must_use]
    pub fn product(target: Target) -> Self {
        Self {
            kind: Kind::Product,
            target,
        }
    }

    /// Creates a new category [`Assignment`].
    #[must_use]
    pub fn category(target: Target) -> Self {
        Self {
            kind: Kind::Category,
            target,
        }
    }

    /// Creates a new customer [`Assignment`].
    #[must_use]
    pub fn customer(target: Target) -> Self {
        Self {
            kind: Kind::Customer,
            target,
        }
    }

    /// Indicates whether this [`Assignment`] matches the provided
    /// [`cart::Contents`] or customer.
    ///
    /// Customer wildcard matches only a known customer.
    #[must_use]
    pub fn matches(
        &self,
        contents: &cart::Contents,
        customer_id: Option<user::Id>,
    ) -> bool {
        match self.kind {
            Kind::Customer => {
                customer_id.is_some_and(|id| self.target.matches(&id))
            }
            Kind::Product => {
                self.target.is_any()
                    || contents.product_ids().any(|id| self.target.matches(id))
            }
            Kind::Category => {
                self.target.is_any()
                    || contents
                        .category_ids()
                        .any(|id| self.target.matches(id))
            }
        }
    }

    /// Indicates whether this [`Assignment`] covers the provided [`Product`].
    ///
    /// Customer [`Assignment`]s never cover any [`Product`].
    #[must_use]
    pub fn covers(&self, product: &Product) -> bool {
        match self.kind {
            Kind::Customer => false,
            Kind::Product => self.target.matches(&product.id),
            Kind::Category => product
                .category_id
                .map_or(self.target.is_any(), |id| self.target.matches(&id)),
        }
    }
}

define_kind! {
    #[doc = "Kind of an [`Assignment`]."]
    enum Kind {
        #[doc = "[`Assignment`] to a product."]
        Product = 1,

        #[doc = "[`Assignment`] to a category."]
        Category = 2,

        #[doc = "[`Assignment`] to a customer."]
        Customer = 3,
    }
}

/// Target of an [`Assignment`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    /// Any entity of the [`Assignment`] [`Kind`].
    Any,

    /// Entity with the exact ID.
    Id(String),
}

impl Target {
    /// String representation of [`Target::Any`].
    pub const WILDCARD: &'static str = "*";

    /// Indicates whether this is a [`Target::Any`].
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Indicates whether this [`Target`] matches the provided ID.
    ///
    /// IDs are compared ignoring ASCII case.
    #[must_use]
    pub fn matches(&self, id: &impl fmt::Display) -> bool {
        match self {
            Self::Any => true,
            Self::Id(target) => target.eq_ignore_ascii_case(&id.to_string()),
        }
    }
}

impl FromStr for Target {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("empty `Target`"),
            Self::WILDCARD => Ok(Self::Any),
            id => Ok(Self::Id(id.to_owned())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(Self::WILDCARD),
            Self::Id(id) => f.write_str(id),
        }
    }
}

#[cfg(feature = "postgres")]
impl FromSql<'_> for Target {
    accepts!(VARCHAR, TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        <&str>::from_sql(ty, raw)?.parse().map_err(Into::into)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Target {
    accepts!(VARCHAR, TEXT);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.to_string().to_sql(ty, w)
    }
}

#[cfg(test)]
mod spec {
    use super::Target;

    #[test]
    fn parses_wildcard() {
        assert_eq!("*".parse::<Target>(), Ok(Target::Any));
        assert_eq!(" * ".parse::<Target>(), Ok(Target::Any));
        assert_eq!("abc".parse::<Target>(), Ok(Target::Id("abc".into())));
        assert!("".parse::<Target>().is_err());
        assert_eq!(Target::Any.to_string(), "*");
    }
}
