//! [`Query`] collection related to a single [`Coupon`].

use common::{
    operations::{By, Select},
    DateTime, Money,
};
use tracerr::Traced;

use crate::{
    domain::{cart, coupon, user, Coupon},
    infra::{database, Database},
    read::coupon::Validation,
    Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Coupon`] by its [`coupon::Code`], ignoring ASCII case.
pub type ByCode = DatabaseQuery<By<Option<Coupon>, coupon::Code>>;

/// [`Query`] checking whether a [`Coupon`] applies to a selection of
/// products and categories of a customer, without redeeming it.
///
/// [`None`] is returned if there is no [`Coupon`] with the provided
/// [`coupon::Code`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidateCoupon {
    /// [`coupon::Code`] of the [`Coupon`] to validate.
    pub code: coupon::Code,

    /// ID of the customer to validate the [`Coupon`] for, if known.
    pub customer_id: Option<user::Id>,

    /// Selected products and their categories.
    pub contents: cart::Contents,

    /// Subtotal to calculate the discount amount of, if any.
    pub subtotal: Option<Money>,
}

impl<Db> Query<ValidateCoupon> for Service<Db>
where
    Db: Database<
        Select<By<Option<Coupon>, coupon::Code>>,
        Ok = Option<Coupon>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Validation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        query: ValidateCoupon,
    ) -> Result<Self::Ok, Self::Err> {
        let ValidateCoupon {
            code,
            customer_id,
            contents,
            subtotal,
        } = query;

        let Some(coupon) = self
            .database()
            .execute(Select(By::new(code)))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let verdict =
            coupon.validate(&contents, customer_id, DateTime::now().coerce());
        let discount_amount = subtotal
            .filter(|_| verdict.is_ok())
            .map_or(Money::ZERO, |s| coupon.discount.amount(s));

        Ok(Some(Validation {
            coupon,
            verdict,
            discount_amount,
        }))
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            cart,
            coupon::{self, Assignment, Rejection, Scope, Target},
        },
        testing::{self, fixed, money, percent},
        Query as _,
    };

    use super::ValidateCoupon;

    fn validate(code: &str, contents: cart::Contents) -> ValidateCoupon {
        ValidateCoupon {
            code: coupon::Code::new(code).unwrap(),
            customer_id: None,
            contents,
            subtotal: Some(money("80.00")),
        }
    }

    #[tokio::test]
    async fn unknown_code() {
        let service = testing::service();

        let res = service
            .execute(validate("NOPE", cart::Contents::default()))
            .await
            .unwrap();

        assert!(res.is_none());
    }

    #[tokio::test]
    async fn reports_scope_and_discount() {
        let service = testing::service();
        let db = service.database();
        let lamp = testing::product(db, "40.00", 3);
        let _ = testing::coupon(db, "LAMP25", percent("25"), |c| {
            c.assignments =
                vec![Assignment::product(Target::Id(lamp.id.to_string()))];
        });

        let v = service
            .execute(validate("lamp25", [&lamp].into_iter().collect()))
            .await
            .unwrap()
            .unwrap();

        assert!(v.is_valid());
        assert_eq!(v.verdict, Ok(Scope::Product));
        assert_eq!(v.discount_amount, money("20.00"));
    }

    #[tokio::test]
    async fn reports_rejection_without_discount() {
        let service = testing::service();
        let db = service.database();
        let _ = testing::coupon(db, "OFF", fixed("5"), |c| {
            c.is_active = false;
        });

        let v = service
            .execute(validate("OFF", cart::Contents::default()))
            .await
            .unwrap()
            .unwrap();

        assert!(!v.is_valid());
        assert_eq!(v.verdict, Err(Rejection::Inactive));
        assert_eq!(v.discount_amount, money("0"));
    }
}
