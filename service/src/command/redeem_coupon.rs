//! [`Command`] for redeeming a [`Coupon`].

use common::{
    operations::{By, Perform, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        cart,
        coupon::{self, Rejection},
        user, Coupon,
    },
    infra::{database, Database},
    read::coupon::UsedCount,
    Service,
};

use super::Command;

/// [`Command`] for redeeming a [`Coupon`] once by a customer.
///
/// The [`Coupon`] is validated the same way as on applying it to a
/// [`Cart`], and its usage counter is incremented only while it stays
/// below the limit, so concurrent redemptions never exceed it.
///
/// [`Cart`]: crate::domain::Cart
#[derive(Clone, Debug)]
pub struct RedeemCoupon {
    /// [`coupon::Code`] of the [`Coupon`] to redeem.
    pub code: coupon::Code,

    /// ID of the customer redeeming the [`Coupon`], if known.
    pub customer_id: Option<user::Id>,

    /// Products and categories the [`Coupon`] is redeemed for.
    pub contents: cart::Contents,
}

impl<Db> Command<RedeemCoupon> for Service<Db>
where
    Db: Database<
            Select<By<Option<Coupon>, coupon::Code>>,
            Ok = Option<Coupon>,
            Err = Traced<database::Error>,
        > + Database<
            Perform<coupon::Redeem>,
            Ok = Option<UsedCount>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = UsedCount;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RedeemCoupon) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RedeemCoupon {
            code,
            customer_id,
            contents,
        } = cmd;

        let coupon = self
            .database()
            .execute(Select(By::new(code.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CouponNotExists(code))
            .map_err(tracerr::wrap!())?;
        _ = coupon
            .validate(&contents, customer_id, DateTime::now().coerce())
            .map_err(E::Rejected)
            .map_err(tracerr::wrap!())?;

        self.database()
            .execute(Perform(coupon::Redeem {
                coupon_id: coupon.id,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UsageLimitReached(coupon.code))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`RedeemCoupon`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Coupon`] with the provided code does not exist.
    #[display("`Coupon(code: {_0})` does not exist")]
    #[from(ignore)]
    CouponNotExists(#[error(not(source))] coupon::Code),

    /// [`Coupon`] cannot be redeemed for the provided contents.
    #[display("`Coupon` is not applicable: {_0}")]
    #[from(ignore)]
    Rejected(#[error(not(source))] Rejection),

    /// [`Coupon`] has been redeemed the maximum number of times.
    #[display("`Coupon(code: {_0})` usage limit is reached")]
    #[from(ignore)]
    UsageLimitReached(#[error(not(source))] coupon::Code),
}

#[cfg(test)]
mod spec {
    use futures::future;

    use crate::{
        domain::{
            cart,
            coupon::{self, Assignment, Rejection, Target},
            user::Role,
        },
        testing::{self, fixed},
        Command as _,
    };

    use super::{ExecutionError, RedeemCoupon};

    fn redeem(code: &str) -> RedeemCoupon {
        RedeemCoupon {
            code: coupon::Code::new(code).unwrap(),
            customer_id: None,
            contents: cart::Contents::default(),
        }
    }

    #[tokio::test]
    async fn counts_usages() {
        let service = testing::service();
        let db = service.database();
        let c = testing::coupon(db, "ONCE", fixed("5"), |c| {
            c.max_uses = Some(2);
        });

        let first = service.execute(redeem("once")).await.unwrap();
        let second = service.execute(redeem("ONCE")).await.unwrap();
        let err = service.execute(redeem("ONCE")).await.unwrap_err();

        assert_eq!(u32::from(first), 1);
        assert_eq!(u32::from(second), 2);
        // Exhausted `Coupon`s are rejected as expired before the counter is
        // even touched.
        assert!(matches!(
            err.into_inner(),
            ExecutionError::Rejected(Rejection::Expired),
        ));
        assert_eq!(db.read(|s| s.coupons[&c.id].used_count), 2);
    }

    #[tokio::test]
    async fn never_exceeds_limit_concurrently() {
        let service = testing::service();
        let db = service.database();
        let c = testing::coupon(db, "FEW", fixed("5"), |c| {
            c.max_uses = Some(3);
        });

        let results =
            future::join_all((0..10).map(|_| service.execute(redeem("FEW"))))
                .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
        assert_eq!(db.read(|s| s.coupons[&c.id].used_count), 3);
    }

    #[tokio::test]
    async fn validates_before_redeeming() {
        let service = testing::service();
        let db = service.database();
        let owner = testing::user(db, Role::Customer);
        let c = testing::coupon(db, "MINE", fixed("5"), |c| {
            c.assignments =
                vec![Assignment::customer(Target::Id(owner.id.to_string()))];
        });

        let err = service.execute(redeem("MINE")).await.unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::Rejected(Rejection::NotApplicable),
        ));
        assert_eq!(db.read(|s| s.coupons[&c.id].used_count), 0);

        _ = service
            .execute(RedeemCoupon {
                customer_id: Some(owner.id),
                ..redeem("MINE")
            })
            .await
            .unwrap();
        assert_eq!(db.read(|s| s.coupons[&c.id].used_count), 1);

        let err = service.execute(redeem("NOPE")).await.unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::CouponNotExists(_),
        ));
    }
}
