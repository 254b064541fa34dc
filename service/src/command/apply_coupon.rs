//! [`Command`] for applying a [`Coupon`] to a [`Cart`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        cart::{self, pricing::Line, Contents, Pricing},
        coupon::{self, Rejection},
        Cart, Coupon,
    },
    infra::{database, Database},
    query,
    read::cart::{Source, View},
    Query, Service,
};

use super::Command;

/// [`Command`] for applying a [`Coupon`] to a [`Cart`].
///
/// The [`Cart`] stores the canonical [`coupon::Code`] of the [`Coupon`],
/// whatever case it was entered in.
#[derive(Clone, Debug)]
pub struct ApplyCoupon {
    /// ID of the [`Cart`] to apply the [`Coupon`] to.
    pub cart_id: cart::Id,

    /// [`coupon::Code`] entered by the customer.
    pub code: coupon::Code,
}

impl<Db> Command<ApplyCoupon> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Coupon>, coupon::Code>>,
            Ok = Option<Coupon>,
            Err = Traced<database::Error>,
        > + Database<Update<Cart>, Err = Traced<database::Error>>,
    Self: Query<
        query::cart::Lines,
        Ok = Vec<Line>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = View;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ApplyCoupon) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ApplyCoupon { cart_id, code } = cmd;

        let mut cart = self
            .database()
            .execute(Select(By::<Option<Cart>, _>::new(cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CartNotExists(cart_id))
            .map_err(tracerr::wrap!())?;
        let coupon = self
            .database()
            .execute(Select(By::new(code.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CouponNotExists(code))
            .map_err(tracerr::wrap!())?;

        let lines = self
            .execute(query::cart::Lines(cart.id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let contents = lines.iter().map(|l| &l.product).collect::<Contents>();
        _ = coupon
            .validate(&contents, cart.user_id, now.coerce())
            .map_err(E::NotApplicable)
            .map_err(tracerr::wrap!())?;

        let pricing = Pricing::compute(lines, Some(&coupon), cart.user_id, now);
        if cart.apply(&pricing) {
            self.database()
                .execute(Update(cart.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        Ok(View::new(cart, pricing, Source::Server))
    }
}

/// Error of [`ApplyCoupon`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Cart`] with the provided ID does not exist.
    #[display("`Cart(id: {_0})` does not exist")]
    #[from(ignore)]
    CartNotExists(#[error(not(source))] cart::Id),

    /// [`Coupon`] with the provided [`coupon::Code`] does not exist.
    #[display("`Coupon(code: {_0})` does not exist")]
    #[from(ignore)]
    CouponNotExists(#[error(not(source))] coupon::Code),

    /// [`Coupon`] cannot be applied to the [`Cart`].
    #[display("`Coupon` is not applicable: {_0}")]
    #[from(ignore)]
    NotApplicable(#[error(not(source))] Rejection),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            coupon::{self, Assignment, Rejection, Target},
            user::Role,
        },
        testing::{self, fixed, money, percent},
        Command as _,
    };

    use super::{ApplyCoupon, ExecutionError};

    fn code(s: &str) -> coupon::Code {
        coupon::Code::new(s).unwrap()
    }

    #[tokio::test]
    async fn stores_canonical_code_and_discounts() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "100.00", 5);
        _ = testing::coupon(db, "Save10", percent("10"), |_| {});
        let cart = testing::cart(db, None, &[(&p, 2)]);

        let view = service
            .execute(ApplyCoupon {
                cart_id: cart.id,
                code: code("  SAVE10 "),
            })
            .await
            .unwrap();

        assert_eq!(
            view.cart.coupon_code.as_ref().map(AsRef::<str>::as_ref),
            Some("Save10"),
        );
        assert_eq!(view.cart.snapshot.discount, money("20.00"));
        assert_eq!(view.cart.snapshot.total, money("180.00"));
        assert_eq!(
            db.read(|s| s.carts[&cart.id].snapshot.total),
            money("180.00"),
        );
    }

    #[tokio::test]
    async fn rejects_unknown_code() {
        let service = testing::service();
        let db = service.database();
        let cart = testing::cart(db, None, &[]);

        let err = service
            .execute(ApplyCoupon {
                cart_id: cart.id,
                code: code("NOPE"),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::CouponNotExists(_),
        ));
    }

    #[tokio::test]
    async fn rejects_coupon_of_another_customer() {
        let service = testing::service();
        let db = service.database();
        let (me, other) = (
            testing::user(db, Role::Customer),
            testing::user(db, Role::Customer),
        );
        let p = testing::product(db, "10.00", 5);
        _ = testing::coupon(db, "VIP", fixed("5"), |c| {
            c.assignments =
                vec![Assignment::customer(Target::Id(other.id.to_string()))];
        });
        let cart = testing::cart(db, Some(me.id), &[(&p, 1)]);

        let err = service
            .execute(ApplyCoupon {
                cart_id: cart.id,
                code: code("vip"),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::NotApplicable(Rejection::NotApplicable),
        ));
        assert_eq!(db.read(|s| s.carts[&cart.id].coupon_code.clone()), None);
    }

    #[tokio::test]
    async fn rejects_inactive_coupon() {
        let service = testing::service();
        let db = service.database();
        let cart = testing::cart(db, None, &[]);
        _ = testing::coupon(db, "OFF", fixed("5"), |c| c.is_active = false);

        let err = service
            .execute(ApplyCoupon {
                cart_id: cart.id,
                code: code("OFF"),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::NotApplicable(Rejection::Inactive),
        ));
    }
}
