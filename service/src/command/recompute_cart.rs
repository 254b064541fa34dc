//! [`Command`] for recomputing a [`Cart`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        cart::{self, pricing::Line, Pricing},
        coupon, Cart, Coupon,
    },
    infra::{database, Database},
    query,
    read::cart::{Source, View},
    Query, Service,
};

use super::Command;

/// [`Command`] for recomputing a [`Cart`] out of the live [`Product`]s.
///
/// The applied [`Coupon`] is dropped if it doesn't apply anymore. The
/// [`Cart`] is persisted only if its figures or [`Coupon`] have changed.
///
/// [`Product`]: crate::domain::Product
#[derive(Clone, Copy, Debug, From)]
pub struct RecomputeCart(pub cart::Id);

impl<Db> Command<RecomputeCart> for Service<Db>
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

    async fn execute(
        &self,
        RecomputeCart(cart_id): RecomputeCart,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let mut cart = self
            .database()
            .execute(Select(By::<Option<Cart>, _>::new(cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CartNotExists(cart_id))
            .map_err(tracerr::wrap!())?;

        let lines = self
            .execute(query::cart::Lines(cart.id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let coupon = match cart.coupon_code.clone() {
            Some(code) => self
                .database()
                .execute(Select(By::new(code)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            None => None,
        };

        let pricing = Pricing::compute(
            lines,
            coupon.as_ref(),
            cart.user_id,
            DateTime::now(),
        );
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

/// Error of [`RecomputeCart`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Cart`] with the provided ID does not exist.
    #[display("`Cart(id: {_0})` does not exist")]
    #[from(ignore)]
    CartNotExists(#[error(not(source))] cart::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::coupon::{Assignment, Target},
        read::cart::Source,
        testing::{self, fixed, money},
        Command as _,
    };

    use super::RecomputeCart;

    #[tokio::test]
    async fn prices_lines_and_applies_coupon() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "100.00", 5);
        let c = testing::coupon(db, "SAVE15", fixed("15"), |_| {});
        let mut cart = testing::cart(db, None, &[(&p, 2)]);
        cart.coupon_code = Some(c.code.clone());
        db.modify(|s| {
            _ = s.carts.insert(cart.id, cart.clone());
        });

        let view = service.execute(RecomputeCart(cart.id)).await.unwrap();

        assert_eq!(view.source, Source::Server);
        assert_eq!(view.total_quantity, 2);
        assert_eq!(view.cart.snapshot.subtotal, money("200.00"));
        assert_eq!(view.cart.snapshot.discount, money("15.00"));
        assert_eq!(view.cart.snapshot.total, money("185.00"));
        assert_eq!(
            db.read(|s| s.carts[&cart.id].snapshot),
            view.cart.snapshot,
        );
    }

    #[tokio::test]
    async fn heals_coupon_that_no_longer_applies() {
        let service = testing::service();
        let db = service.database();
        let (a, b) = (
            testing::product(db, "10.00", 5),
            testing::product(db, "20.00", 5),
        );
        let c = testing::coupon(db, "ONLY_A", fixed("5"), |c| {
            c.assignments =
                vec![Assignment::product(Target::Id(a.id.to_string()))];
        });
        let mut cart = testing::cart(db, None, &[(&b, 1)]);
        cart.coupon_code = Some(c.code);
        db.modify(|s| {
            _ = s.carts.insert(cart.id, cart.clone());
        });

        let view = service.execute(RecomputeCart(cart.id)).await.unwrap();

        assert_eq!(view.cart.coupon_code, None);
        assert_eq!(view.cart.snapshot.total, money("20.00"));
        assert_eq!(db.read(|s| s.carts[&cart.id].coupon_code.clone()), None);
    }

    #[tokio::test]
    async fn does_not_touch_unchanged_cart() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "3.50", 5);
        let cart = testing::cart(db, None, &[(&p, 2)]);

        let first = service.execute(RecomputeCart(cart.id)).await.unwrap();
        let second = service.execute(RecomputeCart(cart.id)).await.unwrap();

        assert_eq!(first.cart.updated_at, second.cart.updated_at);
        assert_eq!(second.cart.snapshot.total, money("7.00"));
    }

    #[tokio::test]
    async fn drops_removed_products() {
        let service = testing::service();
        let db = service.database();
        let (kept, gone) = (
            testing::product(db, "1.00", 5),
            testing::product(db, "2.00", 5),
        );
        let cart = testing::cart(db, None, &[(&kept, 1), (&gone, 1)]);
        db.modify(|s| {
            _ = s.products.remove(&gone.id);
        });

        let view = service.execute(RecomputeCart(cart.id)).await.unwrap();

        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.cart.snapshot.total, money("1.00"));
    }

    #[tokio::test]
    async fn errors_on_unknown_cart() {
        let service = testing::service();

        let err = service
            .execute(RecomputeCart(crate::domain::cart::Id::new()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            super::ExecutionError::CartNotExists(_),
        ));
    }
}
