//! [`Command`] for removing a [`Coupon`] from a [`Cart`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Coupon;
use crate::{
    domain::{
        cart::{self, pricing::Line, Pricing},
        Cart,
    },
    infra::{database, Database},
    query,
    read::cart::{Source, View},
    Query, Service,
};

use super::Command;

/// [`Command`] for removing the applied [`Coupon`] from a [`Cart`].
#[derive(Clone, Copy, Debug, From)]
pub struct RemoveCoupon(pub cart::Id);

impl<Db> Command<RemoveCoupon> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
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
        RemoveCoupon(cart_id): RemoveCoupon,
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

        let pricing = Pricing::compute(lines, None, cart.user_id, DateTime::now());
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

/// Error of [`RemoveCoupon`] [`Command`] execution.
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
        testing::{self, fixed, money},
        Command as _,
    };

    use super::RemoveCoupon;

    #[tokio::test]
    async fn drops_coupon_and_discount() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "50.00", 5);
        let c = testing::coupon(db, "FIVE", fixed("5"), |_| {});
        let mut cart = testing::cart(db, None, &[(&p, 1)]);
        cart.coupon_code = Some(c.code);
        db.modify(|s| {
            _ = s.carts.insert(cart.id, cart.clone());
        });

        let view = service.execute(RemoveCoupon(cart.id)).await.unwrap();

        assert_eq!(view.cart.coupon_code, None);
        assert_eq!(view.cart.snapshot.discount, money("0"));
        assert_eq!(view.cart.snapshot.total, money("50.00"));
        assert_eq!(db.read(|s| s.carts[&cart.id].coupon_code.clone()), None);
    }
}
