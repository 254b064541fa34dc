//! [`Command`] for getting the [`Cart`] of a [`User`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, Cart},
    infra::{database, Database},
    read::cart::View,
    Service,
};
#[cfg(doc)]
use crate::domain::User;

use super::{recompute_cart, Command, RecomputeCart};

/// [`Command`] for getting the recomputed [`Cart`] of a [`User`], creating
/// it on the first access.
#[derive(Clone, Copy, Debug, From)]
pub struct GetUserCart(pub user::Id);

impl<Db> Command<GetUserCart> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, user::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Cart, user::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Cart>, user::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<Insert<Cart>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Self: Command<
        RecomputeCart,
        Ok = View,
        Err = Traced<recompute_cart::ExecutionError>,
    >,
{
    type Ok = View;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        GetUserCart(user_id): GetUserCart,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let existing = self
            .database()
            .execute(Select(By::<Option<Cart>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let cart_id = if let Some(cart) = existing {
            cart.id
        } else {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            tx.execute(Lock(By::<Cart, _>::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            // Someone may have created it while we were waiting for the lock.
            let cart = match tx
                .execute(Select(By::<Option<Cart>, _>::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            {
                Some(cart) => cart,
                None => {
                    let cart = Cart::new(Some(user_id));
                    tx.execute(Insert(cart.clone()))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))
                        .map(drop)?;
                    cart
                }
            };
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            cart.id
        };

        self.execute(RecomputeCart(cart_id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`GetUserCart`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to recompute the [`Cart`].
    #[display("Failed to recompute `Cart`: {_0}")]
    Recompute(recompute_cart::ExecutionError),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::user::Role,
        testing::{self, money},
        Command as _,
    };

    use super::GetUserCart;

    #[tokio::test]
    async fn creates_cart_on_first_access() {
        let service = testing::service();
        let db = service.database();
        let u = testing::user(db, Role::Customer);

        let first = service.execute(GetUserCart(u.id)).await.unwrap();
        let second = service.execute(GetUserCart(u.id)).await.unwrap();

        assert_eq!(first.cart.user_id, Some(u.id));
        assert_eq!(first.cart.id, second.cart.id);
        assert_eq!(
            db.read(|s| {
                s.carts.values().filter(|c| c.user_id == Some(u.id)).count()
            }),
            1,
        );
    }

    #[tokio::test]
    async fn recomputes_existing_cart() {
        let service = testing::service();
        let db = service.database();
        let u = testing::user(db, Role::Customer);
        let p = testing::product(db, "12.00", 10);
        let cart = testing::cart(db, Some(u.id), &[(&p, 3)]);

        let view = service.execute(GetUserCart(u.id)).await.unwrap();

        assert_eq!(view.cart.id, cart.id);
        assert_eq!(view.cart.snapshot.total, money("36.00"));
    }
}
