//! [`Command`] for clearing a [`Cart`].

use common::operations::{By, Delete, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{cart, Cart},
    infra::{database, Database},
    read::cart::View,
    Service,
};

use super::{recompute_cart, Command, RecomputeCart};

/// [`Command`] for removing all the [`cart::Item`]s of a [`Cart`].
#[derive(Clone, Copy, Debug, From)]
pub struct ClearCart(pub cart::Id);

impl<Db> Command<ClearCart> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Vec<cart::Item>, cart::Id>>,
            Err = Traced<database::Error>,
        >,
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
        ClearCart(cart_id): ClearCart,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        drop(
            self.database()
                .execute(Select(By::<Option<Cart>, _>::new(cart_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CartNotExists(cart_id))
                .map_err(tracerr::wrap!())?,
        );
        self.database()
            .execute(Delete(By::<Vec<cart::Item>, _>::new(cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.execute(RecomputeCart(cart_id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`ClearCart`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to recompute the [`Cart`].
    #[display("Failed to recompute `Cart`: {_0}")]
    Recompute(recompute_cart::ExecutionError),

    /// [`Cart`] with the provided ID does not exist.
    #[display("`Cart(id: {_0})` does not exist")]
    #[from(ignore)]
    CartNotExists(#[error(not(source))] cart::Id),
}

#[cfg(test)]
mod spec {
    use common::Money;

    use crate::{testing, Command as _};

    use super::ClearCart;

    #[tokio::test]
    async fn removes_every_line() {
        let service = testing::service();
        let db = service.database();
        let (a, b) = (
            testing::product(db, "1.00", 5),
            testing::product(db, "2.00", 5),
        );
        let cart = testing::cart(db, None, &[(&a, 1), (&b, 3)]);
        let other = testing::cart(db, None, &[(&a, 2)]);

        let view = service.execute(ClearCart(cart.id)).await.unwrap();

        assert!(view.lines.is_empty());
        assert_eq!(view.cart.snapshot.total, Money::ZERO);
        assert!(testing::items(db, cart.id).is_empty());
        assert_eq!(testing::items(db, other.id), vec![(a.id, 2)]);
    }
}
