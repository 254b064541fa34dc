//! [`Command`] for removing a [`Product`] from a [`Cart`].

use common::operations::{By, Delete, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Product;
use crate::{
    domain::{cart, product, Cart},
    infra::{database, Database},
    read::cart::View,
    Service,
};

use super::{recompute_cart, Command, RecomputeCart};

/// [`Command`] for removing a [`cart::Item`] from a [`Cart`].
///
/// Removing a [`Product`] the [`Cart`] doesn't hold is not an error.
#[derive(Clone, Copy, Debug)]
pub struct RemoveCartItem {
    /// ID of the [`Cart`] to remove from.
    pub cart_id: cart::Id,

    /// ID of the [`Product`] to remove.
    pub product_id: product::Id,
}

impl<Db> Command<RemoveCartItem> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<cart::Item, (cart::Id, product::Id)>>,
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
        cmd: RemoveCartItem,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RemoveCartItem {
            cart_id,
            product_id,
        } = cmd;

        drop(
            self.database()
                .execute(Select(By::<Option<Cart>, _>::new(cart_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CartNotExists(cart_id))
                .map_err(tracerr::wrap!())?,
        );
        self.database()
            .execute(Delete(By::<cart::Item, _>::new((cart_id, product_id))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.execute(RecomputeCart(cart_id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`RemoveCartItem`] [`Command`] execution.
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
