//! [`Command`] for reserving the stock of all the [`Product`]s in a
//! [`Cart`].

use common::operations::{By, Perform, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        cart,
        product::{self, stock},
        Cart, Product,
    },
    infra::{database, Database},
    read::product::{Availability, Decremented},
    Service,
};

use super::{release_stock, Command, ReleaseStock};

/// [`Command`] for taking the units of all the [`cart::Item`]s of a [`Cart`]
/// from the stock, all or nothing.
///
/// Every [`cart::Item`] is attempted in the order it was added, so all the
/// shortages are reported at once. If any of them fails, the units taken
/// for the others are returned.
///
/// Returns the performed [`stock::Decrement`]s, so that the caller may
/// return the units later if it fails to use them.
#[derive(Clone, Copy, Debug, From)]
pub struct ReserveCartStock(pub cart::Id);

impl<Db> Command<ReserveCartStock> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<cart::Item>, cart::Id>>,
            Ok = Vec<cart::Item>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Product>, product::Id>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<
            Perform<stock::Decrement>,
            Ok = Decremented,
            Err = Traced<database::Error>,
        >,
    Self: Command<
        ReleaseStock,
        Ok = (),
        Err = Traced<release_stock::ExecutionError>,
    >,
{
    type Ok = Vec<stock::Decrement>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ReserveCartStock(cart_id): ReserveCartStock,
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
        let items = self
            .database()
            .execute(Select(By::<Vec<cart::Item>, _>::new(cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut taken = Vec::with_capacity(items.len());
        let mut shortage = Availability::new();
        for item in items {
            let dec = stock::Decrement {
                product_id: item.product_id,
                quantity: item.quantity,
            };
            let outcome = self
                .database()
                .execute(Perform(dec))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E));
            match outcome {
                Ok(Decremented(true)) => taken.push(dec),
                Ok(Decremented(false)) => {
                    let available = self
                        .database()
                        .execute(Select(By::<Option<Product>, _>::new(
                            item.product_id,
                        )))
                        .await
                        .map_or(0, |p| p.map_or(0, |p| p.stock));
                    _ = shortage.insert(item.product_id, available);
                }
                Err(e) => {
                    self.release(taken).await?;
                    return Err(e);
                }
            }
        }

        if !shortage.is_empty() {
            self.release(taken).await?;
            return Err(tracerr::new!(E::OutOfStock(shortage)));
        }
        Ok(taken)
    }
}

impl<Db> Service<Db>
where
    Self: Command<
        ReleaseStock,
        Ok = (),
        Err = Traced<release_stock::ExecutionError>,
    >,
{
    /// Returns the `taken` units back to the stock.
    async fn release(
        &self,
        taken: Vec<stock::Decrement>,
    ) -> Result<(), Traced<ExecutionError>> {
        if taken.is_empty() {
            return Ok(());
        }
        self.execute(ReleaseStock {
            items: taken.into_iter().map(Into::into).collect(),
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))
    }
}

/// Error of [`ReserveCartStock`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to return the taken units after a shortage.
    #[display("Failed to release stock: {_0}")]
    Release(release_stock::ExecutionError),

    /// [`Cart`] with the provided ID does not exist.
    #[display("`Cart(id: {_0})` does not exist")]
    #[from(ignore)]
    CartNotExists(#[error(not(source))] cart::Id),

    /// Some [`Product`]s don't have enough units in stock.
    ///
    /// Holds the units currently available for each of them.
    #[display("Out of stock: {_0:?}")]
    #[from(ignore)]
    OutOfStock(#[error(not(source))] Availability),
}
