//! [`Command`] for creating a guest [`Cart`].

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{cart, Cart},
    infra::{database, Database},
    read::cart::{Source, View},
    Service,
};

use super::{recompute_cart, Command, RecomputeCart};

/// [`Command`] for creating a guest [`Cart`].
///
/// An `existing` [`Cart`] is reused if it still exists.
#[derive(Clone, Copy, Debug, Default)]
pub struct CreateGuestCart {
    /// ID of the [`Cart`] the client already holds, if any.
    pub existing: Option<cart::Id>,
}

/// Output of [`CreateGuestCart`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`View`] of the resulting [`Cart`].
    pub cart: View,

    /// Indicator whether the [`Cart`] has been created.
    pub is_new: bool,
}

impl<Db> Command<CreateGuestCart> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<Insert<Cart>, Err = Traced<database::Error>>,
    Self: Command<
        RecomputeCart,
        Ok = View,
        Err = Traced<recompute_cart::ExecutionError>,
    >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateGuestCart,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        if let Some(id) = cmd.existing {
            let found = self
                .database()
                .execute(Select(By::<Option<Cart>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if found.is_some() {
                let cart = self
                    .execute(RecomputeCart(id))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                return Ok(Output {
                    cart,
                    is_new: false,
                });
            }
        }

        let cart = Cart::new(None);
        self.database()
            .execute(Insert(cart.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(Output {
            cart: View {
                cart,
                lines: vec![],
                total_quantity: 0,
                source: Source::Server,
            },
            is_new: true,
        })
    }
}

/// Error of [`CreateGuestCart`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to recompute the existing [`Cart`].
    #[display("Failed to recompute `Cart`: {_0}")]
    Recompute(recompute_cart::ExecutionError),
}
