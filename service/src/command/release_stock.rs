//! [`Command`] for returning [`Product`] units to the stock.

use common::operations::Perform;
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::Product;
use crate::{
    domain::product::stock,
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for returning previously taken [`Product`] units to the
/// stock.
///
/// Every [`stock::Increment`] is attempted, even if some of them fail.
/// Each failure is logged as a critical anomaly, since the units it
/// concerns are lost for sale until fixed manually.
#[derive(Clone, Debug, Default)]
pub struct ReleaseStock {
    /// [`stock::Increment`]s to perform.
    pub items: Vec<stock::Increment>,
}

impl<Db> Command<ReleaseStock> for Service<Db>
where
    Db: Database<
        Perform<stock::Increment>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ReleaseStock) -> Result<Self::Ok, Self::Err> {
        let mut first_err = None;
        for inc in cmd.items {
            if let Err(e) = self.database().execute(Perform(inc)).await {
                log::error!(
                    "CRITICAL: failed to return {} unit(s) of \
                     `Product(id: {})` to the stock: {e}",
                    inc.quantity,
                    inc.product_id,
                );
                _ = first_err.get_or_insert(e);
            }
        }

        first_err
            .map_or(Ok(()), Err)
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))
    }
}

/// Error of [`ReleaseStock`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            cart::Quantity,
            product::{self, stock},
        },
        testing, Command as _,
    };

    use super::ReleaseStock;

    #[tokio::test]
    async fn returns_units() {
        let service = testing::service();
        let db = service.database();
        let (a, b) = (
            testing::product(db, "1.00", 0),
            testing::product(db, "1.00", 2),
        );

        service
            .execute(ReleaseStock {
                items: vec![
                    stock::Increment {
                        product_id: a.id,
                        quantity: Quantity::new(3).unwrap(),
                    },
                    stock::Increment {
                        product_id: product::Id::new(),
                        quantity: Quantity::ONE,
                    },
                    stock::Increment {
                        product_id: b.id,
                        quantity: Quantity::ONE,
                    },
                ],
            })
            .await
            .unwrap();

        assert_eq!(testing::stock(db, a.id), 3);
        assert_eq!(testing::stock(db, b.id), 3);
    }
}
