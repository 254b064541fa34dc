//! [`Command`] for deleting an [`Order`].

use common::operations::{By, Delete, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{order, Order},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting an [`Order`] along with its [`order::Item`]s on
/// behalf of an administrator.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteOrder(pub order::Id);

impl<Db> Command<DeleteOrder> for Service<Db>
where
    Db: Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Order, order::Id>>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DeleteOrder(id): DeleteOrder,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        drop(
            self.database()
                .execute(Select(By::<Option<Order>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::OrderNotExists(id))
                .map_err(tracerr::wrap!())?,
        );

        self.database()
            .execute(Delete(By::<Order, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)
    }
}

/// Error of [`DeleteOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),
}

#[cfg(test)]
mod spec {
    use crate::{domain::order, testing, Command as _};

    use super::{DeleteOrder, ExecutionError};

    #[tokio::test]
    async fn deletes_order() {
        let service = testing::service();
        let db = service.database();
        let (o, other) =
            (testing::order(db, None, &[]), testing::order(db, None, &[]));

        service.execute(DeleteOrder(o.id)).await.unwrap();

        assert!(db.read(|s| !s.orders.contains_key(&o.id)));
        assert!(db.read(|s| s.orders.contains_key(&other.id)));

        let err = service.execute(DeleteOrder(o.id)).await.unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::OrderNotExists(_),
        ));
    }

    #[tokio::test]
    async fn errors_on_unknown_order() {
        let service = testing::service();

        let err = service
            .execute(DeleteOrder(order::Id::new()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::OrderNotExists(_),
        ));
    }
}
