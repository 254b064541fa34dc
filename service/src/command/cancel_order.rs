//! [`Command`] for cancelling an [`Order`] by its owner.

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{
        order::{self, CancellationError},
        user, Order,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling an [`Order`] by the [`User`] who placed it.
///
/// Only non-final [`Order`]s may be cancelled, and only within the
/// configured cancellation window since they were placed.
///
/// Cancelling doesn't return the ordered units to the stock.
#[derive(Clone, Copy, Debug)]
pub struct CancelOrder {
    /// ID of the [`Order`] to cancel.
    pub order_id: order::Id,

    /// ID of the [`User`] cancelling the [`Order`].
    pub user_id: user::Id,
}

impl<Db> Command<CancelOrder> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Order, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<Update<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CancelOrder) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelOrder { order_id, user_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::<Order, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        order
            .check_cancellable(
                user_id,
                DateTime::now(),
                self.config().order_cancellation_window,
            )
            .map_err(E::NotCancellable)
            .map_err(tracerr::wrap!())?;

        order.status = order::Status::Cancelled;
        tx.execute(Update(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(order)
    }
}

/// Error of [`CancelOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`Order`] cannot be cancelled.
    #[display("`Order` cannot be cancelled: {_0}")]
    #[from(ignore)]
    NotCancellable(#[error(not(source))] CancellationError),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::{
        domain::{
            order::{self, CancellationError, Status},
            user::{self, Role},
            Order,
        },
        infra::Memory,
        testing, Command as _,
    };

    use super::{CancelOrder, ExecutionError};

    /// Stores a new [`Order`] placed at the provided moment.
    fn placed(
        db: &Memory,
        user_id: Option<user::Id>,
        at: DateTime,
    ) -> Order {
        let mut o = testing::order(db, user_id, &[]);
        o.created_at = at.coerce();
        db.modify(|s| {
            _ = s.orders.insert(o.id, o.clone());
        });
        o
    }

    #[tokio::test]
    async fn cancels_own_recent_order() {
        let service = testing::service();
        let db = service.database();
        let me = testing::user(db, Role::Customer);
        let o = placed(db, Some(me.id), DateTime::now());

        let cancelled = service
            .execute(CancelOrder {
                order_id: o.id,
                user_id: me.id,
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, Status::Cancelled);
        assert_eq!(db.read(|s| s.orders[&o.id].status), Status::Cancelled);
    }

    #[tokio::test]
    async fn refuses_after_window() {
        let service = testing::service();
        let db = service.database();
        let me = testing::user(db, Role::Customer);
        let o = placed(
            db,
            Some(me.id),
            DateTime::now() - Duration::from_secs(13 * 60 * 60),
        );

        let err = service
            .execute(CancelOrder {
                order_id: o.id,
                user_id: me.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::NotCancellable(CancellationError::WindowExpired),
        ));
        assert_eq!(db.read(|s| s.orders[&o.id].status), Status::Pending);
    }

    #[tokio::test]
    async fn refuses_foreign_and_missing_orders() {
        let service = testing::service();
        let db = service.database();
        let me = testing::user(db, Role::Customer);
        let guest = placed(db, None, DateTime::now());

        let err = service
            .execute(CancelOrder {
                order_id: guest.id,
                user_id: me.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::NotCancellable(CancellationError::NotOwner),
        ));

        let err = service
            .execute(CancelOrder {
                order_id: order::Id::new(),
                user_id: me.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::OrderNotExists(_),
        ));
    }
}
