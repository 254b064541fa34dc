//! Lazily connecting Postgres database clients.
//!
//! Neither client takes a connection from the [`connection::Pool`] until the
//! first statement is run. A [`Tx`] started from a [`NonTx`] reuses the
//! connection the latter has already taken, if any.

use std::{future::Future, sync::Arc};

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Non-transactional Postgres database client.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to take the connection from.
    pub(crate) pool: connection::Pool,

    /// Connection taken from the [`connection::Pool`], if any.
    connection: Arc<RwLock<Option<connection::NonTx>>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client over the provided
    /// [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the connection of this [`NonTx`] client, taking one from the
    /// [`connection::Pool`] if there is none yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        get_or_init(&self.connection, || async {
            self.pool
                .get()
                .await
                .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                .map_err(tracerr::map_from)
        })
        .await
    }

    /// Takes the connection out of this [`NonTx`] client, if it has any.
    async fn take_connection(&self) -> Option<connection::NonTx> {
        self.connection.write().await.take()
    }
}

/// Transactional Postgres database client.
///
/// Clones share the same transaction, which is rolled back if the last of
/// them is dropped before [`Tx::commit()`].
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to take the connection from, if the [`NonTx`]
    /// client has none.
    pool: connection::Pool,

    /// [`NonTx`] client this [`Tx`] client was started from, until its
    /// connection is taken over.
    origin: Arc<RwLock<Option<NonTx>>>,

    /// Transaction begun on the first statement.
    tx: Arc<RwLock<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client starting from the provided [`NonTx`] one.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            origin: Arc::new(RwLock::new(Some(client))),
            tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the transaction of this [`Tx`] client, beginning it first if
    /// there is none yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        get_or_init(&self.tx, || async {
            let origin = self.origin.write().await.take();
            let reused = match origin {
                Some(client) => client.take_connection().await,
                None => None,
            };
            let conn = match reused {
                Some(conn) => conn,
                None => self
                    .pool
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?,
            };
            connection::Tx::from_non_tx(conn)
                .await
                .map_err(tracerr::wrap!())
        })
        .await
    }

    /// Commits the transaction of this [`Tx`] client.
    ///
    /// Does nothing if no statement has been run yet.
    ///
    /// # Errors
    ///
    /// If the `COMMIT` statement fails.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(tx) = self.tx.write().await.take() else {
            return Ok(());
        };
        tx.commit().await.map_err(tracerr::wrap!())
    }
}

/// Returns the value stored in the provided `slot`, storing the one `init`
/// resolves to first if the `slot` is empty.
async fn get_or_init<'s, T, F, Fut>(
    slot: &'s RwLock<Option<T>>,
    init: F,
) -> Result<RwLockReadGuard<'s, T>, Traced<database::Error>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Traced<database::Error>>>,
{
    let guard = slot.read().await;
    let guard = if guard.is_some() {
        guard
    } else {
        drop(guard);

        let mut guard = slot.write().await;
        if guard.is_none() {
            *guard = Some(init().await?);
        }
        guard.downgrade()
    };

    Ok(RwLockReadGuard::map(guard, |v| {
        v.as_ref().expect("cannot be taken while guard is alive")
    }))
}

/// Implements [`Connection`] for a client by running the statements on the
/// connection it lazily takes.
macro_rules! impl_connection {
    ($ty:ty) => {
        impl Connection for $ty {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    };
}

impl_connection!(NonTx);
impl_connection!(Tx);
