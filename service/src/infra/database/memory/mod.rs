//! In-memory [`Database`] implementation.
//!
//! Every operation is applied under a single mutex, so the atomic
//! [`Perform`] operations hold here the same way they do in Postgres.
//!
//! Writes made through a [`Transact`]ed [`Memory`] are queued and applied
//! together on [`Commit`], being discarded if it never happens. Reads always
//! see the committed [`State`] only.
//!
//! A [`Lock`] taken by a [`Transact`]ed [`Memory`] is held until the
//! transaction commits or is dropped, and makes any other transaction
//! locking the same row wait. Outside a transaction it does nothing.
//!
//! [`Commit`]: common::operations::Commit
//! [`Lock`]: common::operations::Lock
//! [`Perform`]: common::operations::Perform
//! [`Transact`]: common::operations::Transact

mod impls;

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use crate::domain::{
    cart, coupon, order, product, user, Cart, Coupon, Order, Product, User,
};
#[cfg(doc)]
use crate::infra::Database;

/// Change of a [`State`] queued by a transactional [`Memory`].
type Change = Box<dyn FnOnce(&mut State) + Send>;

/// Row of a [`State`] which may be locked.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum Row {
    /// [`Cart`] with the provided ID.
    Cart(cart::Id),

    /// [`Cart`] of the [`User`] with the provided ID.
    UserCart(user::Id),

    /// [`Order`] with the provided ID.
    Order(order::Id),
}

/// Current transaction of a [`Memory`].
#[derive(Default)]
struct Tx {
    /// Queued [`Change`]s.
    changes: Mutex<Vec<Change>>,

    /// Locks held on [`Row`]s.
    held: Mutex<HashMap<Row, OwnedMutexGuard<()>>>,
}

/// In-memory [`Database`].
///
/// Clones share the same [`State`].
#[derive(Clone, Default)]
pub struct Memory {
    /// Committed [`State`].
    state: Arc<Mutex<State>>,

    /// Locks of the [`Row`]s, shared by all the transactions.
    rows: Arc<Mutex<HashMap<Row, Arc<RowLock<()>>>>>,

    /// Current transaction, if any.
    tx: Option<Arc<Tx>>,
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("state", &*self.lock())
            .field("is_tx", &self.tx.is_some())
            .finish()
    }
}

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspects the committed [`State`] with the provided function.
    pub fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.lock())
    }

    /// Modifies the committed [`State`] directly with the provided function,
    /// bypassing any transaction.
    pub fn modify<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.lock())
    }

    /// Locks the committed [`State`].
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Indicates whether this [`Memory`] is a transactional one.
    fn is_tx(&self) -> bool {
        self.tx.is_some()
    }

    /// Starts a new transaction over the same [`State`].
    fn transact(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            rows: Arc::clone(&self.rows),
            tx: Some(Arc::default()),
        }
    }

    /// Applies the provided `change` right away, or queues it until
    /// [`Memory::commit()`] if this is a transactional [`Memory`].
    fn write(&self, change: impl FnOnce(&mut State) + Send + 'static) {
        match &self.tx {
            Some(tx) => tx
                .changes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Box::new(change)),
            None => change(&mut self.lock()),
        }
    }

    /// Locks the provided [`Row`] until the current transaction ends,
    /// waiting for any other transaction holding it.
    ///
    /// Does nothing outside a transaction, or if the [`Row`] is locked by
    /// this transaction already.
    async fn hold(&self, row: Row) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&row)
        {
            return;
        }

        let lock = Arc::clone(
            self.rows
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(row)
                .or_default(),
        );
        let guard = lock.lock_owned().await;
        _ = tx
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(row, guard);
    }

    /// Applies all the queued [`Change`]s at once and releases the held
    /// [`Row`]s.
    fn commit(&self) -> Result<(), Error> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };

        let mut state = self.lock();
        if state.rejects_commits {
            return Err(Error::CommitRejected);
        }
        let changes = std::mem::take(
            &mut *tx.changes.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for change in changes {
            change(&mut state);
        }
        drop(state);

        tx.held.lock().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }
}

/// Data stored in a [`Memory`] database.
#[derive(Debug, Default)]
pub struct State {
    /// Stored [`Product`]s.
    pub products: HashMap<product::Id, Product>,

    /// Stored [`User`]s.
    pub users: HashMap<user::Id, User>,

    /// Stored [`Cart`]s.
    pub carts: HashMap<cart::Id, Cart>,

    /// Stored [`cart::Item`]s in the order they were added.
    pub cart_items: Vec<cart::Item>,

    /// Stored [`Coupon`]s.
    pub coupons: HashMap<coupon::Id, Coupon>,

    /// Stored [`Order`]s.
    pub orders: HashMap<order::Id, Order>,

    /// Last allocated [`order::Number`].
    pub last_order_number: i32,

    /// Indicator whether transactions fail to commit, simulating an
    /// unavailable storage.
    pub rejects_commits: bool,
}

impl State {
    /// Returns the [`cart::Item`]s of the [`Cart`] with the provided ID.
    pub fn items_of(
        &self,
        cart_id: cart::Id,
    ) -> impl Iterator<Item = &cart::Item> {
        self.cart_items.iter().filter(move |i| i.cart_id == cart_id)
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Transaction is not committed, as [`State::rejects_commits`] is set.
    #[display("Transaction commit is rejected")]
    CommitRejected,
}
