//! [`Command`] for merging a guest [`Cart`] into a [`User`] one.

use std::collections::HashMap;

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{
        cart::{self, MergeStrategy, Quantity},
        product, user, Cart, Product,
    },
    infra::{database, Database},
    read::cart::View,
    Service,
};

use super::{recompute_cart, Command, RecomputeCart};

/// [`Command`] for merging a guest [`Cart`] into the [`Cart`] of a [`User`].
///
/// If the [`User`] has no [`Cart`] yet, the guest one is claimed by them as
/// is. Otherwise, the guest [`cart::Item`]s are merged according to the
/// [`MergeStrategy`], limited by the [`Product`] stock, and the guest
/// [`Cart`] is deleted.
#[derive(Clone, Copy, Debug)]
pub struct MergeCarts {
    /// ID of the [`User`] to merge into the [`Cart`] of.
    pub user_id: user::Id,

    /// ID of the guest [`Cart`] to merge.
    pub guest_cart_id: cart::Id,

    /// [`MergeStrategy`] for the [`Product`]s present in both [`Cart`]s.
    pub strategy: MergeStrategy,
}

impl<Db> Command<MergeCarts> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Cart, user::Id>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Cart, cart::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Cart>, user::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<cart::Item>, cart::Id>>,
            Ok = Vec<cart::Item>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<product::Id, Product>, Vec<product::Id>>>,
            Ok = HashMap<product::Id, Product>,
            Err = Traced<database::Error>,
        > + Database<Update<Cart>, Err = Traced<database::Error>>
        + Database<Update<cart::Item>, Err = Traced<database::Error>>
        + Database<
            Delete<By<cart::Item, (cart::Id, product::Id)>>,
            Err = Traced<database::Error>,
        > + Database<Delete<By<Cart, cart::Id>>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Self: Command<
        RecomputeCart,
        Ok = View,
        Err = Traced<recompute_cart::ExecutionError>,
    >,
{
    type Ok = View;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: MergeCarts) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let MergeCarts {
            user_id,
            guest_cart_id,
            strategy,
        } = cmd;

        let mut guest = self
            .database()
            .execute(Select(By::<Option<Cart>, _>::new(guest_cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.user_id.is_none_or(|owner| owner == user_id))
            .ok_or(E::GuestCartNotExists(guest_cart_id))
            .map_err(tracerr::wrap!())?;
        if guest.user_id.is_some() {
            // Already merged.
            return self
                .execute(RecomputeCart(guest.id))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::<Cart, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Cart, _>::new(guest.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let Some(target) = tx
            .execute(Select(By::<Option<Cart>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            guest.user_id = Some(user_id);
            guest.touch();
            tx.execute(Update(guest.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            return self
                .execute(RecomputeCart(guest.id))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E));
        };

        let guest_items = tx
            .execute(Select(By::<Vec<cart::Item>, _>::new(guest.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let target_items = tx
            .execute(Select(By::<Vec<cart::Item>, _>::new(target.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let products = tx
            .execute(Select(By::<HashMap<_, Product>, _>::new(
                guest_items.iter().map(|i| i.product_id).collect::<Vec<_>>(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        for incoming in guest_items {
            let stock = products
                .get(&incoming.product_id)
                .map_or(0, |p| p.stock);
            let existing = target_items
                .iter()
                .find(|i| i.product_id == incoming.product_id);

            let Some(dest) = existing else {
                if let Some(quantity) =
                    Quantity::clamped(incoming.quantity.get(), stock)
                {
                    tx.execute(Update(cart::Item::new(
                        target.id,
                        incoming.product_id,
                        quantity,
                    )))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                }
                continue;
            };

            let desired = match strategy {
                MergeStrategy::Sum => {
                    dest.quantity.get().saturating_add(incoming.quantity.get())
                }
                MergeStrategy::Replace => incoming.quantity.get(),
            };
            match Quantity::clamped(desired, stock) {
                Some(quantity) => tx
                    .execute(Update(cart::Item { quantity, ..*dest }))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?,
                None => tx
                    .execute(Delete(By::<cart::Item, _>::new((
                        target.id,
                        dest.product_id,
                    ))))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?,
            }
        }

        tx.execute(Delete(By::<Cart, _>::new(guest.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.execute(RecomputeCart(target.id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`MergeCarts`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to recompute the resulting [`Cart`].
    #[display("Failed to recompute `Cart`: {_0}")]
    Recompute(recompute_cart::ExecutionError),

    /// Guest [`Cart`] with the provided ID does not exist.
    #[display("Guest `Cart(id: {_0})` does not exist")]
    #[from(ignore)]
    GuestCartNotExists(#[error(not(source))] cart::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{cart::MergeStrategy, user::Role},
        testing::{self, money},
        Command as _,
    };

    use super::{ExecutionError, MergeCarts};

    #[tokio::test]
    async fn claims_guest_cart_when_user_has_none() {
        let service = testing::service();
        let db = service.database();
        let u = testing::user(db, Role::Customer);
        let p = testing::product(db, "8.00", 5);
        let guest = testing::cart(db, None, &[(&p, 2)]);

        let view = service
            .execute(MergeCarts {
                user_id: u.id,
                guest_cart_id: guest.id,
                strategy: MergeStrategy::Sum,
            })
            .await
            .unwrap();

        assert_eq!(view.cart.id, guest.id);
        assert_eq!(view.cart.user_id, Some(u.id));
        assert_eq!(view.cart.snapshot.total, money("16.00"));
    }

    #[tokio::test]
    async fn sums_quantities_within_stock() {
        let service = testing::service();
        let db = service.database();
        let u = testing::user(db, Role::Customer);
        let (a, b, sold_out) = (
            testing::product(db, "1.00", 4),
            testing::product(db, "2.00", 9),
            testing::product(db, "3.00", 1),
        );
        let mine = testing::cart(db, Some(u.id), &[(&a, 3)]);
        let guest =
            testing::cart(db, None, &[(&a, 3), (&b, 2), (&sold_out, 1)]);
        db.modify(|s| s.products.get_mut(&sold_out.id).unwrap().stock = 0);

        let view = service
            .execute(MergeCarts {
                user_id: u.id,
                guest_cart_id: guest.id,
                strategy: MergeStrategy::Sum,
            })
            .await
            .unwrap();

        assert_eq!(view.cart.id, mine.id);
        assert_eq!(testing::items(db, mine.id), vec![(a.id, 4), (b.id, 2)]);
        assert!(db.read(|s| !s.carts.contains_key(&guest.id)));
        assert!(testing::items(db, guest.id).is_empty());
    }

    #[tokio::test]
    async fn replaces_quantities() {
        let service = testing::service();
        let db = service.database();
        let u = testing::user(db, Role::Customer);
        let a = testing::product(db, "1.00", 10);
        let mine = testing::cart(db, Some(u.id), &[(&a, 7)]);
        let guest = testing::cart(db, None, &[(&a, 2)]);

        _ = service
            .execute(MergeCarts {
                user_id: u.id,
                guest_cart_id: guest.id,
                strategy: MergeStrategy::Replace,
            })
            .await
            .unwrap();

        assert_eq!(testing::items(db, mine.id), vec![(a.id, 2)]);
    }

    #[tokio::test]
    async fn refuses_cart_of_another_user() {
        let service = testing::service();
        let db = service.database();
        let (me, other) = (
            testing::user(db, Role::Customer),
            testing::user(db, Role::Customer),
        );
        let theirs = testing::cart(db, Some(other.id), &[]);

        let err = service
            .execute(MergeCarts {
                user_id: me.id,
                guest_cart_id: theirs.id,
                strategy: MergeStrategy::Sum,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::GuestCartNotExists(_),
        ));
    }
}
