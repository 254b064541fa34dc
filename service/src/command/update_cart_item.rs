//! [`Command`] for changing a [`Quantity`] of a [`cart::Item`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        cart::{self, Quantity},
        product, Cart, Product,
    },
    infra::{database, Database},
    read::cart::View,
    Service,
};

use super::{recompute_cart, Command, RecomputeCart};

/// [`Command`] for setting a [`Quantity`] of a [`cart::Item`].
///
/// The [`cart::Item`] is removed once nothing is left of it after limiting
/// the `quantity` by the [`Product::stock`].
#[derive(Clone, Copy, Debug)]
pub struct UpdateCartItem {
    /// ID of the [`Cart`] holding the [`cart::Item`].
    pub cart_id: cart::Id,

    /// ID of the [`Product`] of the [`cart::Item`].
    pub product_id: product::Id,

    /// Desired number of units. Zero removes the [`cart::Item`].
    pub quantity: u32,
}

impl<Db> Command<UpdateCartItem> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Product>, product::Id>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Cart, cart::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<cart::Item>, cart::Id>>,
            Ok = Vec<cart::Item>,
            Err = Traced<database::Error>,
        > + Database<Update<cart::Item>, Err = Traced<database::Error>>
        + Database<
            Delete<By<cart::Item, (cart::Id, product::Id)>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
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
        cmd: UpdateCartItem,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateCartItem {
            cart_id,
            product_id,
            quantity,
        } = cmd;

        drop(
            self.database()
                .execute(Select(By::<Option<Cart>, _>::new(cart_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CartNotExists(cart_id))
                .map_err(tracerr::wrap!())?,
        );
        let stock = self
            .database()
            .execute(Select(By::<Option<Product>, _>::new(product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map_or(0, |p| p.stock);

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::<Cart, _>::new(cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let item = tx
            .execute(Select(By::<Vec<cart::Item>, _>::new(cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .find(|i| i.product_id == product_id)
            .ok_or(E::ItemNotExists(product_id))
            .map_err(tracerr::wrap!())?;
        match Quantity::clamped(quantity, stock) {
            Some(quantity) => tx
                .execute(Update(cart::Item { quantity, ..item }))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?,
            None => tx
                .execute(Delete(By::<cart::Item, _>::new((cart_id, product_id))))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?,
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.execute(RecomputeCart(cart_id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`UpdateCartItem`] [`Command`] execution.
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

    /// [`Cart`] holds no [`Product`] with the provided ID.
    #[display("`Product(id: {_0})` is not in the `Cart`")]
    #[from(ignore)]
    ItemNotExists(#[error(not(source))] product::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::product,
        testing::{self, money},
        Command as _,
    };

    use super::{ExecutionError, UpdateCartItem};

    #[tokio::test]
    async fn sets_quantity_clamped_to_stock() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "5.00", 4);
        let cart = testing::cart(db, None, &[(&p, 1)]);

        let view = service
            .execute(UpdateCartItem {
                cart_id: cart.id,
                product_id: p.id,
                quantity: 9,
            })
            .await
            .unwrap();

        assert_eq!(testing::items(db, cart.id), vec![(p.id, 4)]);
        assert_eq!(view.cart.snapshot.total, money("20.00"));
    }

    #[tokio::test]
    async fn zero_quantity_removes_line() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "5.00", 4);
        let cart = testing::cart(db, None, &[(&p, 2)]);

        let view = service
            .execute(UpdateCartItem {
                cart_id: cart.id,
                product_id: p.id,
                quantity: 0,
            })
            .await
            .unwrap();

        assert!(testing::items(db, cart.id).is_empty());
        assert_eq!(view.total_quantity, 0);
    }

    #[tokio::test]
    async fn sold_out_product_removes_line() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "5.00", 4);
        let cart = testing::cart(db, None, &[(&p, 2)]);
        db.modify(|s| s.products.get_mut(&p.id).unwrap().stock = 0);

        _ = service
            .execute(UpdateCartItem {
                cart_id: cart.id,
                product_id: p.id,
                quantity: 1,
            })
            .await
            .unwrap();

        assert!(testing::items(db, cart.id).is_empty());
    }

    #[tokio::test]
    async fn errors_on_missing_line() {
        let service = testing::service();
        let db = service.database();
        let cart = testing::cart(db, None, &[]);

        let err = service
            .execute(UpdateCartItem {
                cart_id: cart.id,
                product_id: product::Id::new(),
                quantity: 1,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::ItemNotExists(_),
        ));
    }
}
