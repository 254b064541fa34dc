//! [`Command`] for adding a [`Product`] to a [`Cart`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
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

/// [`Command`] for adding some [`Quantity`] of a [`Product`] to a [`Cart`].
///
/// Units are added to the existing [`cart::Item`], if any. The resulting
/// [`Quantity`] never exceeds the [`Product::stock`].
#[derive(Clone, Copy, Debug)]
pub struct AddCartItem {
    /// ID of the [`Cart`] to add to.
    pub cart_id: cart::Id,

    /// ID of the [`Product`] to add.
    pub product_id: product::Id,

    /// [`Quantity`] to add.
    pub quantity: Quantity,
}

impl<Db> Command<AddCartItem> for Service<Db>
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
        + Database<Commit, Err = Traced<database::Error>>,
    Self: Command<
        RecomputeCart,
        Ok = View,
        Err = Traced<recompute_cart::ExecutionError>,
    >,
{
    type Ok = View;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AddCartItem) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AddCartItem {
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
        let product = self
            .database()
            .execute(Select(By::<Option<Product>, _>::new(product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProductNotExists(product_id))
            .map_err(tracerr::wrap!())?;
        if !product.is_in_stock() {
            return Err(tracerr::new!(E::OutOfStock(product_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::<Cart, _>::new(cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let current = tx
            .execute(Select(By::<Vec<cart::Item>, _>::new(cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .find(|i| i.product_id == product_id);
        let desired = current
            .map_or(0, |i| i.quantity.get())
            .saturating_add(quantity.get());
        if let Some(quantity) = Quantity::clamped(desired, product.stock) {
            let item = match current {
                Some(item) => cart::Item { quantity, ..item },
                None => cart::Item::new(cart_id, product_id, quantity),
            };
            tx.execute(Update(item))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
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

/// Error of [`AddCartItem`] [`Command`] execution.
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

    /// [`Product`] with the provided ID does not exist.
    #[display("`Product(id: {_0})` does not exist")]
    #[from(ignore)]
    ProductNotExists(#[error(not(source))] product::Id),

    /// [`Product`] with the provided ID has no units in stock.
    #[display("`Product(id: {_0})` is out of stock")]
    #[from(ignore)]
    OutOfStock(#[error(not(source))] product::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{cart::Quantity, product},
        testing::{self, money},
        Command as _,
    };

    use super::{AddCartItem, ExecutionError};

    #[tokio::test]
    async fn adds_new_line() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "4.00", 10);
        let cart = testing::cart(db, None, &[]);

        let view = service
            .execute(AddCartItem {
                cart_id: cart.id,
                product_id: p.id,
                quantity: Quantity::new(3).unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(testing::items(db, cart.id), vec![(p.id, 3)]);
        assert_eq!(view.total_quantity, 3);
        assert_eq!(view.cart.snapshot.subtotal, money("12.00"));
    }

    #[tokio::test]
    async fn increments_existing_line_up_to_stock() {
        let service = testing::service();
        let db = service.database();
        let (a, b) = (
            testing::product(db, "1.00", 5),
            testing::product(db, "2.00", 5),
        );
        let cart = testing::cart(db, None, &[(&a, 4), (&b, 1)]);

        _ = service
            .execute(AddCartItem {
                cart_id: cart.id,
                product_id: a.id,
                quantity: Quantity::new(3).unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(testing::items(db, cart.id), vec![(a.id, 5), (b.id, 1)]);
    }

    #[tokio::test]
    async fn rejects_out_of_stock_product() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "4.00", 0);
        let cart = testing::cart(db, None, &[]);

        let err = service
            .execute(AddCartItem {
                cart_id: cart.id,
                product_id: p.id,
                quantity: Quantity::ONE,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), ExecutionError::OutOfStock(id) if id == p.id));
        assert!(testing::items(db, cart.id).is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_product_and_cart() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "4.00", 1);
        let cart = testing::cart(db, None, &[]);

        let err = service
            .execute(AddCartItem {
                cart_id: cart.id,
                product_id: product::Id::new(),
                quantity: Quantity::ONE,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::ProductNotExists(_),
        ));

        let err = service
            .execute(AddCartItem {
                cart_id: crate::domain::cart::Id::new(),
                product_id: p.id,
                quantity: Quantity::ONE,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::CartNotExists(_),
        ));
    }
}
