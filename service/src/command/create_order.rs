//! [`Command`] for placing an [`Order`] out of a [`Cart`].

use std::collections::HashMap;

use common::{
    operations::{
        By, Commit, Delete, Insert, Lock, Perform, Select, Transact,
        Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        cart,
        order::{self, payment, Payment},
        product::{self, stock},
        user, Cart, Order, Product,
    },
    infra::{database, Database},
    Service,
};

use super::{
    release_stock, reserve_cart_stock, Command, ReleaseStock,
    ReserveCartStock,
};

/// [`Command`] for placing an [`Order`] out of a [`Cart`].
///
/// Stock of every [`cart::Item`] is reserved first, all or nothing. Then
/// the [`Order`] is stored and the [`Cart`] is emptied in a single
/// transaction, holding the [`Cart`] locked. If the [`cart::Item`]s are no
/// longer the reserved ones by then, or that transaction fails, the reserved
/// units are returned to the stock.
///
/// The [`Order`] copies the persisted [`cart::Snapshot`] of the [`Cart`] as
/// is.
#[derive(Debug)]
pub struct CreateOrder {
    /// ID of the [`Cart`] to order.
    pub cart_id: cart::Id,

    /// ID of the [`User`] placing the [`Order`], if not a guest.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: Option<user::Id>,

    /// [`order::Contact`] of the recipient.
    pub contact: order::Contact,

    /// [`order::Address`] to deliver to.
    pub address: order::Address,

    /// Name of the [`payment::Method`], in any case.
    pub payment_method: String,

    /// [`payment::Card`] details, required for [`payment::Method::Card`].
    pub card: Option<payment::Card>,
}

impl<Db> Command<CreateOrder> for Service<Db>
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
            Select<By<HashMap<product::Id, Product>, Vec<product::Id>>>,
            Ok = HashMap<product::Id, Product>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Cart, cart::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<cart::Item>, cart::Id>>,
            Ok = Vec<cart::Item>,
            Err = Traced<database::Error>,
        > + Database<
            Perform<order::AllocateNumber>,
            Ok = order::Number,
            Err = Traced<database::Error>,
        > + Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<
            Delete<By<Vec<cart::Item>, cart::Id>>,
            Err = Traced<database::Error>,
        > + Database<Update<Cart>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Self: Command<
            ReserveCartStock,
            Ok = Vec<stock::Decrement>,
            Err = Traced<reserve_cart_stock::ExecutionError>,
        > + Command<
            ReleaseStock,
            Ok = (),
            Err = Traced<release_stock::ExecutionError>,
        >,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateOrder) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateOrder {
            cart_id,
            user_id,
            contact,
            address,
            payment_method,
            card,
        } = cmd;

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
        if items.is_empty() {
            return Err(tracerr::new!(E::EmptyCart(cart_id)));
        }

        let now = DateTime::now();
        let payment = Payment::new(&payment_method, card, now)
            .map_err(E::InvalidPayment)
            .map_err(tracerr::wrap!())?;

        let reserved = self
            .execute(ReserveCartStock(cart_id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        // Another checkout may have emptied the cart since the check above.
        if reserved.is_empty() {
            return Err(tracerr::new!(E::EmptyCart(cart_id)));
        }

        let placed = async {
            let products = self
                .database()
                .execute(Select(By::<HashMap<_, Product>, _>::new(
                    reserved.iter().map(|d| d.product_id).collect::<Vec<_>>(),
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            let items = reserved
                .iter()
                .map(|d| {
                    let p = products
                        .get(&d.product_id)
                        .ok_or(E::ProductNotExists(d.product_id))
                        .map_err(tracerr::wrap!())?;
                    Ok(order::Item {
                        product_id: p.id,
                        name: p.name.clone(),
                        price: p.effective_price(),
                        quantity: d.quantity,
                    })
                })
                .collect::<Result<Vec<_>, Traced<E>>>()?;

            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            tx.execute(Lock(By::<Cart, _>::new(cart_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            let mut cart = tx
                .execute(Select(By::<Option<Cart>, _>::new(cart_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CartNotExists(cart_id))
                .map_err(tracerr::wrap!())?;
            let locked = tx
                .execute(Select(By::<Vec<cart::Item>, _>::new(cart_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if locked.is_empty() {
                return Err(tracerr::new!(E::EmptyCart(cart_id)));
            }
            let unchanged = locked
                .iter()
                .map(|i| (i.product_id, i.quantity))
                .eq(reserved.iter().map(|d| (d.product_id, d.quantity)));
            if !unchanged {
                return Err(tracerr::new!(E::CartChanged(cart_id)));
            }

            let number = tx
                .execute(Perform(order::AllocateNumber))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            let order = Order {
                id: order::Id::new(),
                number,
                user_id,
                status: order::Status::Pending,
                payment_method: payment.method(),
                shipping_address: order::ShippingAddress::new(
                    &contact, &address,
                ),
                contact,
                snapshot: cart.snapshot,
                coupon_code: cart.coupon_code.clone(),
                items,
                created_at: now.coerce(),
            };
            tx.execute(Insert(order.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            tx.execute(Delete(By::<Vec<cart::Item>, _>::new(cart_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            cart.reset();
            tx.execute(Update(cart))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            Ok::<_, Traced<E>>(order)
        }
        .await;

        if placed.is_err() {
            // The failure is logged by `ReleaseStock` and the original error
            // is what the caller needs to see.
            _ = self
                .execute(ReleaseStock {
                    items: reserved.into_iter().map(Into::into).collect(),
                })
                .await;
        }
        placed
    }
}

/// Error of [`CreateOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to reserve the stock of the [`Cart`].
    #[display("Failed to reserve stock: {_0}")]
    Reserve(reserve_cart_stock::ExecutionError),

    /// [`Cart`] with the provided ID does not exist.
    #[display("`Cart(id: {_0})` does not exist")]
    #[from(ignore)]
    CartNotExists(#[error(not(source))] cart::Id),

    /// [`Cart`] with the provided ID has no [`cart::Item`]s.
    #[display("`Cart(id: {_0})` is empty")]
    #[from(ignore)]
    EmptyCart(#[error(not(source))] cart::Id),

    /// [`Cart`] was modified after its stock had been reserved, so the
    /// reserved [`cart::Item`]s cannot be ordered.
    #[display("`Cart(id: {_0})` has changed during checkout")]
    #[from(ignore)]
    CartChanged(#[error(not(source))] cart::Id),

    /// [`Payment`] details are invalid.
    #[display("Invalid payment: {_0}")]
    #[from(ignore)]
    InvalidPayment(payment::ParseError),

    /// Reserved [`Product`] has disappeared before being ordered.
    #[display("`Product(id: {_0})` does not exist")]
    #[from(ignore)]
    ProductNotExists(#[error(not(source))] product::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Lock, Transact};
    use futures::future;

    use crate::{
        command::reserve_cart_stock,
        domain::{
            cart::{self, Quantity},
            order::{self, payment, PaymentMethod},
            user::Role,
            Cart,
        },
        read::product::Availability,
        testing::{self, fixed, money},
        Command as _,
    };

    use super::{CreateOrder, ExecutionError};

    fn cod(cart_id: cart::Id) -> CreateOrder {
        CreateOrder {
            cart_id,
            user_id: None,
            contact: order::Contact {
                name: Some("Ann".into()),
                email: Some("ann@example.com".into()),
                phone: None,
            },
            address: order::Address {
                street: Some("1 Main St".into()),
                city: Some("Springfield".into()),
                postal_code: Some("12345".into()),
            },
            payment_method: "cod".into(),
            card: None,
        }
    }

    #[tokio::test]
    async fn places_order_and_empties_cart() {
        let service = testing::service();
        let db = service.database();
        let u = testing::user(db, Role::Customer);
        let mut p = testing::product(db, "100.00", 5);
        p.discounted_price = Some(money("90.00"));
        db.modify(|s| {
            _ = s.products.insert(p.id, p.clone());
        });
        let c = testing::coupon(db, "SAVE15", fixed("15"), |_| {});
        let mut cart = testing::cart(db, Some(u.id), &[(&p, 2)]);
        cart.coupon_code = Some(c.code.clone());
        cart.snapshot.subtotal = money("180.00");
        cart.snapshot.discount = money("15.00");
        cart.snapshot.total = money("165.00");
        db.modify(|s| {
            _ = s.carts.insert(cart.id, cart.clone());
        });

        let order = service
            .execute(CreateOrder {
                user_id: Some(u.id),
                ..cod(cart.id)
            })
            .await
            .unwrap();

        assert_eq!(order.status, order::Status::Pending);
        assert_eq!(order.payment_method, PaymentMethod::Cod);
        assert_eq!(order.user_id, Some(u.id));
        assert_eq!(order.snapshot, cart.snapshot);
        assert_eq!(order.coupon_code, Some(c.code));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price, money("90.00"));
        assert_eq!(order.items[0].quantity.get(), 2);
        assert_eq!(
            order.shipping_address.to_string(),
            "Ann\nann@example.com\n1 Main St\nSpringfield 12345",
        );

        assert_eq!(testing::stock(db, p.id), 3);
        assert!(testing::items(db, cart.id).is_empty());
        let emptied = db.read(|s| s.carts[&cart.id].clone());
        assert_eq!(emptied.coupon_code, None);
        assert_eq!(emptied.snapshot.total, money("0"));
        assert!(db.read(|s| s.orders.contains_key(&order.id)));
    }

    #[tokio::test]
    async fn numbers_orders_sequentially() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "1.00", 5);

        let mut numbers = vec![];
        for _ in 0..2 {
            let cart = testing::cart(db, None, &[(&p, 1)]);
            numbers.push(service.execute(cod(cart.id)).await.unwrap().number);
        }

        assert_eq!(numbers[0].to_string(), "001");
        assert_eq!(numbers[1].to_string(), "002");
    }

    #[tokio::test]
    async fn rejects_shortage_and_keeps_stock() {
        let service = testing::service();
        let db = service.database();
        let (a, b) = (
            testing::product(db, "1.00", 5),
            testing::product(db, "1.00", 1),
        );
        let cart = testing::cart(db, None, &[(&a, 3), (&b, 2)]);

        let err = service.execute(cod(cart.id)).await.unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::Reserve(reserve_cart_stock::ExecutionError::OutOfStock(s))
                if s == Availability::from([(b.id, 1)]),
        ));
        assert_eq!(testing::stock(db, a.id), 5);
        assert_eq!(testing::stock(db, b.id), 1);
        assert_eq!(testing::items(db, cart.id).len(), 2);
        assert!(db.read(|s| s.orders.is_empty()));
    }

    #[tokio::test]
    async fn returns_stock_when_commit_fails() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "1.00", 5);
        let cart = testing::cart(db, None, &[(&p, 4)]);
        db.modify(|s| s.rejects_commits = true);

        let err = service.execute(cod(cart.id)).await.unwrap_err();

        assert!(matches!(err.into_inner(), ExecutionError::Db(_)));
        assert_eq!(testing::stock(db, p.id), 5);
        assert_eq!(testing::items(db, cart.id), vec![(p.id, 4)]);
        assert!(db.read(|s| s.orders.is_empty()));
    }

    #[tokio::test]
    async fn orders_same_cart_only_once() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "10.00", 5);
        let cart = testing::cart(db, None, &[(&p, 2)]);

        // Both checkouts reserve their units and then wait for the cart.
        let held = db.execute(Transact).await.unwrap();
        held.execute(Lock(By::<Cart, _>::new(cart.id))).await.unwrap();
        let (first, second, ()) = future::join3(
            service.execute(cod(cart.id)),
            service.execute(cod(cart.id)),
            async move { drop(held) },
        )
        .await;

        let order = first.unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity.get(), 2);
        assert!(matches!(
            second.unwrap_err().into_inner(),
            ExecutionError::CartChanged(id) if id == cart.id,
        ));
        assert_eq!(db.read(|s| s.orders.len()), 1);
        assert_eq!(testing::stock(db, p.id), 3);
        assert!(testing::items(db, cart.id).is_empty());
    }

    #[tokio::test]
    async fn aborts_when_lines_change_after_reservation() {
        let service = testing::service();
        let db = service.database();
        let (a, b) = (
            testing::product(db, "1.00", 5),
            testing::product(db, "1.00", 5),
        );
        let cart_id = testing::cart(db, None, &[(&a, 1)]).id;
        let added = cart::Item::new(cart_id, b.id, Quantity::ONE);

        let held = db.execute(Transact).await.unwrap();
        held.execute(Lock(By::<Cart, _>::new(cart_id))).await.unwrap();
        let (placed, ()) = future::join(
            service.execute(cod(cart_id)),
            async move {
                db.modify(|s| s.cart_items.push(added));
                drop(held);
            },
        )
        .await;

        assert!(matches!(
            placed.unwrap_err().into_inner(),
            ExecutionError::CartChanged(_),
        ));
        assert!(db.read(|s| s.orders.is_empty()));
        assert_eq!(testing::stock(db, a.id), 5);
        assert_eq!(testing::stock(db, b.id), 5);
        assert_eq!(testing::items(db, cart_id), vec![(a.id, 1), (b.id, 1)]);
    }

    #[tokio::test]
    async fn refuses_cart_emptied_during_checkout() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "1.00", 5);
        let cart_id = testing::cart(db, None, &[(&p, 2)]).id;

        let held = db.execute(Transact).await.unwrap();
        held.execute(Lock(By::<Cart, _>::new(cart_id))).await.unwrap();
        let (placed, ()) = future::join(
            service.execute(cod(cart_id)),
            async move {
                db.modify(|s| s.cart_items.retain(|i| i.cart_id != cart_id));
                drop(held);
            },
        )
        .await;

        assert!(matches!(
            placed.unwrap_err().into_inner(),
            ExecutionError::EmptyCart(id) if id == cart_id,
        ));
        assert!(db.read(|s| s.orders.is_empty()));
        assert_eq!(testing::stock(db, p.id), 5);

        let cart = testing::cart(db, None, &[(&p, 1)]);
        let order = service.execute(cod(cart.id)).await.unwrap();
        assert_eq!(order.number.to_string(), "001");
    }

    #[tokio::test]
    async fn second_checkout_of_emptied_cart_fails() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "10.00", 5);
        let cart = testing::cart(db, None, &[(&p, 2)]);

        let order = service.execute(cod(cart.id)).await.unwrap();
        let reserved = service
            .execute(reserve_cart_stock::ReserveCartStock(cart.id))
            .await
            .unwrap();
        assert!(reserved.is_empty());
        let err = service.execute(cod(cart.id)).await.unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::EmptyCart(id) if id == cart.id,
        ));
        assert_eq!(db.read(|s| s.orders.len()), 1);
        assert!(db.read(|s| s.orders.contains_key(&order.id)));
        assert_eq!(testing::stock(db, p.id), 3);
    }

    #[tokio::test]
    async fn checks_cart_before_payment() {
        let service = testing::service();
        let db = service.database();
        let empty = testing::cart(db, None, &[]);

        let err = service.execute(cod(empty.id)).await.unwrap_err();
        assert!(matches!(err.into_inner(), ExecutionError::EmptyCart(_)));

        let p = testing::product(db, "1.00", 5);
        let cart = testing::cart(db, None, &[(&p, 1)]);
        let err = service
            .execute(CreateOrder {
                payment_method: "CARD".into(),
                ..cod(cart.id)
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::InvalidPayment(payment::ParseError::CardRequired),
        ));
        assert_eq!(testing::stock(db, p.id), 5);
    }

    #[tokio::test]
    async fn accepts_valid_card() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "1.00", 5);
        let cart = testing::cart(db, None, &[(&p, 1)]);

        let order = service
            .execute(CreateOrder {
                payment_method: "Card".into(),
                card: Some(payment::Card {
                    number: String::from("4242 4242 4242 4242").into(),
                    expiry: "12/99".into(),
                    cvv: String::from("000").into(),
                }),
                ..cod(cart.id)
            })
            .await
            .unwrap();

        assert_eq!(order.payment_method, PaymentMethod::Card);
    }
}
