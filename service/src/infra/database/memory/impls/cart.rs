//! [`Cart`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{cart, product, user, Cart},
    infra::{
        database::{self, memory::Row, Memory},
        Database,
    },
};

impl Database<Select<By<Option<Cart>, cart::Id>>> for Memory {
    type Ok = Option<Cart>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Cart>, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.read(|s| s.carts.get(&id).cloned()))
    }
}

impl Database<Select<By<Option<Cart>, user::Id>>> for Memory {
    type Ok = Option<Cart>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Cart>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        Ok(self.read(|s| {
            s.carts
                .values()
                .find(|c| c.user_id == Some(user_id))
                .cloned()
        }))
    }
}

impl Database<Insert<Cart>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(cart): Insert<Cart>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(cart)).await.map_err(tracerr::wrap!())
    }
}

impl Database<Update<Cart>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(cart): Update<Cart>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(move |s| {
            _ = s.carts.insert(cart.id, cart);
        });
        Ok(())
    }
}

impl Database<Delete<By<Cart, cart::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Cart, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(move |s| {
            _ = s.carts.remove(&id);
            s.cart_items.retain(|i| i.cart_id != id);
        });
        Ok(())
    }
}

impl Database<Lock<By<Cart, cart::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Cart, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.hold(Row::Cart(by.into_inner())).await;
        Ok(())
    }
}

impl Database<Lock<By<Cart, user::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Cart, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.hold(Row::UserCart(by.into_inner())).await;
        Ok(())
    }
}

impl Database<Select<By<Vec<cart::Item>, cart::Id>>> for Memory {
    type Ok = Vec<cart::Item>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<cart::Item>, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let cart_id = by.into_inner();
        Ok(self.read(|s| s.items_of(cart_id).copied().collect()))
    }
}

impl Database<Insert<cart::Item>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(item): Insert<cart::Item>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(item)).await.map_err(tracerr::wrap!())
    }
}

impl Database<Update<cart::Item>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(item): Update<cart::Item>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(move |s| {
            // An existing line keeps its position.
            match s.cart_items.iter_mut().find(|i| {
                i.cart_id == item.cart_id && i.product_id == item.product_id
            }) {
                Some(existing) => existing.quantity = item.quantity,
                None => s.cart_items.push(item),
            }
        });
        Ok(())
    }
}

impl Database<Delete<By<cart::Item, (cart::Id, product::Id)>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<cart::Item, (cart::Id, product::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (cart_id, product_id) = by.into_inner();
        self.write(move |s| {
            s.cart_items.retain(|i| {
                i.cart_id != cart_id || i.product_id != product_id
            });
        });
        Ok(())
    }
}

impl Database<Delete<By<Vec<cart::Item>, cart::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Vec<cart::Item>, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let cart_id = by.into_inner();
        self.write(move |s| s.cart_items.retain(|i| i.cart_id != cart_id));
        Ok(())
    }
}
