//! [`Product`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Perform, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        cart,
        product::{self, stock},
        Product,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C, IDs> Database<Select<By<HashMap<product::Id, Product>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[product::Id]>,
{
    type Ok = HashMap<product::Id, Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<product::Id, Product>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[product::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, name, price, discounted_price, stock, category_id \
            FROM products \
            WHERE id = ANY($1::UUID[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let product = product_from_row(&row);
                (product.id, product)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Product>, product::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<product::Id, Product>, [product::Id; 1]>>,
        Ok = HashMap<product::Id, Product>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Perform<stock::Decrement>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::product::Decremented;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(op): Perform<stock::Decrement>,
    ) -> Result<Self::Ok, Self::Err> {
        let stock::Decrement {
            product_id,
            quantity,
        } = op;
        let quantity = units(quantity);

        // Single conditional statement, so concurrent decrements never
        // oversell.
        const SQL: &str = "\
            UPDATE products \
            SET stock = stock - $2::INT4 \
            WHERE id = $1::UUID \
              AND stock >= $2::INT4";
        let updated = self
            .exec(SQL, &[&product_id, &quantity])
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::product::Decremented(updated == 1))
    }
}

impl<C> Database<Perform<stock::Increment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(op): Perform<stock::Increment>,
    ) -> Result<Self::Ok, Self::Err> {
        let stock::Increment {
            product_id,
            quantity,
        } = op;
        let quantity = units(quantity);

        const SQL: &str = "\
            UPDATE products \
            SET stock = stock + $2::INT4 \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&product_id, &quantity])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Builds a [`Product`] out of the provided `products` table [`Row`].
fn product_from_row(row: &Row) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
        discounted_price: row.get("discounted_price"),
        stock: u32::try_from(row.get::<_, i32>("stock")).unwrap_or_default(),
        category_id: row.get("category_id"),
    }
}

/// Converts the provided [`cart::Quantity`] into `INT4` units.
pub(super) fn units(quantity: cart::Quantity) -> i32 {
    i32::try_from(quantity.get()).unwrap_or(i32::MAX)
}
