//! [`Order`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Lock, Perform, Select, Update};
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{cart, order, user, Order},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

use super::product::units;

impl<C, IDs> Database<Select<By<HashMap<order::Id, Order>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[order::Id]>,
{
    type Ok = HashMap<order::Id, Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<order::Id, Order>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[order::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, number, user_id, status, payment_method, \
                   contact_name, contact_email, contact_phone, \
                   shipping_address, \
                   subtotal, discount, total, coupon_code, \
                   created_at \
            FROM orders \
            WHERE id = ANY($1::UUID[])";
        let mut orders = self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let order = order_from_row(row);
                (order.id, order)
            })
            .collect::<HashMap<_, _>>();

        const ITEMS_SQL: &str = "\
            SELECT order_id, product_id, name, price, quantity \
            FROM order_items \
            WHERE order_id = ANY($1::UUID[]) \
            ORDER BY order_id, position ASC";
        for row in self
            .query(ITEMS_SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
        {
            let order_id: order::Id = row.get("order_id");
            let Some(quantity) = u32::try_from(row.get::<_, i32>("quantity"))
                .ok()
                .and_then(cart::Quantity::new)
            else {
                continue;
            };
            if let Some(order) = orders.get_mut(&order_id) {
                order.items.push(order::Item {
                    product_id: row.get("product_id"),
                    name: row.get("name"),
                    price: row.get("price"),
                    quantity,
                });
            }
        }

        Ok(orders)
    }
}

impl<C> Database<Select<By<Option<Order>, order::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<order::Id, Order>, [order::Id; 1]>>,
        Ok = HashMap<order::Id, Order>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Option<Order>, order::Number>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<Order>, order::Id>>,
        Ok = Option<Order>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Number>>,
    ) -> Result<Self::Ok, Self::Err> {
        let number = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM orders \
            WHERE number = $1::INT4 \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&number])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let order_id: order::Id = row.get("id");
        self.execute(Select(By::new(order_id)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Vec<Order>, user::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<order::Id, Order>, Vec<order::Id>>>,
        Ok = HashMap<order::Id, Order>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Order>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM orders \
            WHERE user_id = $1::UUID \
            ORDER BY created_at DESC, number DESC";
        let ids = self
            .query(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get("id"))
            .collect::<Vec<order::Id>>();

        let mut orders = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(ids.iter().filter_map(|id| orders.remove(id)).collect())
    }
}

impl<C> Database<Select<By<read::order::Stats, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::order::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::order::Stats, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        let delivered = order::Status::Delivered;

        const SQL: &str = "\
            SELECT COUNT(*) AS total_orders, \
                   COUNT(*) FILTER (WHERE status = $2::INT2) \
                       AS completed_orders, \
                   COALESCE(\
                       SUM(total) FILTER (WHERE status = $2::INT2), 0\
                   ) AS total_spent \
            FROM orders \
            WHERE user_id = $1::UUID";
        let row = self
            .query_opt(SQL, &[&user_id, &delivered])
            .await
            .map_err(tracerr::wrap!())?
            .expect("always exists");

        Ok(read::order::Stats {
            total_orders: u64::try_from(row.get::<_, i64>("total_orders"))
                .unwrap_or_default(),
            completed_orders: u64::try_from(
                row.get::<_, i64>("completed_orders"),
            )
            .unwrap_or_default(),
            total_spent: row.get::<_, Decimal>("total_spent").into(),
        })
    }
}

impl<C> Database<Perform<order::AllocateNumber>> for Postgres<C>
where
    C: Connection,
{
    type Ok = order::Number;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Perform<order::AllocateNumber>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT nextval('order_numbers')::INT4 AS number";
        Ok(self
            .query_opt(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .expect("always exists")
            .get("number"))
    }
}

impl<C> Database<Insert<Order>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(order): Insert<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        let Order {
            id,
            number,
            user_id,
            status,
            payment_method,
            contact,
            shipping_address,
            snapshot:
                cart::Snapshot {
                    subtotal,
                    discount,
                    total,
                },
            coupon_code,
            items,
            created_at,
        } = order;

        const SQL: &str = "\
            INSERT INTO orders (\
                id, number, user_id, status, payment_method, \
                contact_name, contact_email, contact_phone, \
                shipping_address, \
                subtotal, discount, total, coupon_code, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::INT4, $3::UUID, $4::INT2, $5::INT2, \
                $6::VARCHAR, $7::VARCHAR, $8::VARCHAR, \
                $9::TEXT, \
                $10::NUMERIC, $11::NUMERIC, $12::NUMERIC, $13::VARCHAR, \
                $14::TIMESTAMPTZ\
            )";
        _ = self
            .exec(
                SQL,
                &[
                    &id,
                    &number,
                    &user_id,
                    &status,
                    &payment_method,
                    &contact.name,
                    &contact.email,
                    &contact.phone,
                    &shipping_address,
                    &subtotal,
                    &discount,
                    &total,
                    &coupon_code,
                    &created_at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;

        const ITEM_SQL: &str = "\
            INSERT INTO order_items (\
                order_id, position, product_id, name, price, quantity\
            ) \
            VALUES (\
                $1::UUID, $2::INT4, $3::UUID, \
                $4::VARCHAR, $5::NUMERIC, $6::INT4\
            )";
        for (position, item) in (0_i32..).zip(&items) {
            _ = self
                .exec(
                    ITEM_SQL,
                    &[
                        &id,
                        &position,
                        &item.product_id,
                        &item.name,
                        &item.price,
                        &units(item.quantity),
                    ],
                )
                .await
                .map_err(tracerr::wrap!())?;
        }

        Ok(())
    }
}

impl<C> Database<Update<Order>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(order): Update<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        // Everything but the `status` is immutable once placed.
        let Order { id, status, .. } = order;

        const SQL: &str = "\
            UPDATE orders \
            SET status = $2::INT2 \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &status])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Order, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Order, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        // `order_items` are removed by `ON DELETE CASCADE`.
        const SQL: &str = "\
            DELETE FROM orders \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Order, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Order, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM orders \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Builds an [`Order`] without its [`order::Item`]s out of the provided
/// `orders` table [`Row`].
fn order_from_row(row: &Row) -> Order {
    Order {
        id: row.get("id"),
        number: row.get("number"),
        user_id: row.get("user_id"),
        status: row.get("status"),
        payment_method: row.get("payment_method"),
        contact: order::Contact {
            name: row.get("contact_name"),
            email: row.get("contact_email"),
            phone: row.get("contact_phone"),
        },
        shipping_address: row.get("shipping_address"),
        snapshot: cart::Snapshot {
            subtotal: row.get("subtotal"),
            discount: row.get("discount"),
            total: row.get("total"),
        },
        coupon_code: row.get("coupon_code"),
        items: Vec::new(),
        created_at: row.get("created_at"),
    }
}
