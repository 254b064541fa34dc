//! [`Cart`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{cart, product, user, Cart},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

use super::product::units;

impl<C> Database<Select<By<Option<Cart>, cart::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Cart>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Cart>, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, coupon_code, \
                   subtotal, discount, total, \
                   created_at, updated_at \
            FROM carts \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(cart_from_row))
    }
}

impl<C> Database<Select<By<Option<Cart>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Cart>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Cart>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, coupon_code, \
                   subtotal, discount, total, \
                   created_at, updated_at \
            FROM carts \
            WHERE user_id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(cart_from_row))
    }
}

impl<C> Database<Insert<Cart>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Cart>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(cart): Insert<Cart>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(cart)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Cart>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(cart): Update<Cart>,
    ) -> Result<Self::Ok, Self::Err> {
        let Cart {
            id,
            user_id,
            coupon_code,
            snapshot:
                cart::Snapshot {
                    subtotal,
                    discount,
                    total,
                },
            created_at,
            updated_at,
        } = cart;

        const SQL: &str = "\
            INSERT INTO carts (\
                id, user_id, coupon_code, \
                subtotal, discount, total, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, \
                $4::NUMERIC, $5::NUMERIC, $6::NUMERIC, \
                $7::TIMESTAMPTZ, $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET user_id = EXCLUDED.user_id, \
                coupon_code = EXCLUDED.coupon_code, \
                subtotal = EXCLUDED.subtotal, \
                discount = EXCLUDED.discount, \
                total = EXCLUDED.total, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &coupon_code,
                &subtotal,
                &discount,
                &total,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Cart, cart::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Cart, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        // `cart_items` are removed by `ON DELETE CASCADE`.
        const SQL: &str = "\
            DELETE FROM carts \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Cart, cart::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Cart, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM carts \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Cart, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Cart, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        // There may be no `Cart` row to lock yet, so an advisory lock is
        // taken instead.
        const SQL: &str = "\
            SELECT pg_advisory_xact_lock(\
                hashtextextended($1::UUID::TEXT, 0)\
            )";
        self.query(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Vec<cart::Item>, cart::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<cart::Item>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<cart::Item>, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let cart_id = by.into_inner();

        const SQL: &str = "\
            SELECT cart_id, product_id, quantity, created_at \
            FROM cart_items \
            WHERE cart_id = $1::UUID \
            ORDER BY created_at ASC, product_id ASC";
        Ok(self
            .query(SQL, &[&cart_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .filter_map(|row| {
                let quantity = u32::try_from(row.get::<_, i32>("quantity"))
                    .ok()
                    .and_then(cart::Quantity::new)?;
                Some(cart::Item {
                    cart_id: row.get("cart_id"),
                    product_id: row.get("product_id"),
                    quantity,
                    created_at: row.get("created_at"),
                })
            })
            .collect())
    }
}

impl<C> Database<Insert<cart::Item>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<cart::Item>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(item): Insert<cart::Item>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(item)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<cart::Item>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(item): Update<cart::Item>,
    ) -> Result<Self::Ok, Self::Err> {
        let cart::Item {
            cart_id,
            product_id,
            quantity,
            created_at,
        } = item;
        let quantity = units(quantity);

        const SQL: &str = "\
            INSERT INTO cart_items (\
                cart_id, product_id, quantity, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT4, $4::TIMESTAMPTZ\
            ) \
            ON CONFLICT (cart_id, product_id) DO UPDATE \
            SET quantity = EXCLUDED.quantity";
        self.exec(SQL, &[&cart_id, &product_id, &quantity, &created_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<cart::Item, (cart::Id, product::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<cart::Item, (cart::Id, product::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (cart_id, product_id) = by.into_inner();

        const SQL: &str = "\
            DELETE FROM cart_items \
            WHERE cart_id = $1::UUID \
              AND product_id = $2::UUID";
        self.exec(SQL, &[&cart_id, &product_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Vec<cart::Item>, cart::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Vec<cart::Item>, cart::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let cart_id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM cart_items \
            WHERE cart_id = $1::UUID";
        self.exec(SQL, &[&cart_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Builds a [`Cart`] out of the provided `carts` table [`Row`].
fn cart_from_row(row: &Row) -> Cart {
    Cart {
        id: row.get("id"),
        user_id: row.get("user_id"),
        coupon_code: row.get("coupon_code"),
        snapshot: cart::Snapshot {
            subtotal: row.get("subtotal"),
            discount: row.get("discount"),
            total: row.get("total"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
