//! [`Coupon`]-related [`Database`] implementations.

use common::operations::{By, Perform, Select};
use rust_decimal::Decimal;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        coupon::{self, discount, Assignment, Discount},
        Coupon,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C> Database<Select<By<Option<Coupon>, coupon::Code>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Coupon>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Coupon>, coupon::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        let code = by.into_inner();

        const SQL: &str = "\
            SELECT id, code, \
                   discount_kind, discount_value, \
                   expires_at, max_uses, used_count, is_active \
            FROM coupons \
            WHERE LOWER(code) = LOWER($1::VARCHAR) \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&code])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };
        let id: coupon::Id = row.get("id");

        const ASSIGNMENTS_SQL: &str = "\
            SELECT kind, target \
            FROM coupon_assignments \
            WHERE coupon_id = $1::UUID";
        let assignments = self
            .query(ASSIGNMENTS_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Assignment {
                kind: row.get("kind"),
                target: row.get("target"),
            })
            .collect();

        let Some(discount) = discount_of(
            id,
            row.get("discount_kind"),
            row.get("discount_value"),
        ) else {
            return Ok(None);
        };
        Ok(Some(Coupon {
            id,
            code: row.get("code"),
            discount,
            expires_at: row.get("expires_at"),
            max_uses: row
                .get::<_, Option<i32>>("max_uses")
                .map(|m| u32::try_from(m).unwrap_or_default()),
            used_count: u32::try_from(row.get::<_, i32>("used_count"))
                .unwrap_or_default(),
            is_active: row.get("is_active"),
            assignments,
        }))
    }
}

/// Builds the [`Discount`] of the stored [`Coupon`] with the provided ID.
///
/// A [`Coupon`] stored with an out-of-bounds [`Discount`] is logged and
/// treated as a missing one, so that it is dropped from the carts holding it.
fn discount_of(
    id: coupon::Id,
    kind: discount::Kind,
    value: Decimal,
) -> Option<Discount> {
    let discount = Discount::new(kind, value);
    if discount.is_none() {
        log::error!(
            coupon.id = %id,
            "`Coupon` has invalid {kind} discount of {value}, ignoring it",
        );
    }
    discount
}

impl<C> Database<Perform<coupon::Redeem>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<read::coupon::UsedCount>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(op): Perform<coupon::Redeem>,
    ) -> Result<Self::Ok, Self::Err> {
        let coupon::Redeem { coupon_id } = op;

        // Must stay a single conditional statement.
        const SQL: &str = "\
            UPDATE coupons \
            SET used_count = used_count + 1 \
            WHERE id = $1::UUID \
              AND (max_uses IS NULL OR used_count < max_uses) \
            RETURNING used_count";
        Ok(self
            .query_opt(SQL, &[&coupon_id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| {
                u32::try_from(row.get::<_, i32>("used_count"))
                    .unwrap_or_default()
                    .into()
            }))
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::domain::coupon::{self, discount::Kind};

    use super::discount_of;

    #[test]
    fn ignores_out_of_bounds_discount() {
        let id = coupon::Id::new();

        assert!(discount_of(id, Kind::Percent, Decimal::from(150)).is_none());
        assert!(discount_of(id, Kind::Percent, Decimal::from(15)).is_some());
        assert!(discount_of(id, Kind::Fixed, Decimal::from(150)).is_some());
    }
}
