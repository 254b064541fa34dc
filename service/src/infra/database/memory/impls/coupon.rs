//! [`Coupon`]-related [`Database`] implementations.

use common::operations::{By, Perform, Select};
use tracerr::Traced;

use crate::{
    domain::{coupon, Coupon},
    infra::{
        database::{self, Memory},
        Database,
    },
    read,
};

impl Database<Select<By<Option<Coupon>, coupon::Code>>> for Memory {
    type Ok = Option<Coupon>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Coupon>, coupon::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        let code = by.into_inner();
        Ok(self.read(|s| s.coupons.values().find(|c| c.code == code).cloned()))
    }
}

impl Database<Perform<coupon::Redeem>> for Memory {
    type Ok = Option<read::coupon::UsedCount>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(op): Perform<coupon::Redeem>,
    ) -> Result<Self::Ok, Self::Err> {
        let coupon::Redeem { coupon_id } = op;

        Ok(self.modify(|s| {
            let c = s.coupons.get_mut(&coupon_id)?;
            if c.max_uses.is_some_and(|max| c.used_count >= max) {
                return None;
            }
            c.used_count += 1;
            Some(c.used_count.into())
        }))
    }
}
