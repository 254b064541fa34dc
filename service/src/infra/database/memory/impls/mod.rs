//! [`Database`] implementations.

mod cart;
mod coupon;
mod order;
mod product;
mod user;

use common::operations::{Commit, Transact};
use tracerr::Traced;

use crate::infra::{database, Database};

use super::Memory;

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(if self.is_tx() {
            self.clone()
        } else {
            self.transact()
        })
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit()
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}
