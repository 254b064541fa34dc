//! [`Product`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Perform, Select};
use tracerr::Traced;

use crate::{
    domain::{
        product::{self, stock},
        Product,
    },
    infra::{
        database::{self, Memory},
        Database,
    },
    read,
};

impl<IDs> Database<Select<By<HashMap<product::Id, Product>, IDs>>> for Memory
where
    IDs: AsRef<[product::Id]>,
{
    type Ok = HashMap<product::Id, Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<product::Id, Product>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        Ok(self.read(|s| {
            ids.as_ref()
                .iter()
                .filter_map(|id| Some((*id, s.products.get(id)?.clone())))
                .collect()
        }))
    }
}

impl Database<Select<By<Option<Product>, product::Id>>> for Memory {
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.read(|s| s.products.get(&id).cloned()))
    }
}

impl Database<Perform<stock::Decrement>> for Memory {
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

        Ok(read::product::Decremented(self.modify(|s| {
            let Some(p) = s.products.get_mut(&product_id) else {
                return false;
            };
            let Some(left) = p.stock.checked_sub(quantity.get()) else {
                return false;
            };
            p.stock = left;
            true
        })))
    }
}

impl Database<Perform<stock::Increment>> for Memory {
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

        self.modify(|s| {
            if let Some(p) = s.products.get_mut(&product_id) {
                p.stock = p.stock.saturating_add(quantity.get());
            }
        });
        Ok(())
    }
}
