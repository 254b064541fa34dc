//! [`Order`]-related [`Database`] implementations.

use std::{cmp::Reverse, collections::HashMap};

use common::operations::{By, Delete, Insert, Lock, Perform, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{order, user, Order},
    infra::{
        database::{self, memory::Row, Memory},
        Database,
    },
    read,
};

impl<IDs> Database<Select<By<HashMap<order::Id, Order>, IDs>>> for Memory
where
    IDs: AsRef<[order::Id]>,
{
    type Ok = HashMap<order::Id, Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<order::Id, Order>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        Ok(self.read(|s| {
            ids.as_ref()
                .iter()
                .filter_map(|id| Some((*id, s.orders.get(id)?.clone())))
                .collect()
        }))
    }
}

impl Database<Select<By<Option<Order>, order::Id>>> for Memory {
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.read(|s| s.orders.get(&id).cloned()))
    }
}

impl Database<Select<By<Option<Order>, order::Number>>> for Memory {
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Number>>,
    ) -> Result<Self::Ok, Self::Err> {
        let number = by.into_inner();
        Ok(self.read(|s| {
            s.orders.values().find(|o| o.number == number).cloned()
        }))
    }
}

impl Database<Select<By<Vec<Order>, user::Id>>> for Memory {
    type Ok = Vec<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Order>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        let mut orders = self.read(|s| {
            s.orders
                .values()
                .filter(|o| o.user_id == Some(user_id))
                .cloned()
                .collect::<Vec<_>>()
        });
        orders.sort_by_key(|o| Reverse((o.created_at, o.number)));
        Ok(orders)
    }
}

impl Database<Select<By<read::order::Stats, user::Id>>> for Memory {
    type Ok = read::order::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::order::Stats, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        Ok(self.read(|s| {
            s.orders
                .values()
                .filter(|o| o.user_id == Some(user_id))
                .fold(read::order::Stats::default(), |mut stats, o| {
                    stats.total_orders += 1;
                    if o.status == order::Status::Delivered {
                        stats.completed_orders += 1;
                        stats.total_spent += o.snapshot.total;
                    }
                    stats
                })
        }))
    }
}

impl Database<Perform<order::AllocateNumber>> for Memory {
    type Ok = order::Number;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Perform<order::AllocateNumber>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.modify(|s| {
            s.last_order_number += 1;
            s.last_order_number.into()
        }))
    }
}

impl Database<Insert<Order>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(order): Insert<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(move |s| {
            _ = s.orders.insert(order.id, order);
        });
        Ok(())
    }
}

impl Database<Update<Order>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(order): Update<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        // Everything but the `status` is immutable once placed.
        let Order { id, status, .. } = order;
        self.write(move |s| {
            if let Some(o) = s.orders.get_mut(&id) {
                o.status = status;
            }
        });
        Ok(())
    }
}

impl Database<Delete<By<Order, order::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Order, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(move |s| {
            _ = s.orders.remove(&id);
        });
        Ok(())
    }
}

impl Database<Lock<By<Order, order::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Order, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.hold(Row::Order(by.into_inner())).await;
        Ok(())
    }
}
