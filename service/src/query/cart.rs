//! [`Query`] collection related to a single [`Cart`].

use std::collections::HashMap;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{cart, cart::pricing::Line, product, user, Cart, Product},
    infra::{database, Database},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Cart`] by its [`cart::Id`].
pub type ById = DatabaseQuery<By<Option<Cart>, cart::Id>>;

/// Queries a [`Cart`] by the [`user::Id`] of its owner.
pub type ByUser = DatabaseQuery<By<Option<Cart>, user::Id>>;

/// [`Query`] pricing the [`cart::Item`]s of a [`Cart`] against the live
/// [`Product`]s, in the order the [`cart::Item`]s were added.
///
/// [`cart::Item`]s of the removed [`Product`]s are skipped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Lines(pub cart::Id);

impl<Db> Query<Lines> for Service<Db>
where
    Db: Database<
            Select<By<Vec<cart::Item>, cart::Id>>,
            Ok = Vec<cart::Item>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<product::Id, Product>, Vec<product::Id>>>,
            Ok = HashMap<product::Id, Product>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<Line>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lines(cart_id): Lines,
    ) -> Result<Self::Ok, Self::Err> {
        let items = self
            .database()
            .execute(Select(By::<Vec<cart::Item>, _>::new(cart_id)))
            .await
            .map_err(tracerr::wrap!())?;
        if items.is_empty() {
            return Ok(vec![]);
        }

        let products = self
            .database()
            .execute(Select(By::new(
                items.iter().map(|i| i.product_id).collect::<Vec<_>>(),
            )))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Line::collect(&items, &products))
    }
}
