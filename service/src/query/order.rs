//! [`Query`] collection related to [`Order`]s.

use common::operations::By;

use crate::{
    domain::{order, user, Order},
    read,
};
#[cfg(doc)]
use crate::{domain::User, Query};

use super::DatabaseQuery;

/// Queries an [`Order`] by its [`order::Id`].
pub type ById = DatabaseQuery<By<Option<Order>, order::Id>>;

/// Queries an [`Order`] by its [`order::Number`].
pub type ByNumber = DatabaseQuery<By<Option<Order>, order::Number>>;

/// Queries all the [`Order`]s placed by a [`User`], newest first.
pub type ByUser = DatabaseQuery<By<Vec<Order>, user::Id>>;

/// Queries [`read::order::Stats`] of a [`User`].
pub type Stats = DatabaseQuery<By<read::order::Stats, user::Id>>;
