//! REST API definitions.

pub mod cart;
pub mod coupon;
pub mod order;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use axum_extra::extract::QueryRejection;
use serde::Serialize;

use crate::{AsError as _, Error};

/// Builds the [`Router`] serving the whole REST API under `/api`.
///
/// Expects the [`Service`] to be provided as an [`Extension`].
///
/// [`Extension`]: axum::Extension
/// [`Service`]: crate::Service
pub fn router() -> Router {
    let api = Router::new()
        .route("/carts", post(cart::create))
        .route("/carts/:cart_id", get(cart::get).delete(cart::clear))
        .route("/carts/:cart_id/items", post(cart::add_item))
        .route(
            "/carts/:cart_id/items/:product_id",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/carts/:cart_id/apply-coupon", post(cart::apply_coupon))
        .route("/carts/:cart_id/coupon", delete(cart::remove_coupon))
        .route("/carts/:cart_id/summary", patch(cart::sync_summary))
        .route("/carts/:cart_id/checkout", post(cart::checkout))
        .route("/me/cart", get(cart::mine))
        .route("/me/cart/apply-coupon", post(cart::apply_my_coupon))
        .route("/me/cart/coupon", delete(cart::remove_my_coupon))
        .route("/me/cart/summary", patch(cart::sync_my_summary))
        .route("/me/cart/merge", post(cart::merge))
        .route("/orders", post(order::create))
        .route("/orders/:order_id", get(order::get))
        .route("/orders/number/:number", get(order::get_by_number))
        .route("/me/orders", get(order::mine).post(order::create_mine))
        .route("/me/orders/stats", get(order::my_stats))
        .route(
            "/me/orders/:order_id/cancel",
            patch(order::cancel).post(order::cancel),
        )
        .route("/coupons/:code/validate", get(coupon::validate))
        .route("/coupons/:code/redeem", post(coupon::redeem))
        .route(
            "/admin/orders/:order_id",
            get(order::admin_get).delete(order::delete),
        )
        .route("/admin/orders/:order_id/status", patch(order::update_status));

    Router::new().nest("/api", api)
}

/// Successful REST API response.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    /// Payload of this response.
    data: T,

    /// Human-readable note about the performed operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<Meta>,
}

impl<T> Data<T> {
    /// Wraps the provided payload into a [`Data`] response.
    pub fn new(data: T) -> Self {
        Self { data, meta: None }
    }

    /// Attaches the provided human-readable `message` to this response.
    #[must_use]
    pub fn with_message(mut self, message: &'static str) -> Self {
        self.meta = Some(Meta { message });
        self
    }
}

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Metadata of a [`Data`] response.
#[derive(Clone, Copy, Debug, Serialize)]
struct Meta {
    /// Human-readable note.
    message: &'static str,
}

impl From<JsonRejection> for Error {
    fn from(e: JsonRejection) -> Self {
        e.into_error()
    }
}

impl From<PathRejection> for Error {
    fn from(e: PathRejection) -> Self {
        e.into_error()
    }
}

impl From<QueryRejection> for Error {
    fn from(e: QueryRejection) -> Self {
        e.into_error()
    }
}

#[cfg(test)]
mod spec {
    use super::Data;

    #[test]
    fn omits_missing_meta() {
        assert_eq!(
            serde_json::to_value(Data::new(1)).unwrap(),
            serde_json::json!({"data": 1}),
        );
        assert_eq!(
            serde_json::to_value(Data::new(1).with_message("Cart cleared"))
                .unwrap(),
            serde_json::json!({
                "data": 1,
                "meta": {"message": "Cart cleared"},
            }),
        );
    }
}
