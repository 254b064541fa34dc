//! [`Cart`]-related REST API definitions.

use axum::{extract::Path, Json};
use axum_extra::extract::{Query, WithRejection};
use common::Money;
use serde::{Deserialize, Serialize};
use service::{
    command::{
        self, add_cart_item, apply_coupon, clear_cart, create_guest_cart,
        get_user_cart, merge_carts, recompute_cart, remove_cart_item,
        remove_coupon, reserve_cart_stock, sync_cart_summary,
        update_cart_item,
    },
    domain::{
        cart::{self, MergeStrategy, Quantity},
        coupon, product, user,
    },
    read::{self, cart::View},
    Command as _,
};

use crate::{
    api::{coupon::CouponError, Data},
    define_error, AsError, Context, Error,
};

/// Shopping cart along with its priced items.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// ID of this [`Cart`].
    pub id: cart::Id,

    /// ID of the user owning this [`Cart`], if any.
    pub user_id: Option<user::Id>,

    /// [`Item`]s of this [`Cart`], in the order they were added.
    pub items: Vec<Item>,

    /// Total number of units in this [`Cart`].
    pub total_quantity: u32,

    /// Sum of all the line totals.
    pub subtotal: Money,

    /// Code of the coupon applied to this [`Cart`], if any.
    pub applied_coupon_code: Option<String>,

    /// Discount granted by the applied coupon.
    pub discount_amount: Money,

    /// Amount to pay.
    pub total: Money,

    /// RFC 3339 moment of the last modification of this [`Cart`].
    pub updated_at: String,

    /// Whether the figures are computed by the server (`SERVER`) or stored
    /// as supplied by the client (`CLIENT`).
    pub source: String,
}

impl From<View> for Cart {
    fn from(view: View) -> Self {
        let View {
            cart,
            lines,
            total_quantity,
            source,
        } = view;

        Self {
            id: cart.id,
            user_id: cart.user_id,
            items: lines
                .into_iter()
                .map(|l| Item {
                    product_id: l.product.id,
                    name: l.product.name.to_string(),
                    price: l.product.price,
                    discounted_price: l.product.discounted_price,
                    stock: l.product.stock,
                    quantity: l.quantity.get(),
                    line_total: l.total,
                })
                .collect(),
            total_quantity,
            subtotal: cart.snapshot.subtotal,
            applied_coupon_code: cart.coupon_code.map(|c| c.to_string()),
            discount_amount: cart.snapshot.discount,
            total: cart.snapshot.total,
            updated_at: cart.updated_at.to_rfc3339(),
            source: source.to_string(),
        }
    }
}

/// Line of a [`Cart`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// ID of the product.
    pub product_id: product::Id,

    /// Current name of the product.
    pub name: String,

    /// Regular price of the product.
    pub price: Money,

    /// Sale price of the product, if any.
    pub discounted_price: Option<Money>,

    /// Units of the product in stock.
    pub stock: u32,

    /// Units of the product in the [`Cart`].
    pub quantity: u32,

    /// Price of all the units at the effective product price.
    pub line_total: Money,
}

/// Query parameters of [`create()`].
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParams {
    /// ID of the [`Cart`] the client already holds.
    pub cart_id: Option<cart::Id>,
}

/// Request body of [`add_item()`].
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    /// ID of the product to add.
    pub product_id: product::Id,

    /// Number of units to add.
    #[serde(default = "AddItemRequest::default_quantity")]
    pub quantity: u32,
}

impl AddItemRequest {
    /// Default [`AddItemRequest::quantity`].
    const fn default_quantity() -> u32 {
        1
    }
}

/// Request body of [`update_item()`].
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct UpdateItemRequest {
    /// Desired number of units. Zero or less removes the line.
    #[serde(default = "UpdateItemRequest::default_quantity")]
    pub quantity: i64,
}

impl UpdateItemRequest {
    /// Default [`UpdateItemRequest::quantity`].
    const fn default_quantity() -> i64 {
        1
    }

    /// Returns the desired number of units, with zero for removing the line.
    fn units(self) -> u32 {
        u32::try_from(self.quantity.max(0)).unwrap_or(u32::MAX)
    }
}

/// Request body of [`apply_coupon()`].
#[derive(Clone, Debug, Deserialize)]
pub struct ApplyCouponRequest {
    /// Code of the coupon to apply.
    #[serde(default)]
    pub code: String,
}

/// Request body of [`sync_summary()`].
#[derive(Clone, Debug, Deserialize)]
pub struct SummaryRequest {
    /// Code of the coupon applied by the client. A blank one removes it.
    #[serde(alias = "couponCode", alias = "coupon_code")]
    pub code: Option<String>,

    /// Subtotal computed by the client.
    #[serde(alias = "sub_total", alias = "subTotal")]
    pub subtotal: Option<Money>,

    /// Discount computed by the client.
    #[serde(alias = "discount", alias = "discount_amount")]
    #[serde(rename = "discountAmount")]
    pub discount_amount: Option<Money>,

    /// Total computed by the client.
    pub total: Option<Money>,
}

/// Request body of [`merge()`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    /// ID of the guest [`Cart`] to merge.
    pub guest_cart_id: cart::Id,

    /// `SUM` (default) or `REPLACE`.
    pub strategy: Option<String>,
}

/// Response of [`checkout()`].
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    /// ID of the checked out [`Cart`].
    pub cart_id: cart::Id,
}

impl CheckoutResult {
    /// Wraps this [`CheckoutResult`] into a [`checkout()`] response.
    fn into_data(self) -> Data<Self> {
        Data::new(self).with_message("Stock reserved")
    }
}

/// Creates a new guest [`Cart`], or returns the one the client holds if it
/// still exists.
///
/// Responds with `201 Created` only if a new [`Cart`] is created.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - malformed `cartId`.
#[tracing::instrument(skip_all, fields(cart.id = ?params.cart_id))]
pub async fn create(
    ctx: Context,
    WithRejection(Query(params), _): WithRejection<
        Query<CreateParams>,
        Error,
    >,
) -> Result<(http::StatusCode, Data<Cart>), Error> {
    let out = ctx
        .service()
        .execute(command::CreateGuestCart {
            existing: params.cart_id,
        })
        .await
        .map_err(AsError::into_error)?;

    let status = if out.is_new {
        http::StatusCode::CREATED
    } else {
        http::StatusCode::OK
    };
    Ok((status, Data::new(out.cart.into())))
}

/// Returns the [`Cart`] recomputed against the current products.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - [`Cart`] doesn't exist.
#[tracing::instrument(skip_all, fields(cart.id = %cart_id))]
pub async fn get(
    ctx: Context,
    WithRejection(Path(cart_id), _): WithRejection<Path<cart::Id>, Error>,
) -> Result<Data<Cart>, Error> {
    ctx.service()
        .execute(command::RecomputeCart(cart_id))
        .await
        .map(|v| Data::new(v.into()))
        .map_err(AsError::into_error)
}

/// Adds units of a product to the [`Cart`].
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - product doesn't exist or `quantity` is zero;
/// - `NOT_FOUND` - [`Cart`] doesn't exist;
/// - `OUT_OF_STOCK` - product has no units in stock.
#[tracing::instrument(
    skip_all,
    fields(
        cart.id = %cart_id,
        product.id = %req.product_id,
        quantity = req.quantity,
    ),
)]
pub async fn add_item(
    ctx: Context,
    WithRejection(Path(cart_id), _): WithRejection<Path<cart::Id>, Error>,
    WithRejection(Json(req), _): WithRejection<Json<AddItemRequest>, Error>,
) -> Result<Data<Cart>, Error> {
    let quantity = Quantity::new(req.quantity)
        .ok_or_else(|| Error::bad_request(&"Quantity must be at least 1"))?;

    ctx.service()
        .execute(command::AddCartItem {
            cart_id,
            product_id: req.product_id,
            quantity,
        })
        .await
        .map(|v| Data::new(v.into()).with_message("Item added"))
        .map_err(AsError::into_error)
}

/// Sets the number of units of a product in the [`Cart`].
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - [`Cart`] doesn't exist or has no such product.
#[tracing::instrument(
    skip_all,
    fields(
        cart.id = %cart_id,
        product.id = %product_id,
        quantity = req.quantity,
    ),
)]
pub async fn update_item(
    ctx: Context,
    WithRejection(Path((cart_id, product_id)), _): WithRejection<
        Path<(cart::Id, product::Id)>,
        Error,
    >,
    WithRejection(Json(req), _): WithRejection<
        Json<UpdateItemRequest>,
        Error,
    >,
) -> Result<Data<Cart>, Error> {
    ctx.service()
        .execute(command::UpdateCartItem {
            cart_id,
            product_id,
            quantity: req.units(),
        })
        .await
        .map(|v| Data::new(v.into()).with_message("Item updated"))
        .map_err(AsError::into_error)
}

/// Removes a product from the [`Cart`], if present.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - [`Cart`] doesn't exist.
#[tracing::instrument(
    skip_all,
    fields(cart.id = %cart_id, product.id = %product_id),
)]
pub async fn remove_item(
    ctx: Context,
    WithRejection(Path((cart_id, product_id)), _): WithRejection<
        Path<(cart::Id, product::Id)>,
        Error,
    >,
) -> Result<Data<Cart>, Error> {
    ctx.service()
        .execute(command::RemoveCartItem {
            cart_id,
            product_id,
        })
        .await
        .map(|v| Data::new(v.into()).with_message("Item removed"))
        .map_err(AsError::into_error)
}

/// Removes all the products from the [`Cart`].
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - [`Cart`] doesn't exist.
#[tracing::instrument(skip_all, fields(cart.id = %cart_id))]
pub async fn clear(
    ctx: Context,
    WithRejection(Path(cart_id), _): WithRejection<Path<cart::Id>, Error>,
) -> Result<Data<Cart>, Error> {
    ctx.service()
        .execute(command::ClearCart(cart_id))
        .await
        .map(|v| Data::new(v.into()).with_message("Cart cleared"))
        .map_err(AsError::into_error)
}

/// Applies a coupon to the [`Cart`].
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - blank `code`;
/// - `NOT_FOUND` - [`Cart`] or coupon doesn't exist;
/// - `COUPON_NOT_APPLICABLE` - coupon cannot be applied to the [`Cart`].
#[tracing::instrument(skip_all, fields(cart.id = %cart_id, code = %req.code))]
pub async fn apply_coupon(
    ctx: Context,
    WithRejection(Path(cart_id), _): WithRejection<Path<cart::Id>, Error>,
    WithRejection(Json(req), _): WithRejection<
        Json<ApplyCouponRequest>,
        Error,
    >,
) -> Result<Data<Cart>, Error> {
    do_apply_coupon(&ctx, cart_id, &req.code).await
}

/// Removes the coupon from the [`Cart`].
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - [`Cart`] doesn't exist.
#[tracing::instrument(skip_all, fields(cart.id = %cart_id))]
pub async fn remove_coupon(
    ctx: Context,
    WithRejection(Path(cart_id), _): WithRejection<Path<cart::Id>, Error>,
) -> Result<Data<Cart>, Error> {
    do_remove_coupon(&ctx, cart_id).await
}

/// Stores the figures computed by the client as the [`Cart`] summary.
///
/// With an empty body the [`Cart`] is recomputed on the server instead.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - malformed or negative amounts;
/// - `NOT_FOUND` - [`Cart`] or coupon doesn't exist;
/// - `COUPON_NOT_APPLICABLE` - coupon cannot be applied to the [`Cart`].
#[tracing::instrument(skip_all, fields(cart.id = %cart_id))]
pub async fn sync_summary(
    ctx: Context,
    WithRejection(Path(cart_id), _): WithRejection<Path<cart::Id>, Error>,
    WithRejection(Json(req), _): WithRejection<Json<SummaryRequest>, Error>,
) -> Result<Data<Cart>, Error> {
    do_sync_summary(&ctx, cart_id, req).await
}

/// Takes the units of all the [`Cart`] products from the stock, all or
/// nothing.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - [`Cart`] doesn't exist;
/// - `OUT_OF_STOCK` - some products lack units, listed in `fields` along
///                    with the units available.
#[tracing::instrument(skip_all, fields(cart.id = %cart_id))]
pub async fn checkout(
    ctx: Context,
    WithRejection(Path(cart_id), _): WithRejection<Path<cart::Id>, Error>,
) -> Result<Data<CheckoutResult>, Error> {
    drop(
        ctx.service()
            .execute(command::ReserveCartStock(cart_id))
            .await
            .map_err(AsError::into_error)?,
    );

    Ok(CheckoutResult { cart_id }.into_data())
}

/// Returns the [`Cart`] of the authenticated user, creating it on the first
/// access.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn mine(ctx: Context) -> Result<Data<Cart>, Error> {
    let user = ctx.current_user().await?;

    ctx.service()
        .execute(command::GetUserCart(user.id))
        .await
        .map(|v| Data::new(v.into()))
        .map_err(AsError::into_error)
}

/// Applies a coupon to the [`Cart`] of the authenticated user.
///
/// # Errors
///
/// Same as [`apply_coupon()`], plus `UNAUTHORIZED`.
#[tracing::instrument(skip_all, fields(code = %req.code))]
pub async fn apply_my_coupon(
    ctx: Context,
    WithRejection(Json(req), _): WithRejection<
        Json<ApplyCouponRequest>,
        Error,
    >,
) -> Result<Data<Cart>, Error> {
    let cart_id = my_cart_id(&ctx).await?;
    do_apply_coupon(&ctx, cart_id, &req.code).await
}

/// Removes the coupon from the [`Cart`] of the authenticated user.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn remove_my_coupon(ctx: Context) -> Result<Data<Cart>, Error> {
    let cart_id = my_cart_id(&ctx).await?;
    do_remove_coupon(&ctx, cart_id).await
}

/// Stores the figures computed by the client as the summary of the [`Cart`]
/// of the authenticated user.
///
/// # Errors
///
/// Same as [`sync_summary()`], plus `UNAUTHORIZED`.
#[tracing::instrument(skip_all)]
pub async fn sync_my_summary(
    ctx: Context,
    WithRejection(Json(req), _): WithRejection<Json<SummaryRequest>, Error>,
) -> Result<Data<Cart>, Error> {
    let cart_id = my_cart_id(&ctx).await?;
    do_sync_summary(&ctx, cart_id, req).await
}

/// Merges a guest [`Cart`] into the [`Cart`] of the authenticated user.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - request is not authenticated;
/// - `BAD_REQUEST` - unknown `strategy`;
/// - `NOT_FOUND` - guest [`Cart`] doesn't exist.
#[tracing::instrument(
    skip_all,
    fields(cart.id = %req.guest_cart_id, strategy = ?req.strategy),
)]
pub async fn merge(
    ctx: Context,
    WithRejection(Json(req), _): WithRejection<Json<MergeRequest>, Error>,
) -> Result<Data<Cart>, Error> {
    let user = ctx.current_user().await?;
    let strategy = req
        .strategy
        .as_deref()
        .map(str::parse::<MergeStrategy>)
        .transpose()
        .map_err(|_| Error::bad_request(&"Unknown merge strategy"))?
        .unwrap_or_default();

    ctx.service()
        .execute(command::MergeCarts {
            user_id: user.id,
            guest_cart_id: req.guest_cart_id,
            strategy,
        })
        .await
        .map(|v| Data::new(v.into()).with_message("Carts merged"))
        .map_err(AsError::into_error)
}

/// Resolves the ID of the [`Cart`] of the authenticated user.
async fn my_cart_id(ctx: &Context) -> Result<cart::Id, Error> {
    let user = ctx.current_user().await?;

    ctx.service()
        .execute(command::GetUserCart(user.id))
        .await
        .map(|v| v.cart.id)
        .map_err(AsError::into_error)
}

/// Applies the coupon with the provided raw `code` to the [`Cart`].
async fn do_apply_coupon(
    ctx: &Context,
    cart_id: cart::Id,
    code: &str,
) -> Result<Data<Cart>, Error> {
    let code = coupon::Code::new(code)
        .ok_or_else(|| Error::bad_request(&"Code is required"))?;

    ctx.service()
        .execute(command::ApplyCoupon { cart_id, code })
        .await
        .map(|v| Data::new(v.into()).with_message("Coupon applied"))
        .map_err(AsError::into_error)
}

/// Removes the coupon from the [`Cart`].
async fn do_remove_coupon(
    ctx: &Context,
    cart_id: cart::Id,
) -> Result<Data<Cart>, Error> {
    ctx.service()
        .execute(command::RemoveCoupon(cart_id))
        .await
        .map(|v| Data::new(v.into()).with_message("Coupon removed"))
        .map_err(AsError::into_error)
}

/// Stores the client-supplied summary of the [`Cart`].
async fn do_sync_summary(
    ctx: &Context,
    cart_id: cart::Id,
    req: SummaryRequest,
) -> Result<Data<Cart>, Error> {
    let SummaryRequest {
        code,
        subtotal,
        discount_amount,
        total,
    } = req;

    ctx.service()
        .execute(command::SyncCartSummary {
            cart_id,
            coupon_code: code,
            subtotal,
            discount: discount_amount,
            total,
        })
        .await
        .map(|v| Data::new(v.into()).with_message("Summary updated"))
        .map_err(AsError::into_error)
}

define_error! {
    enum CartError {
        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Cart not found"]
        NotExists,

        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Guest cart not found"]
        GuestNotExists,

        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Item not in cart"]
        ItemNotExists,

        #[code = "BAD_REQUEST"]
        #[status = BAD_REQUEST]
        #[message = "Product not found"]
        ProductNotExists,

        #[code = "OUT_OF_STOCK"]
        #[status = BAD_REQUEST]
        #[message = "Product out of stock"]
        ProductOutOfStock,

        #[code = "OUT_OF_STOCK"]
        #[status = CONFLICT]
        #[message = "One or more items are out of stock"]
        OutOfStock,

        #[code = "BAD_REQUEST"]
        #[status = BAD_REQUEST]
        #[message = "Amounts must not be negative"]
        NegativeAmount,
    }
}

/// Creates a `COUPON_NOT_APPLICABLE` [`Error`] out of the provided
/// [`coupon::Rejection`].
pub(crate) fn not_applicable(rejection: coupon::Rejection) -> Error {
    Error::new(
        "COUPON_NOT_APPLICABLE",
        http::StatusCode::BAD_REQUEST,
        &rejection,
    )
}

/// Creates an `OUT_OF_STOCK` [`Error`] listing the units available for the
/// lacking products.
pub(crate) fn out_of_stock(
    availability: &read::product::Availability,
) -> Error {
    Error::from(CartError::OutOfStock).with_fields(
        availability
            .iter()
            .map(|(id, units)| (id.to_string(), units.to_string()))
            .collect(),
    )
}

impl AsError for recompute_cart::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CartNotExists(_) => Some(CartError::NotExists.into()),
        }
    }
}

impl AsError for create_guest_cart::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Recompute(e) => e.try_as_error(),
        }
    }
}

impl AsError for get_user_cart::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Recompute(e) => e.try_as_error(),
        }
    }
}

impl AsError for add_cart_item::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Recompute(e) => e.try_as_error(),
            Self::CartNotExists(_) => Some(CartError::NotExists.into()),
            Self::ProductNotExists(_) => {
                Some(CartError::ProductNotExists.into())
            }
            Self::OutOfStock(_) => Some(CartError::ProductOutOfStock.into()),
        }
    }
}

impl AsError for update_cart_item::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Recompute(e) => e.try_as_error(),
            Self::CartNotExists(_) => Some(CartError::NotExists.into()),
            Self::ItemNotExists(_) => Some(CartError::ItemNotExists.into()),
        }
    }
}

impl AsError for remove_cart_item::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Recompute(e) => e.try_as_error(),
            Self::CartNotExists(_) => Some(CartError::NotExists.into()),
        }
    }
}

impl AsError for clear_cart::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Recompute(e) => e.try_as_error(),
            Self::CartNotExists(_) => Some(CartError::NotExists.into()),
        }
    }
}

impl AsError for apply_coupon::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CartNotExists(_) => Some(CartError::NotExists.into()),
            Self::CouponNotExists(_) => Some(CouponError::NotExists.into()),
            Self::NotApplicable(r) => Some(not_applicable(*r)),
        }
    }
}

impl AsError for remove_coupon::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CartNotExists(_) => Some(CartError::NotExists.into()),
        }
    }
}

impl AsError for sync_cart_summary::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Recompute(e) => e.try_as_error(),
            Self::CartNotExists(_) => Some(CartError::NotExists.into()),
            Self::CouponNotExists(_) => Some(CouponError::NotExists.into()),
            Self::NotApplicable(r) => Some(not_applicable(*r)),
            Self::NegativeAmount(_) => Some(CartError::NegativeAmount.into()),
        }
    }
}

impl AsError for merge_carts::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Recompute(e) => e.try_as_error(),
            Self::GuestCartNotExists(_) => {
                Some(CartError::GuestNotExists.into())
            }
        }
    }
}

impl AsError for reserve_cart_stock::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Release(_) => None,
            Self::CartNotExists(_) => Some(CartError::NotExists.into()),
            Self::OutOfStock(a) => Some(out_of_stock(a)),
        }
    }
}
