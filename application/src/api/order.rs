//! [`Order`]-related REST API definitions.

use axum::{extract::Path, Json};
use axum_extra::extract::WithRejection;
use common::Money;
use derive_more::Debug;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use service::{
    command::{
        self, cancel_order, create_order, delete_order, update_order_status,
    },
    domain::{
        cart,
        order::{self, payment, CancellationError},
        product, user,
    },
    query, read, Command as _,
};

use crate::{api::Data, define_error, AsError, Context, Error};

/// Placed order.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// ID of this [`Order`].
    pub id: order::Id,

    /// Sequential number of this [`Order`].
    pub order_number: i32,

    /// [`Order::order_number`] padded with zeroes to three digits.
    pub order_number_formatted: String,

    /// ID of the user who placed this [`Order`], if not a guest.
    pub user_id: Option<user::Id>,

    /// `PENDING`, `PROCESSING`, `SHIPPED`, `DELIVERED` or `CANCELLED`.
    pub status: String,

    /// `COD` or `CARD`.
    pub payment_method: String,

    /// Printable shipping label.
    pub shipping_address: String,

    /// Name of the recipient.
    pub guest_name: Option<String>,

    /// Email of the recipient.
    pub guest_email: Option<String>,

    /// Phone of the recipient.
    pub guest_phone: Option<String>,

    /// Subtotal copied from the cart.
    pub subtotal: Money,

    /// Discount copied from the cart.
    pub discount: Money,

    /// Total copied from the cart.
    pub total: Money,

    /// Code of the coupon applied to the cart, if any.
    pub coupon_code: Option<String>,

    /// RFC 3339 moment this [`Order`] was placed at.
    pub created_at: String,

    /// [`Item`]s of this [`Order`].
    pub items: Vec<Item>,

    /// [`Coupon`] applied to this [`Order`], if any.
    pub coupon: Option<Coupon>,
}

impl From<order::Order> for Order {
    fn from(o: order::Order) -> Self {
        let coupon = o.coupon_code.as_ref().map(|c| Coupon {
            code: c.to_string(),
            discount_amount: o.snapshot.discount,
        });

        Self {
            id: o.id,
            order_number: o.number.into(),
            order_number_formatted: o.number.to_string(),
            user_id: o.user_id,
            status: o.status.to_string(),
            payment_method: o.payment_method.to_string(),
            shipping_address: o.shipping_address.to_string(),
            guest_name: o.contact.name,
            guest_email: o.contact.email,
            guest_phone: o.contact.phone,
            subtotal: o.snapshot.subtotal,
            discount: o.snapshot.discount,
            total: o.snapshot.total,
            coupon_code: o.coupon_code.map(|c| c.to_string()),
            created_at: o.created_at.to_rfc3339(),
            items: o
                .items
                .into_iter()
                .map(|i| Item {
                    product_id: i.product_id,
                    name: i.name.to_string(),
                    price: i.price,
                    quantity: i.quantity.get(),
                })
                .collect(),
            coupon,
        }
    }
}

/// Line of an [`Order`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// ID of the ordered product.
    pub product_id: product::Id,

    /// Name of the product at the moment of ordering.
    pub name: String,

    /// Unit price paid.
    pub price: Money,

    /// Ordered units.
    pub quantity: u32,
}

/// Coupon applied to an [`Order`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Code of the coupon.
    pub code: String,

    /// Discount granted by the coupon.
    pub discount_amount: Money,
}

/// Order statistics of a user.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Number of all the placed orders.
    pub total_orders: u64,

    /// Number of the delivered orders.
    pub completed_orders: u64,

    /// Sum of the delivered order totals.
    pub total_spent: Money,
}

impl From<read::order::Stats> for Stats {
    fn from(s: read::order::Stats) -> Self {
        Self {
            total_orders: s.total_orders,
            completed_orders: s.completed_orders,
            total_spent: s.total_spent,
        }
    }
}

/// Request body of [`create()`] and [`create_mine()`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateRequest {
    /// ID of the guest cart to order. Ignored for authenticated users.
    pub cart_id: Option<cart::Id>,

    /// Name of the recipient.
    pub name: Option<String>,

    /// Email of the recipient.
    pub email: Option<String>,

    /// Phone of the recipient.
    pub phone: Option<String>,

    /// Street address.
    pub address: Option<String>,

    /// City.
    pub city: Option<String>,

    /// Postal code.
    pub postal_code: Option<String>,

    /// `COD` or `CARD`, in any case.
    pub payment_method: String,

    /// Card details, required for `CARD` payments.
    pub card: Option<Card>,
}

impl CreateRequest {
    /// Converts this [`CreateRequest`] into a [`command::CreateOrder`] for
    /// the provided cart.
    fn into_command(
        self,
        cart_id: cart::Id,
        user_id: Option<user::Id>,
    ) -> command::CreateOrder {
        let Self {
            cart_id: _,
            name,
            email,
            phone,
            address,
            city,
            postal_code,
            payment_method,
            card,
        } = self;

        command::CreateOrder {
            cart_id,
            user_id,
            contact: order::Contact { name, email, phone },
            address: order::Address {
                street: address,
                city,
                postal_code,
            },
            payment_method,
            card: card.map(Into::into),
        }
    }
}

/// Card details of a [`CreateRequest`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Card {
    /// 16-digit card number.
    #[debug(skip)]
    pub number: String,

    /// Expiry in `MM/YY` format.
    pub expiry: String,

    /// Verification code.
    #[debug(skip)]
    pub cvv: String,
}

impl From<Card> for payment::Card {
    fn from(card: Card) -> Self {
        Self {
            number: SecretString::from(card.number),
            expiry: card.expiry,
            cvv: SecretString::from(card.cvv),
        }
    }
}

/// Request body of [`update_status()`].
#[derive(Clone, Debug, Deserialize)]
pub struct StatusRequest {
    /// New status of the [`Order`].
    pub status: String,
}

/// Places an [`Order`] out of a guest cart.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - missing `cartId`, empty cart or invalid payment;
/// - `NOT_FOUND` - cart doesn't exist;
/// - `OUT_OF_STOCK` - some products lack units, listed in `fields`.
#[tracing::instrument(
    skip_all,
    fields(cart.id = ?req.cart_id, payment_method = %req.payment_method),
)]
pub async fn create(
    ctx: Context,
    WithRejection(Json(req), _): WithRejection<Json<CreateRequest>, Error>,
) -> Result<(http::StatusCode, Data<Order>), Error> {
    let cart_id = req
        .cart_id
        .ok_or_else(|| Error::bad_request(&"cartId is required"))?;

    place(&ctx, req.into_command(cart_id, None)).await
}

/// Places an [`Order`] out of the cart of the authenticated user.
///
/// # Errors
///
/// Same as [`create()`], plus `UNAUTHORIZED`.
#[tracing::instrument(
    skip_all,
    fields(payment_method = %req.payment_method),
)]
pub async fn create_mine(
    ctx: Context,
    WithRejection(Json(req), _): WithRejection<Json<CreateRequest>, Error>,
) -> Result<(http::StatusCode, Data<Order>), Error> {
    let user = ctx.current_user().await?;
    let cart_id = ctx
        .service()
        .execute(command::GetUserCart(user.id))
        .await
        .map_err(AsError::into_error)?
        .cart
        .id;

    place(&ctx, req.into_command(cart_id, Some(user.id))).await
}

/// Returns an [`Order`] by its ID.
///
/// Orders of registered users are visible only to their owners and
/// administrators.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - [`Order`] doesn't exist;
/// - `FORBIDDEN` - [`Order`] belongs to another user.
#[tracing::instrument(skip_all, fields(order.id = %order_id))]
pub async fn get(
    ctx: Context,
    WithRejection(Path(order_id), _): WithRejection<Path<order::Id>, Error>,
) -> Result<Data<Order>, Error> {
    let order = ctx
        .service()
        .execute(query::order::ById::by(order_id))
        .await
        .map_err(AsError::into_error)?;

    visible(&ctx, order).await.map(Data::new)
}

/// Returns an [`Order`] by its number, with or without leading zeroes.
///
/// # Errors
///
/// Same as [`get()`], plus `BAD_REQUEST` for a malformed number.
#[tracing::instrument(skip_all, fields(order.number = %number))]
pub async fn get_by_number(
    ctx: Context,
    WithRejection(Path(number), _): WithRejection<Path<String>, Error>,
) -> Result<Data<Order>, Error> {
    let number = number
        .trim()
        .parse::<order::Number>()
        .map_err(|_| Error::bad_request(&"Invalid order number"))?;

    let order = ctx
        .service()
        .execute(query::order::ByNumber::by(number))
        .await
        .map_err(AsError::into_error)?;

    visible(&ctx, order).await.map(Data::new)
}

/// Lists the [`Order`]s of the authenticated user, newest first.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn mine(ctx: Context) -> Result<Data<Vec<Order>>, Error> {
    let user = ctx.current_user().await?;

    ctx.service()
        .execute(query::order::ByUser::by(user.id))
        .await
        .map(|orders| Data::new(orders.into_iter().map(Into::into).collect()))
        .map_err(AsError::into_error)
}

/// Returns the order [`Stats`] of the authenticated user.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn my_stats(ctx: Context) -> Result<Data<Stats>, Error> {
    let user = ctx.current_user().await?;

    ctx.service()
        .execute(query::order::Stats::by(user.id))
        .await
        .map(|s| Data::new(s.into()))
        .map_err(AsError::into_error)
}

/// Cancels an [`Order`] of the authenticated user.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - request is not authenticated;
/// - `NOT_FOUND` - [`Order`] doesn't exist;
/// - `FORBIDDEN` - [`Order`] belongs to someone else;
/// - `BAD_REQUEST` - [`Order`] is cancelled or delivered already;
/// - `CANCEL_WINDOW_EXPIRED` - [`Order`] was placed too long ago.
#[tracing::instrument(skip_all, fields(order.id = %order_id))]
pub async fn cancel(
    ctx: Context,
    WithRejection(Path(order_id), _): WithRejection<Path<order::Id>, Error>,
) -> Result<Data<Order>, Error> {
    let user = ctx.current_user().await?;

    ctx.service()
        .execute(command::CancelOrder {
            order_id,
            user_id: user.id,
        })
        .await
        .map(|o| Data::new(o.into()).with_message("Order cancelled"))
        .map_err(AsError::into_error)
}

/// Returns any [`Order`] by its ID.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - request is not authenticated;
/// - `FORBIDDEN` - authenticated user is not an administrator;
/// - `NOT_FOUND` - [`Order`] doesn't exist.
#[tracing::instrument(skip_all, fields(order.id = %order_id))]
pub async fn admin_get(
    ctx: Context,
    WithRejection(Path(order_id), _): WithRejection<Path<order::Id>, Error>,
) -> Result<Data<Order>, Error> {
    drop(ctx.admin().await?);

    ctx.service()
        .execute(query::order::ById::by(order_id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| OrderError::NotExists.into())
        .map(|o| Data::new(o.into()))
}

/// Sets any status of an [`Order`].
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - request is not authenticated;
/// - `FORBIDDEN` - authenticated user is not an administrator;
/// - `BAD_REQUEST` - unknown `status`;
/// - `NOT_FOUND` - [`Order`] doesn't exist.
#[tracing::instrument(
    skip_all,
    fields(order.id = %order_id, status = %req.status),
)]
pub async fn update_status(
    ctx: Context,
    WithRejection(Path(order_id), _): WithRejection<Path<order::Id>, Error>,
    WithRejection(Json(req), _): WithRejection<Json<StatusRequest>, Error>,
) -> Result<Data<Order>, Error> {
    drop(ctx.admin().await?);
    let status = req
        .status
        .trim()
        .parse::<order::Status>()
        .map_err(|_| Error::bad_request(&"Invalid status"))?;

    ctx.service()
        .execute(command::UpdateOrderStatus { order_id, status })
        .await
        .map(|o| Data::new(o.into()).with_message("Status updated"))
        .map_err(AsError::into_error)
}

/// Deletes an [`Order`] along with its items.
///
/// # Errors
///
/// Possible error codes:
/// - `UNAUTHORIZED` - request is not authenticated;
/// - `FORBIDDEN` - authenticated user is not an administrator;
/// - `NOT_FOUND` - [`Order`] doesn't exist.
#[tracing::instrument(skip_all, fields(order.id = %order_id))]
pub async fn delete(
    ctx: Context,
    WithRejection(Path(order_id), _): WithRejection<Path<order::Id>, Error>,
) -> Result<Data<order::Id>, Error> {
    drop(ctx.admin().await?);

    ctx.service()
        .execute(command::DeleteOrder(order_id))
        .await
        .map(|()| Data::new(order_id).with_message("Order deleted"))
        .map_err(AsError::into_error)
}

/// Executes the provided [`command::CreateOrder`].
async fn place(
    ctx: &Context,
    cmd: command::CreateOrder,
) -> Result<(http::StatusCode, Data<Order>), Error> {
    let order = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    tracing::info!(
        order.id = %order.id,
        order.number = %order.number,
        "order placed",
    );
    Ok((
        http::StatusCode::CREATED,
        Data::new(order.into()).with_message("Order created"),
    ))
}

/// Checks that the found [`Order`] may be viewed in the provided
/// [`Context`].
async fn visible(
    ctx: &Context,
    order: Option<order::Order>,
) -> Result<Order, Error> {
    let order = order.ok_or(OrderError::NotExists)?;
    let viewer = ctx.try_current_user().await?;
    if !order.is_visible_to(viewer.as_ref()) {
        return Err(OrderError::NotAllowed.into());
    }
    Ok(order.into())
}

define_error! {
    enum OrderError {
        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Order not found"]
        NotExists,

        #[code = "FORBIDDEN"]
        #[status = FORBIDDEN]
        #[message = "Not allowed"]
        NotAllowed,

        #[code = "BAD_REQUEST"]
        #[status = BAD_REQUEST]
        #[message = "Cart is empty"]
        EmptyCart,

        #[code = "CONFLICT"]
        #[status = CONFLICT]
        #[message = "Cart has changed during checkout"]
        CartChanged,

        #[code = "BAD_REQUEST"]
        #[status = BAD_REQUEST]
        #[message = "Order already cancelled"]
        AlreadyCancelled,

        #[code = "BAD_REQUEST"]
        #[status = BAD_REQUEST]
        #[message = "Delivered orders cannot be cancelled"]
        AlreadyDelivered,

        #[code = "CANCEL_WINDOW_EXPIRED"]
        #[status = BAD_REQUEST]
        #[message = "Order cancellation window has expired"]
        CancelWindowExpired,
    }
}

impl AsError for create_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Reserve(e) => e.try_as_error(),
            Self::CartNotExists(_) => {
                Some(Error::not_found(&"Cart not found"))
            }
            Self::EmptyCart(_) => Some(OrderError::EmptyCart.into()),
            Self::CartChanged(_) => Some(OrderError::CartChanged.into()),
            Self::InvalidPayment(e) => Some(Error::bad_request(e)),
            Self::ProductNotExists(_) => None,
        }
    }
}

impl AsError for cancel_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::OrderNotExists(_) => Some(OrderError::NotExists.into()),
            Self::NotCancellable(e) => Some(match e {
                CancellationError::NotOwner => OrderError::NotAllowed.into(),
                CancellationError::Final(order::Status::Delivered) => {
                    OrderError::AlreadyDelivered.into()
                }
                CancellationError::Final(_) => {
                    OrderError::AlreadyCancelled.into()
                }
                CancellationError::WindowExpired => {
                    OrderError::CancelWindowExpired.into()
                }
            }),
        }
    }
}

impl AsError for update_order_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::OrderNotExists(_) => Some(OrderError::NotExists.into()),
        }
    }
}

impl AsError for delete_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::OrderNotExists(_) => Some(OrderError::NotExists.into()),
        }
    }
}
