//! [`Command`] definition.

pub mod add_cart_item;
pub mod apply_coupon;
pub mod authorize_user_session;
pub mod cancel_order;
pub mod clear_cart;
pub mod create_guest_cart;
pub mod create_order;
pub mod delete_order;
pub mod get_user_cart;
pub mod merge_carts;
pub mod recompute_cart;
pub mod redeem_coupon;
pub mod release_stock;
pub mod remove_cart_item;
pub mod remove_coupon;
pub mod reserve_cart_stock;
pub mod sync_cart_summary;
pub mod update_cart_item;
pub mod update_order_status;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    add_cart_item::AddCartItem, apply_coupon::ApplyCoupon,
    authorize_user_session::AuthorizeUserSession, cancel_order::CancelOrder,
    clear_cart::ClearCart, create_guest_cart::CreateGuestCart,
    create_order::CreateOrder, delete_order::DeleteOrder,
    get_user_cart::GetUserCart, merge_carts::MergeCarts,
    recompute_cart::RecomputeCart, redeem_coupon::RedeemCoupon,
    release_stock::ReleaseStock, remove_cart_item::RemoveCartItem,
    remove_coupon::RemoveCoupon, reserve_cart_stock::ReserveCartStock,
    sync_cart_summary::SyncCartSummary, update_cart_item::UpdateCartItem,
    update_order_status::UpdateOrderStatus,
};
