//! Domain definitions.

pub mod cart;
pub mod category;
pub mod coupon;
pub mod order;
pub mod product;
pub mod user;

pub use self::{
    cart::Cart, coupon::Coupon, order::Order, product::Product, user::User,
};
