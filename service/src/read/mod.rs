//! Read entities definitions.

pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;
