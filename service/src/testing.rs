//! Fixtures shared by the tests.

use std::str::FromStr as _;

use common::{DateTime, Money};
use rust_decimal::Decimal;

use crate::{
    domain::{
        cart::{self, Quantity},
        coupon::{self, discount, Discount},
        order, product, user, Cart, Coupon, Order, Product, User,
    },
    infra::Memory,
    Config, Service,
};

/// Secret the [`Session`] tokens are signed with in the tests.
///
/// [`Session`]: crate::domain::user::Session
pub(crate) const SECRET: &[u8] = b"storefront-test-secret";

/// Creates a new [`Service`] over an empty [`Memory`] database.
pub(crate) fn service() -> Service<Memory> {
    Service::new(
        Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(SECRET),
            order_cancellation_window:
                Config::DEFAULT_ORDER_CANCELLATION_WINDOW,
        },
        Memory::new(),
    )
}

pub(crate) fn money(s: &str) -> Money {
    Money::from_str(s).unwrap()
}

pub(crate) fn fixed(s: &str) -> Discount {
    Discount::new(discount::Kind::Fixed, Decimal::from_str(s).unwrap())
        .unwrap()
}

pub(crate) fn percent(s: &str) -> Discount {
    Discount::new(discount::Kind::Percent, Decimal::from_str(s).unwrap())
        .unwrap()
}

/// Stores a new [`Product`] with the provided price and stock.
pub(crate) fn product(db: &Memory, price: &str, stock: u32) -> Product {
    let p = Product {
        id: product::Id::new(),
        name: product::Name::new("Desk lamp").unwrap(),
        price: money(price),
        discounted_price: None,
        stock,
        category_id: None,
    };
    db.modify(|s| {
        _ = s.products.insert(p.id, p.clone());
    });
    p
}

/// Returns the current stock of the [`Product`] with the provided ID.
pub(crate) fn stock(db: &Memory, id: product::Id) -> u32 {
    db.read(|s| s.products[&id].stock)
}

/// Stores a new active [`Coupon`] adjusted by the provided function.
pub(crate) fn coupon(
    db: &Memory,
    code: &str,
    discount: Discount,
    adjust: impl FnOnce(&mut Coupon),
) -> Coupon {
    let mut c = Coupon {
        id: coupon::Id::new(),
        code: coupon::Code::new(code).unwrap(),
        discount,
        expires_at: None,
        max_uses: None,
        used_count: 0,
        is_active: true,
        assignments: vec![],
    };
    adjust(&mut c);
    db.modify(|s| {
        _ = s.coupons.insert(c.id, c.clone());
    });
    c
}

/// Stores a new [`User`] with the provided [`user::Role`].
pub(crate) fn user(db: &Memory, role: user::Role) -> User {
    let u = User {
        id: user::Id::new(),
        role,
    };
    db.modify(|s| {
        _ = s.users.insert(u.id, u);
    });
    u
}

/// Stores a new [`Cart`] holding the provided quantities of [`Product`]s.
pub(crate) fn cart(
    db: &Memory,
    user_id: Option<user::Id>,
    items: &[(&Product, u32)],
) -> Cart {
    let c = Cart::new(user_id);
    db.modify(|s| {
        _ = s.carts.insert(c.id, c.clone());
        s.cart_items.extend(items.iter().map(|(p, q)| {
            cart::Item::new(c.id, p.id, Quantity::new(*q).unwrap())
        }));
    });
    c
}

/// Returns `(product, quantity)` pairs of the [`Cart`] with the provided
/// ID in their order.
pub(crate) fn items(
    db: &Memory,
    cart_id: cart::Id,
) -> Vec<(product::Id, u32)> {
    db.read(|s| {
        s.items_of(cart_id)
            .map(|i| (i.product_id, i.quantity.get()))
            .collect()
    })
}

/// Stores a new pending [`Order`] of the provided [`Product`]s.
pub(crate) fn order(
    db: &Memory,
    user_id: Option<user::Id>,
    items: &[(&Product, Quantity)],
) -> Order {
    let o = Order {
        id: order::Id::new(),
        number: db.modify(|s| {
            s.last_order_number += 1;
            s.last_order_number.into()
        }),
        user_id,
        status: order::Status::Pending,
        payment_method: order::PaymentMethod::Cod,
        contact: order::Contact::default(),
        shipping_address: order::ShippingAddress::new(
            &order::Contact::default(),
            &order::Address::default(),
        ),
        snapshot: cart::Snapshot::default(),
        coupon_code: None,
        items: items
            .iter()
            .map(|(p, quantity)| order::Item {
                product_id: p.id,
                name: p.name.clone(),
                price: p.effective_price(),
                quantity: *quantity,
            })
            .collect(),
        created_at: DateTime::now().coerce(),
    };
    db.modify(|s| {
        _ = s.orders.insert(o.id, o.clone());
    });
    o
}
