//! [`Pricing`] of a [`Cart`].
//!
//! [`Cart`]: super::Cart

use std::collections::HashMap;

use common::{DateTime, Money};

use crate::domain::{coupon, product, user, Coupon, Product};

use super::{Contents, Item, Quantity, Snapshot};

/// Priced line of a [`Cart`].
///
/// [`Cart`]: super::Cart
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Line {
    /// Live [`Product`] of this [`Line`].
    pub product: Product,

    /// [`Quantity`] of the [`Product`] units.
    pub quantity: Quantity,

    /// Effective unit price multiplied by the [`Quantity`].
    pub total: Money,
}

impl Line {
    /// Prices the provided [`Item`]s against the live [`Product`]s.
    ///
    /// [`Item`]s whose [`Product`] doesn't exist anymore are dropped.
    pub fn collect<'i>(
        items: impl IntoIterator<Item = &'i Item>,
        products: &HashMap<product::Id, Product>,
    ) -> Vec<Self> {
        items
            .into_iter()
            .filter_map(|item| {
                let product = products.get(&item.product_id)?;
                Some(Self {
                    total: product.effective_price().times(item.quantity.get()),
                    product: product.clone(),
                    quantity: item.quantity,
                })
            })
            .collect()
    }
}

/// Prices of a [`Cart`] contents along with the [`Coupon`] applied to them.
///
/// [`Cart`]: super::Cart
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pricing {
    /// Priced [`Line`]s.
    pub lines: Vec<Line>,

    /// Total number of [`Product`] units in all the [`Line`]s.
    pub total_quantity: u32,

    /// [`coupon::Code`] that stays applied, if any.
    pub coupon_code: Option<coupon::Code>,

    /// Monetary [`Snapshot`].
    pub snapshot: Snapshot,
}

impl Pricing {
    /// Computes the [`Pricing`] on the server side.
    ///
    /// The provided [`Coupon`] is the one currently applied to the [`Cart`].
    /// If it's not applicable anymore, it's dropped and nothing is
    /// discounted.
    ///
    /// [`Cart`]: super::Cart
    #[must_use]
    pub fn compute(
        lines: Vec<Line>,
        coupon: Option<&Coupon>,
        customer_id: Option<user::Id>,
        now: DateTime,
    ) -> Self {
        let subtotal = lines.iter().map(|l| l.total).sum();
        let contents = lines.iter().map(|l| &l.product).collect::<Contents>();

        let coupon = coupon
            .filter(|c| c.is_applicable(&contents, customer_id, now.coerce()));
        let discount = coupon.map_or(Money::ZERO, |c| {
            c.discount_for(lines.iter().map(|l| (&l.product, l.total)))
        });

        Self {
            total_quantity: total_quantity(&lines),
            coupon_code: coupon.map(|c| c.code.clone()),
            snapshot: Snapshot::new(subtotal, discount),
            lines,
        }
    }

    /// Builds the [`Pricing`] out of the figures supplied by a client.
    ///
    /// The [`Snapshot`] is trusted as is and is not checked against the
    /// [`Line`]s. Applicability of the `coupon_code` must be checked
    /// beforehand.
    #[must_use]
    pub fn trusted(
        lines: Vec<Line>,
        coupon_code: Option<coupon::Code>,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            total_quantity: total_quantity(&lines),
            coupon_code,
            snapshot,
            lines,
        }
    }
}

/// Sums up the [`Quantity`] of all the provided [`Line`]s.
fn total_quantity(lines: &[Line]) -> u32 {
    lines
        .iter()
        .map(|l| l.quantity.get())
        .fold(0, u32::saturating_add)
}

#[cfg(test)]
mod spec {
    use std::{collections::HashMap, str::FromStr as _};

    use common::{DateTime, Money};

    use crate::domain::{
        cart::{self, Cart, Item, Quantity},
        coupon::{self, Assignment, Discount, Target},
        product, Coupon, Product,
    };

    use super::{Line, Pricing};

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn product(price: &str) -> Product {
        Product {
            id: product::Id::new(),
            name: product::Name::new("Kettle").unwrap(),
            price: money(price),
            discounted_price: None,
            stock: 10,
            category_id: None,
        }
    }

    fn coupon(discount: Discount) -> Coupon {
        Coupon {
            id: coupon::Id::new(),
            code: coupon::Code::new("SAVE").unwrap(),
            discount,
            expires_at: None,
            max_uses: None,
            used_count: 0,
            is_active: true,
            assignments: vec![],
        }
    }

    fn lines(cart: &Cart, stock: &[(&Product, u32)]) -> Vec<Line> {
        let items = stock
            .iter()
            .map(|(p, q)| Item::new(cart.id, p.id, Quantity::new(*q).unwrap()))
            .collect::<Vec<_>>();
        let products = stock
            .iter()
            .map(|(p, _)| (p.id, (*p).clone()))
            .collect::<HashMap<_, _>>();
        Line::collect(&items, &products)
    }

    #[test]
    fn fixed_coupon_scenario() {
        let cart = Cart::new(None);
        let p = product("100.00");
        let c = coupon(Discount::Fixed(money("15.00")));

        let pricing = Pricing::compute(
            lines(&cart, &[(&p, 2)]),
            Some(&c),
            None,
            DateTime::now(),
        );

        assert_eq!(pricing.total_quantity, 2);
        assert_eq!(pricing.snapshot.subtotal.to_string(), "200.00");
        assert_eq!(pricing.snapshot.discount.to_string(), "15.00");
        assert_eq!(pricing.snapshot.total.to_string(), "185.00");
        assert_eq!(pricing.coupon_code, Some(c.code));
    }

    #[test]
    fn drops_lines_of_missing_products() {
        let cart = Cart::new(None);
        let (kept, gone) = (product("3.00"), product("5.00"));
        let items = [
            Item::new(cart.id, kept.id, Quantity::ONE),
            Item::new(cart.id, gone.id, Quantity::ONE),
        ];
        let products = HashMap::from([(kept.id, kept.clone())]);

        let pricing = Pricing::compute(
            Line::collect(&items, &products),
            None,
            None,
            DateTime::now(),
        );

        assert_eq!(pricing.lines.len(), 1);
        assert_eq!(pricing.snapshot.total, money("3.00"));
    }

    #[test]
    fn total_is_never_negative() {
        let cart = Cart::new(None);
        let p = product("4.00");
        let c = coupon(Discount::Fixed(money("50.00")));

        let pricing = Pricing::compute(
            lines(&cart, &[(&p, 1)]),
            Some(&c),
            None,
            DateTime::now(),
        );

        assert_eq!(pricing.snapshot.discount, money("4.00"));
        assert_eq!(pricing.snapshot.total, Money::ZERO);
    }

    #[test]
    fn drops_coupon_once_not_applicable() {
        let mut cart = Cart::new(None);
        let (a, b) = (product("10.00"), product("20.00"));
        let mut c = coupon(Discount::Percent("10".parse().unwrap()));
        c.assignments = vec![Assignment::product(Target::Id(a.id.to_string()))];

        let with_a = Pricing::compute(
            lines(&cart, &[(&a, 1), (&b, 1)]),
            Some(&c),
            None,
            DateTime::now(),
        );
        assert!(cart.apply(&with_a));
        assert_eq!(cart.snapshot.discount, money("1.00"));
        assert_eq!(cart.coupon_code.as_ref(), Some(&c.code));

        let without_a = Pricing::compute(
            lines(&cart, &[(&b, 1)]),
            Some(&c),
            None,
            DateTime::now(),
        );
        assert!(cart.apply(&without_a));
        assert_eq!(cart.coupon_code, None);
        assert_eq!(cart.snapshot.discount, Money::ZERO);
        assert_eq!(cart.snapshot.total, money("20.00"));
    }

    #[test]
    fn applying_same_pricing_twice_changes_nothing() {
        let mut cart = Cart::new(None);
        let p = product("7.25");
        let pricing = Pricing::compute(
            lines(&cart, &[(&p, 3)]),
            None,
            None,
            DateTime::now(),
        );

        assert!(cart.apply(&pricing));
        let updated_at = cart.updated_at;
        assert!(!cart.apply(&pricing));
        assert_eq!(cart.updated_at, updated_at);
    }

    #[test]
    fn trusts_client_figures() {
        let cart = Cart::new(None);
        let p = product("10.00");
        let snapshot = cart::Snapshot {
            subtotal: money("1.00"),
            discount: money("0.50"),
            total: money("0.50"),
        };

        let pricing =
            Pricing::trusted(lines(&cart, &[(&p, 2)]), None, snapshot);

        assert_eq!(pricing.snapshot, snapshot);
        assert_eq!(pricing.total_quantity, 2);
    }
}
