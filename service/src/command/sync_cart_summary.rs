//! [`Command`] for storing the summary of a [`Cart`] computed by a client.

use common::{
    operations::{By, Select, Update},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        cart::{self, pricing::Line, Contents, Pricing},
        coupon::{self, Rejection},
        Cart, Coupon,
    },
    infra::{database, Database},
    query,
    read::cart::{Source, View},
    Query, Service,
};

use super::{recompute_cart, Command, RecomputeCart};

/// [`Command`] for storing the [`cart::Snapshot`] figures and the
/// [`Coupon`] supplied by a client.
///
/// Supplied figures are trusted and stored as is, while the missing ones
/// keep their current values. The resulting [`View`] is labelled with
/// [`Source::Client`].
///
/// If nothing is supplied at all, the [`Cart`] is recomputed on the server
/// side instead, as [`RecomputeCart`] does.
#[derive(Clone, Debug)]
pub struct SyncCartSummary {
    /// ID of the [`Cart`] to sync.
    pub cart_id: cart::Id,

    /// Raw [`coupon::Code`] to apply. A blank one removes the [`Coupon`].
    pub coupon_code: Option<String>,

    /// Subtotal computed by the client.
    pub subtotal: Option<Money>,

    /// Discount computed by the client.
    pub discount: Option<Money>,

    /// Total computed by the client.
    pub total: Option<Money>,
}

impl SyncCartSummary {
    /// Indicates whether this [`SyncCartSummary`] supplies nothing.
    fn is_empty(&self) -> bool {
        self.coupon_code.is_none()
            && self.subtotal.is_none()
            && self.discount.is_none()
            && self.total.is_none()
    }
}

impl<Db> Command<SyncCartSummary> for Service<Db>
where
    Db: Database<
            Select<By<Option<Cart>, cart::Id>>,
            Ok = Option<Cart>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Coupon>, coupon::Code>>,
            Ok = Option<Coupon>,
            Err = Traced<database::Error>,
        > + Database<Update<Cart>, Err = Traced<database::Error>>,
    Self: Query<
            query::cart::Lines,
            Ok = Vec<Line>,
            Err = Traced<database::Error>,
        > + Command<
            RecomputeCart,
            Ok = View,
            Err = Traced<recompute_cart::ExecutionError>,
        >,
{
    type Ok = View;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SyncCartSummary,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        if cmd.is_empty() {
            return self
                .execute(RecomputeCart(cmd.cart_id))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E));
        }

        let SyncCartSummary {
            cart_id,
            coupon_code,
            subtotal,
            discount,
            total,
        } = cmd;

        if let Some(negative) = [subtotal, discount, total]
            .into_iter()
            .flatten()
            .find(|m| *m < Money::ZERO)
        {
            return Err(tracerr::new!(E::NegativeAmount(negative)));
        }

        let mut cart = self
            .database()
            .execute(Select(By::<Option<Cart>, _>::new(cart_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CartNotExists(cart_id))
            .map_err(tracerr::wrap!())?;

        let lines = self
            .execute(query::cart::Lines(cart.id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        if let Some(raw) = coupon_code {
            cart.coupon_code = if raw.trim().is_empty() {
                None
            } else {
                let coupon = match coupon::Code::new(&raw) {
                    Some(code) => self
                        .database()
                        .execute(Select(By::new(code)))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))?,
                    None => None,
                }
                .ok_or_else(|| E::CouponNotExists(raw.trim().to_owned()))
                .map_err(tracerr::wrap!())?;

                let contents =
                    lines.iter().map(|l| &l.product).collect::<Contents>();
                _ = coupon
                    .validate(&contents, cart.user_id, DateTime::now().coerce())
                    .map_err(E::NotApplicable)
                    .map_err(tracerr::wrap!())?;
                Some(coupon.code)
            };
        }
        if let Some(subtotal) = subtotal {
            cart.snapshot.subtotal = subtotal;
        }
        if let Some(discount) = discount {
            cart.snapshot.discount = discount;
        }
        if let Some(total) = total {
            cart.snapshot.total = total;
        }
        cart.touch();

        self.database()
            .execute(Update(cart.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let pricing =
            Pricing::trusted(lines, cart.coupon_code.clone(), cart.snapshot);
        Ok(View::new(cart, pricing, Source::Client))
    }
}

/// Error of [`SyncCartSummary`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to recompute the [`Cart`].
    #[display("Failed to recompute `Cart`: {_0}")]
    Recompute(recompute_cart::ExecutionError),

    /// [`Cart`] with the provided ID does not exist.
    #[display("`Cart(id: {_0})` does not exist")]
    #[from(ignore)]
    CartNotExists(#[error(not(source))] cart::Id),

    /// [`Coupon`] with the provided code does not exist.
    #[display("`Coupon(code: {_0})` does not exist")]
    #[from(ignore)]
    CouponNotExists(#[error(not(source))] String),

    /// [`Coupon`] cannot be applied to the [`Cart`].
    #[display("`Coupon` is not applicable: {_0}")]
    #[from(ignore)]
    NotApplicable(#[error(not(source))] Rejection),

    /// Supplied amount is negative.
    #[display("Amount `{_0}` is negative")]
    #[from(ignore)]
    NegativeAmount(#[error(not(source))] Money),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::coupon::{Assignment, Rejection, Target},
        read::cart::Source,
        testing::{self, fixed, money},
        Command as _,
    };

    use super::{ExecutionError, SyncCartSummary};

    fn sync(cart_id: crate::domain::cart::Id) -> SyncCartSummary {
        SyncCartSummary {
            cart_id,
            coupon_code: None,
            subtotal: None,
            discount: None,
            total: None,
        }
    }

    #[tokio::test]
    async fn stores_client_figures_verbatim() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "100.00", 5);
        _ = testing::coupon(db, "SAVE15", fixed("15"), |_| {});
        let cart = testing::cart(db, None, &[(&p, 2)]);

        let view = service
            .execute(SyncCartSummary {
                coupon_code: Some("save15".into()),
                subtotal: Some(money("200.00")),
                discount: Some(money("15.004")),
                total: Some(money("1.00")),
                ..sync(cart.id)
            })
            .await
            .unwrap();

        assert_eq!(view.source, Source::Client);
        assert_eq!(view.cart.snapshot.discount, money("15.00"));
        assert_eq!(view.cart.snapshot.total, money("1.00"));
        assert_eq!(
            view.cart.coupon_code.as_ref().map(AsRef::<str>::as_ref),
            Some("SAVE15"),
        );
        assert_eq!(
            db.read(|s| s.carts[&cart.id].snapshot),
            view.cart.snapshot,
        );
    }

    #[tokio::test]
    async fn keeps_figures_not_supplied() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "10.00", 5);
        let mut cart = testing::cart(db, None, &[(&p, 1)]);
        cart.snapshot.subtotal = money("10.00");
        cart.snapshot.total = money("10.00");
        db.modify(|s| {
            _ = s.carts.insert(cart.id, cart.clone());
        });

        let view = service
            .execute(SyncCartSummary {
                total: Some(money("7.50")),
                ..sync(cart.id)
            })
            .await
            .unwrap();

        assert_eq!(view.cart.snapshot.subtotal, money("10.00"));
        assert_eq!(view.cart.snapshot.total, money("7.50"));
    }

    #[tokio::test]
    async fn blank_code_clears_coupon() {
        let service = testing::service();
        let db = service.database();
        let c = testing::coupon(db, "FIVE", fixed("5"), |_| {});
        let mut cart = testing::cart(db, None, &[]);
        cart.coupon_code = Some(c.code);
        db.modify(|s| {
            _ = s.carts.insert(cart.id, cart.clone());
        });

        let view = service
            .execute(SyncCartSummary {
                coupon_code: Some("   ".into()),
                ..sync(cart.id)
            })
            .await
            .unwrap();

        assert_eq!(view.source, Source::Client);
        assert_eq!(view.cart.coupon_code, None);
    }

    #[tokio::test]
    async fn recomputes_when_nothing_supplied() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "3.00", 5);
        let cart = testing::cart(db, None, &[(&p, 2)]);

        let view = service.execute(sync(cart.id)).await.unwrap();

        assert_eq!(view.source, Source::Server);
        assert_eq!(view.cart.snapshot.total, money("6.00"));
    }

    #[tokio::test]
    async fn validates_coupon() {
        let service = testing::service();
        let db = service.database();
        let p = testing::product(db, "3.00", 5);
        _ = testing::coupon(db, "CAT", fixed("1"), |c| {
            c.assignments =
                vec![Assignment::category(Target::Id("shoes".into()))];
        });
        let cart = testing::cart(db, None, &[(&p, 1)]);

        let err = service
            .execute(SyncCartSummary {
                coupon_code: Some("CAT".into()),
                ..sync(cart.id)
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::NotApplicable(Rejection::NotApplicable),
        ));

        let err = service
            .execute(SyncCartSummary {
                coupon_code: Some("MISSING".into()),
                ..sync(cart.id)
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ExecutionError::CouponNotExists(code) if code == "MISSING",
        ));
    }

    #[tokio::test]
    async fn rejects_negative_amounts() {
        let service = testing::service();
        let db = service.database();
        let cart = testing::cart(db, None, &[]);

        let err = service
            .execute(SyncCartSummary {
                discount: Some(money("-1.00")),
                ..sync(cart.id)
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            ExecutionError::NegativeAmount(_),
        ));
    }
}
