//! Coupon-related REST API definitions.

use axum::{extract::Path, Json};
use axum_extra::extract::{Query, WithRejection};
use common::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, redeem_coupon},
    domain::{cart, category, coupon, product, user},
    query, read, Command as _,
};

use crate::{api::Data, define_error, AsError, Context, Error};

/// Outcome of validating a coupon against a selection.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    /// Code of the coupon as stored.
    pub code: String,

    /// Indicator whether the coupon applies.
    pub valid: bool,

    /// Reason of the coupon not applying, if any.
    pub reason: Option<String>,

    /// `PERCENT` or `FIXED`.
    pub discount_type: String,

    /// Percentage or fixed amount of the discount.
    pub discount: Decimal,

    /// Discount granted for the provided subtotal.
    pub discount_amount: Money,

    /// `GLOBAL`, `CUSTOMER`, `PRODUCT` or `CATEGORY` if the coupon
    /// applies, otherwise `NONE`.
    pub applied_scope: String,

    /// RFC 3339 moment the coupon expires at, if ever.
    pub expiry_date: Option<String>,

    /// Maximum number of redemptions, if limited.
    pub max_uses: Option<u32>,

    /// Number of redemptions so far.
    pub used_count: u32,
}

impl From<read::coupon::Validation> for Validation {
    fn from(v: read::coupon::Validation) -> Self {
        let read::coupon::Validation {
            coupon,
            verdict,
            discount_amount,
        } = v;

        Self {
            code: coupon.code.to_string(),
            valid: verdict.is_ok(),
            reason: verdict.err().map(|r| r.to_string()),
            discount_type: coupon.discount.kind().to_string(),
            discount: coupon.discount.value(),
            discount_amount,
            applied_scope: verdict
                .map_or_else(|_| "NONE".to_owned(), |s| s.to_string()),
            expiry_date: coupon.expires_at.map(|d| d.to_rfc3339()),
            max_uses: coupon.max_uses,
            used_count: coupon.used_count,
        }
    }
}

/// Query parameters of [`validate()`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidateParams {
    /// ID of the customer to validate the coupon for.
    pub customer_id: Option<user::Id>,

    /// IDs of the selected products.
    pub product_ids: Vec<product::Id>,

    /// IDs of the categories of the selected products.
    pub category_ids: Vec<category::Id>,

    /// Subtotal to calculate the discount amount of.
    pub subtotal: Option<Money>,
}

/// Request body of [`redeem()`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RedeemRequest {
    /// ID of the customer redeeming the coupon.
    ///
    /// Defaults to the authenticated user, if any.
    pub customer_id: Option<user::Id>,

    /// IDs of the products the coupon is redeemed for.
    pub product_ids: Vec<product::Id>,

    /// IDs of the categories of those products.
    pub category_ids: Vec<category::Id>,
}

/// Result of [`redeem()`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    /// Code of the redeemed coupon.
    pub code: String,

    /// Number of redemptions including this one.
    pub used_count: u32,
}

/// Checks whether a coupon applies to a selection, without redeeming it.
///
/// # Errors
///
/// Possible error codes:
/// - `BAD_REQUEST` - malformed parameters or negative `subtotal`;
/// - `NOT_FOUND` - coupon doesn't exist.
#[tracing::instrument(skip_all, fields(code = %code))]
pub async fn validate(
    ctx: Context,
    WithRejection(Path(code), _): WithRejection<Path<String>, Error>,
    WithRejection(Query(params), _): WithRejection<
        Query<ValidateParams>,
        Error,
    >,
) -> Result<Data<Validation>, Error> {
    let ValidateParams {
        customer_id,
        product_ids,
        category_ids,
        subtotal,
    } = params;
    if subtotal.is_some_and(|s| s < Money::ZERO) {
        return Err(Error::bad_request(&"Subtotal must not be negative"));
    }
    let code = coupon::Code::new(&code).ok_or(CouponError::NotExists)?;

    ctx.service()
        .execute(query::ValidateCoupon {
            code,
            customer_id,
            contents: cart::Contents::new(product_ids, category_ids),
            subtotal,
        })
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| CouponError::NotExists.into())
        .map(|v| Data::new(v.into()))
}

/// Redeems a coupon once, never exceeding its usage limit.
///
/// # Errors
///
/// Possible error codes:
/// - `NOT_FOUND` - coupon doesn't exist;
/// - `COUPON_NOT_APPLICABLE` - coupon doesn't apply to the selection;
/// - `COUPON_USAGE_LIMIT_REACHED` - coupon has no redemptions left.
#[tracing::instrument(skip_all, fields(code = %code))]
pub async fn redeem(
    ctx: Context,
    WithRejection(Path(code), _): WithRejection<Path<String>, Error>,
    WithRejection(Json(req), _): WithRejection<Json<RedeemRequest>, Error>,
) -> Result<Data<Redemption>, Error> {
    let RedeemRequest {
        customer_id,
        product_ids,
        category_ids,
    } = req;
    let customer_id = match customer_id {
        Some(id) => Some(id),
        None => ctx.try_current_user().await?.map(|u| u.id),
    };
    let code = coupon::Code::new(&code).ok_or(CouponError::NotExists)?;

    let used_count = ctx
        .service()
        .execute(command::RedeemCoupon {
            code: code.clone(),
            customer_id,
            contents: cart::Contents::new(product_ids, category_ids),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Data::new(Redemption {
        code: code.to_string(),
        used_count: used_count.into(),
    })
    .with_message("Coupon redeemed"))
}

define_error! {
    enum CouponError {
        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Coupon not found"]
        NotExists,

        #[code = "COUPON_USAGE_LIMIT_REACHED"]
        #[status = BAD_REQUEST]
        #[message = "Coupon usage limit reached"]
        UsageLimitReached,
    }
}

impl AsError for redeem_coupon::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CouponNotExists(_) => Some(CouponError::NotExists.into()),
            Self::Rejected(r) => Some(super::cart::not_applicable(*r)),
            Self::UsageLimitReached(_) => {
                Some(CouponError::UsageLimitReached.into())
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::redeem_coupon::ExecutionError,
        domain::coupon::{self, Rejection},
    };

    use crate::AsError as _;

    use super::ValidateParams;

    #[test]
    fn maps_redemption_errors() {
        let code = coupon::Code::new("SAVE").unwrap();

        let err = ExecutionError::Rejected(Rejection::Expired).into_error();
        assert_eq!(err.code, "COUPON_NOT_APPLICABLE");
        assert_eq!(err.message, "Coupon expired");

        let err = ExecutionError::UsageLimitReached(code).into_error();
        assert_eq!(err.code, "COUPON_USAGE_LIMIT_REACHED");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parses_repeated_ids() {
        let (a, b) = (
            "6f1c5a3e-8a44-4b6f-9a52-1f0e2d3c4b5a",
            "0b7d9e2c-3f1a-4c8e-b6d5-7a9e1c2f3d4b",
        );

        let params: ValidateParams = serde_html_form::from_str(&format!(
            "productIds={a}&productIds={b}&subtotal=80",
        ))
        .unwrap();

        assert_eq!(params.product_ids.len(), 2);
        assert!(params.category_ids.is_empty());
        assert_eq!(params.subtotal.unwrap().to_string(), "80.00");
    }
}
