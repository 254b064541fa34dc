//! [`Payment`] definitions.
//!
//! Card details are checked for their format only, and are never stored.

use std::sync::LazyLock;

use common::{define_kind, DateTime};
use derive_more::{Display, Error};
use regex::Regex;
use secrecy::{ExposeSecret as _, SecretString};

#[cfg(doc)]
use crate::domain::Order;

/// Payment of an [`Order`].
#[derive(Debug)]
pub enum Payment {
    /// Cash on delivery.
    Cod,

    /// Bank [`Card`] payment.
    Card(Card),
}

impl Payment {
    /// Parses a [`Payment`] out of the provided [`Method`] name and
    /// [`Card`] details, checking the latter against the provided moment.
    ///
    /// [`Card`] details are ignored for any other [`Method`] than
    /// [`Method::Card`].
    ///
    /// # Errors
    ///
    /// See [`ParseError`] for details.
    pub fn new(
        method: &str,
        card: Option<Card>,
        now: DateTime,
    ) -> Result<Self, ParseError> {
        use ParseError as E;

        match method.trim().parse::<Method>().map_err(|_| E::InvalidMethod)? {
            Method::Cod => Ok(Self::Cod),
            Method::Card => {
                let card = card.ok_or(E::CardRequired)?;
                card.check(now)?;
                Ok(Self::Card(card))
            }
        }
    }

    /// Returns the [`Method`] of this [`Payment`].
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::Cod => Method::Cod,
            Self::Card(_) => Method::Card,
        }
    }
}

/// Bank card details as entered by a customer.
#[derive(Debug)]
pub struct Card {
    /// Card number, possibly with whitespace between digit groups.
    pub number: SecretString,

    /// Expiry in `MM/YY` format.
    pub expiry: String,

    /// Verification code, accepted as is.
    pub cvv: SecretString,
}

impl Card {
    /// Checks this [`Card`] number and expiry.
    ///
    /// The expiry month must be strictly after the month of the provided
    /// moment.
    ///
    /// # Errors
    ///
    /// See [`ParseError`] for details.
    pub fn check(&self, now: DateTime) -> Result<(), ParseError> {
        use ParseError as E;

        /// Regular expression checking the expiry format.
        static EXPIRY: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(0[1-9]|1[0-2])/(\d{2})$").expect("valid regex")
        });

        let number = self
            .number
            .expose_secret()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>();
        if number.len() != 16 || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(E::InvalidNumber);
        }

        let caps = EXPIRY
            .captures(self.expiry.trim())
            .ok_or(E::InvalidExpiry)?;
        let month = caps[1].parse::<u8>().map_err(|_| E::InvalidExpiry)?;
        let year = 2000 + caps[2].parse::<i32>().map_err(|_| E::InvalidExpiry)?;
        if (year, month) <= (now.year(), now.month()) {
            return Err(E::Expired);
        }

        Ok(())
    }
}

define_kind! {
    #[doc = "Method of a [`Payment`]."]
    enum Method {
        #[doc = "Cash on delivery."]
        Cod = 1,

        #[doc = "Bank card."]
        Card = 2,
    }
}

/// Error of parsing a [`Payment`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum ParseError {
    /// Unknown [`Method`].
    #[display("Invalid paymentMethod")]
    InvalidMethod,

    /// [`Card`] details are missing.
    #[display("Card details required")]
    CardRequired,

    /// [`Card`] number is not 16 digits.
    #[display("Card number must be 16 digits")]
    InvalidNumber,

    /// [`Card`] expiry is not in `MM/YY` format.
    #[display("Expiry must be MM/YY")]
    InvalidExpiry,

    /// [`Card`] is expired already.
    #[display("Card expiry must be in the future")]
    Expired,
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{Card, Method, ParseError, Payment};

    fn card(number: &str, expiry: &str) -> Card {
        Card {
            number: number.to_owned().into(),
            expiry: expiry.into(),
            cvv: String::from("123").into(),
        }
    }

    fn may_2024() -> DateTime {
        DateTime::from_rfc3339("2024-05-15T12:00:00Z").unwrap()
    }

    #[test]
    fn parses_method_ignoring_case() {
        let p = Payment::new(" cod ", None, may_2024()).unwrap();
        assert_eq!(p.method(), Method::Cod);

        assert_eq!(
            Payment::new("cash", None, may_2024()).unwrap_err(),
            ParseError::InvalidMethod,
        );
        assert_eq!(
            Payment::new("CARD", None, may_2024()).unwrap_err(),
            ParseError::CardRequired,
        );
    }

    #[test]
    fn card_number_is_16_digits() {
        let now = may_2024();

        assert_eq!(card("4242 4242 4242 4242", "06/24").check(now), Ok(()));
        assert_eq!(
            card("4242 4242 4242 424", "06/24").check(now),
            Err(ParseError::InvalidNumber),
        );
        assert_eq!(
            card("4242-4242-4242-4242", "06/24").check(now),
            Err(ParseError::InvalidNumber),
        );
    }

    #[test]
    fn card_expiry_is_in_future_month() {
        let now = may_2024();
        let number = "4242424242424242";

        assert_eq!(card(number, "05/24").check(now), Err(ParseError::Expired));
        assert_eq!(card(number, "12/23").check(now), Err(ParseError::Expired));
        assert_eq!(card(number, "01/25").check(now), Ok(()));
        assert_eq!(
            card(number, "13/25").check(now),
            Err(ParseError::InvalidExpiry),
        );
        assert_eq!(
            card(number, "1/25").check(now),
            Err(ParseError::InvalidExpiry),
        );
    }

    #[test]
    fn cod_ignores_card_details() {
        let p = Payment::new("COD", Some(card("", "")), may_2024()).unwrap();

        assert_eq!(p.method(), Method::Cod);
    }
}
