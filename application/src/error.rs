//! [`Error`]-related definitions.

use std::{collections::BTreeMap, fmt};

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    extract::QueryRejection, typed_header::TypedHeaderRejection,
};
use derive_more::Error as StdError;
use itertools::Itertools as _;
use serde::Serialize;
use service::infra::database;
use tracerr::{Trace, Traced};
use tracing as log;

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            fields: None,
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// REST API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,

    /// Per-field details of this [`Error`], if any.
    pub fields: Option<Fields>,
}

impl Error {
    /// Creates a new [`Error`] with the provided parameters.
    #[must_use]
    pub fn new(
        code: Code,
        status_code: http::StatusCode,
        msg: &impl ToString,
    ) -> Self {
        Self {
            code,
            status_code,
            message: msg.to_string(),
            fields: None,
            backtrace: None,
        }
    }

    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self::new(
            "INTERNAL_ERROR",
            http::StatusCode::INTERNAL_SERVER_ERROR,
            msg,
        )
    }

    /// Create a new [`Error`] representing a malformed request.
    #[must_use]
    pub fn bad_request(msg: &impl ToString) -> Self {
        Self::new("BAD_REQUEST", http::StatusCode::BAD_REQUEST, msg)
    }

    /// Create a new [`Error`] representing a missing resource.
    #[must_use]
    pub fn not_found(msg: &impl ToString) -> Self {
        Self::new("NOT_FOUND", http::StatusCode::NOT_FOUND, msg)
    }

    /// Attaches the provided per-field details to this [`Error`].
    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = Some(fields);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
            fields: _,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        /// Body of an [`Error`] response.
        #[derive(Serialize)]
        struct Body<'e> {
            error: &'e Details<'e>,
        }

        /// Client-visible part of an [`Error`].
        #[derive(Serialize)]
        struct Details<'e> {
            code: Code,
            message: &'e str,
            #[serde(skip_serializing_if = "Option::is_none")]
            fields: Option<&'e Fields>,
        }

        let message = if self.status_code.is_server_error() {
            log::error!("{self}");
            "Unexpected error"
        } else {
            log::debug!("{self}");
            &self.message
        };

        let details = Details {
            code: self.code,
            message,
            fields: self.fields.as_ref(),
        };
        (self.status_code, Json(Body { error: &details })).into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Per-field details of an [`Error`].
pub type Fields = BTreeMap<String, String>;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(self))
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for PathRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for QueryRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(self))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod spec {
    use axum::response::IntoResponse as _;

    use super::{Error, Fields};

    async fn body(err: Error) -> (http::StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn renders_code_and_message() {
        let (status, json) = body(Error::not_found(&"Cart not found")).await;

        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert_eq!(
            json,
            serde_json::json!({
                "error": {"code": "NOT_FOUND", "message": "Cart not found"},
            }),
        );
    }

    #[tokio::test]
    async fn renders_fields() {
        let err = Error::new(
            "OUT_OF_STOCK",
            http::StatusCode::CONFLICT,
            &"Insufficient stock",
        )
        .with_fields(Fields::from([("p1".into(), "2".into())]));

        let (status, json) = body(err).await;

        assert_eq!(status, http::StatusCode::CONFLICT);
        assert_eq!(json["error"]["fields"]["p1"], "2");
    }

    #[tokio::test]
    async fn hides_internals() {
        let (status, json) = body(Error::internal(&"pool timed out")).await;

        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], "Unexpected error");
        assert!(json["error"].get("backtrace").is_none());
    }
}
