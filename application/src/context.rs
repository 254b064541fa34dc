//! [`Context`]-related definitions.

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use service::{
    command::{self, Command as _},
    domain::User,
};
use tokio::sync::OnceCell;

use crate::{define_error, AsError, Error, Service};

/// Request context.
///
/// Authenticates the [`User`] lazily, on the first access to it.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Parts of the HTTP request.
    parts: http::request::Parts,

    /// Authenticated [`User`].
    current_user: OnceCell<User>,

    /// Last authentication [`Error`].
    auth_error: OnceCell<Error>,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Tries to get the [`User`] authenticated in this [`Context`].
    ///
    /// # Errors
    ///
    /// Errors if the provided authentication token is invalid.
    pub async fn try_current_user(&self) -> Result<Option<User>, Error> {
        self.current_user().await.map(Some).or_else(|e| {
            if e.code == Error::from(AuthError::AuthorizationRequired).code
                && self.parts.headers.get(http::header::AUTHORIZATION).is_none()
            {
                Ok(None)
            } else {
                Err(e)
            }
        })
    }

    /// Returns the [`User`] authenticated in this [`Context`].
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request is not authorized;
    /// - the provided authentication token is invalid.
    pub async fn current_user(&self) -> Result<User, Error> {
        self.current_user
            .get_or_try_init(|| async {
                match self
                    .auth_error
                    .get_or_try_init(|| async {
                        match self.do_authentication().await {
                            Ok(u) => Err(u),
                            Err(e) => Ok(e),
                        }
                    })
                    .await
                {
                    Ok(e) => Err(e),
                    Err(u) => Ok(u),
                }
            })
            .await
            .cloned()
            .map_err(Clone::clone)
    }

    /// Returns the authenticated [`User`] if it's an administrator.
    ///
    /// # Errors
    ///
    /// Errors if the current HTTP request is not authorized, or the
    /// authenticated [`User`] is not an administrator.
    pub async fn admin(&self) -> Result<User, Error> {
        let user = self.current_user().await?;
        if !user.is_admin() {
            return Err(AuthError::AdminRequired.into());
        }
        Ok(user)
    }

    /// Performs the [`User`] authentication.
    ///
    /// # Errors
    ///
    /// Errors if the provided authentication token is invalid.
    async fn do_authentication(&self) -> Result<User, Error> {
        let res = self
            .parts
            .clone()
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await;
        match res {
            Ok(TypedHeader(Authorization(bearer))) => self
                .service
                .execute(command::AuthorizeUserSession {
                    token: bearer.token().to_owned().into(),
                })
                .await
                .map_err(AsError::into_error),
            Err(e) if e.is_missing() => {
                Err(AuthError::AuthorizationRequired.into())
            }
            Err(_) => Err(AuthError::InvalidToken.into()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        Ok(Self {
            service,
            parts: parts.clone(),
            current_user: OnceCell::new(),
            auth_error: OnceCell::new(),
        })
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenDecodeError(_) | Self::UserNotExists(_) => {
                Some(AuthError::InvalidToken.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "UNAUTHORIZED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "UNAUTHORIZED"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid or expired token"]
        InvalidToken,

        #[code = "FORBIDDEN"]
        #[status = FORBIDDEN]
        #[message = "Admin access required"]
        AdminRequired,
    }
}
