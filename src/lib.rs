use std::sync::Arc;

use account::activation::TokenGenerator;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

pub mod config;

pub mod account;
pub mod handle;
pub mod mail;
pub mod store;


use config::Config;
use mail::Mailer;
use store::Store;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("activation link is invalid")]
    InvalidLink,
    #[error("registration number {0} is already taken")]
    DuplicateRegistrationNumber(String),
    #[error("no registration numbers left for admission year {0}")]
    SequenceExhausted(u16),

    #[error("username or password incorrect")]
    UsernameOrPasswordIncorrect,
    #[error("this account is inactive")]
    AccountInactive,
    #[error("profile either not completed or not verified by admin, can't login")]
    ProfileNotVerified,
    #[error("permission denied")]
    PermissionDenied,
    #[error("username already taken")]
    UsernameTaken,
    #[error("email already registered")]
    EmailTaken,
    #[error("profile already completed")]
    ProfileAlreadyCompleted,
    #[error("profile not completed yet")]
    ProfileNotCompleted,
    #[error("target account not found")]
    AccountNotFound,

    #[error("not logged in")]
    NotLoggedIn,
    #[error("non-ascii header value: {0}")]
    HeaderNonAscii(axum::http::header::ToStrError),
    #[error("AccountId header is not a number")]
    InvalidAuthHeader,

    #[error("address error: {0}")]
    EmailAddress(lettre::address::AddressError),
    #[error("email message error: {0}")]
    Lettre(lettre::error::Error),
    #[error("failed to send email: {0}")]
    MailDelivery(Box<dyn std::error::Error + Send + Sync>),

    #[error("io error: {0}")]
    Io(std::io::Error),
    #[error("failed to parse toml: {0}")]
    TomlDe(toml::de::Error),
    #[error("failed to write toml: {0}")]
    TomlSer(toml::ser::Error),
}

impl Error {
    pub fn to_status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_)
            | Error::InvalidLink
            | Error::EmailAddress(_)
            | Error::HeaderNonAscii(_)
            | Error::InvalidAuthHeader => StatusCode::BAD_REQUEST,
            Error::DuplicateRegistrationNumber(_)
            | Error::SequenceExhausted(_)
            | Error::UsernameTaken
            | Error::EmailTaken
            | Error::ProfileAlreadyCompleted
            | Error::ProfileNotCompleted => StatusCode::CONFLICT,
            Error::AccountNotFound => StatusCode::NOT_FOUND,
            Error::NotLoggedIn => StatusCode::UNAUTHORIZED,
            Error::Lettre(_)
            | Error::MailDelivery(_)
            | Error::Io(_)
            | Error::TomlDe(_)
            | Error::TomlSer(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for Error {
    #[inline]
    fn into_response(self) -> axum::response::Response {
        #[derive(Serialize)]
        struct ErrorInfo {
            error: String,
        }
        (
            self.to_status_code(),
            axum::Json(ErrorInfo {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Implements `From<T>` for [`Error`].
macro_rules! impl_from {
    ($($t:ty => $v:ident),* $(,)?) => {
        $(
            impl From<$t> for $crate::Error {
                #[inline]
                fn from(err: $t) -> Self {
                    Self::$v(err)
                }
            }
        )*
    };
}

impl_from! {
    lettre::address::AddressError => EmailAddress,
    lettre::error::Error => Lettre,
    axum::http::header::ToStrError => HeaderNonAscii,
    std::io::Error => Io,
    toml::de::Error => TomlDe,
    toml::ser::Error => TomlSer,
}

/// State shared by all handlers.
#[derive(Clone)]
pub struct Global {
    pub store: Arc<Store>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenGenerator>,
}

impl Global {
    pub fn new(store: Store, mailer: impl Mailer, config: Config) -> Self {
        let tokens = TokenGenerator::new(
            config.activation.secret.clone(),
            chrono::Duration::hours(config.activation.timeout_hours),
        );
        Self {
            store: Arc::new(store),
            mailer: Arc::new(mailer),
            config: Arc::new(config),
            tokens: Arc::new(tokens),
        }
    }
}

/// Construct a router.
pub fn router(global: Global) -> axum::Router {
    axum::Router::new()
        // account
        .route("/api/account/signup", post(handle::account::signup))
        .route("/api/account/login", post(handle::account::login))
        .route("/api/account/logout", post(handle::account::logout))
        .route("/activate/:uid/:token", get(handle::account::activate))
        .route(
            "/resend-activation/:uid/:token",
            get(handle::account::resend_activation),
        )
        // profile
        .route("/api/profile", get(handle::profile::search))
        .route("/api/profile/complete", post(handle::profile::complete))
        .route("/api/profile/:username", get(handle::profile::view))
        .route("/api/profile/:username/edit", post(handle::profile::edit))
        // admin
        .route("/api/admin/profiles/pending", get(handle::admin::pending))
        .route(
            "/api/admin/profiles/:username/verify",
            post(handle::admin::verify),
        )
        .with_state(global)
}

/// An authenticated request, extracted from the `AccountId`
/// and `Token` headers.
pub struct Auth {
    /// The only id of this account.
    pub account_id: u64,
    /// The session token of this account.
    pub token: String,
}

impl Auth {
    /// Fails with [`Error::PermissionDenied`] unless this account is staff.
    pub fn require_staff(&self, store: &Store) -> Result<(), Error> {
        let account = store.get(self.account_id).ok_or(Error::NotLoggedIn)?;
        if account.user.is_staff {
            Ok(())
        } else {
            Err(Error::PermissionDenied)
        }
    }
}

#[async_trait]
impl FromRequestParts<Global> for Auth {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &Global) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Token")
            .ok_or(Error::NotLoggedIn)?
            .to_str()?
            .to_owned();
        let account_id = parts
            .headers
            .get("AccountId")
            .ok_or(Error::NotLoggedIn)?
            .to_str()?
            .parse()
            .map_err(|_| Error::InvalidAuthHeader)?;

        let account = state.store.get(account_id).ok_or(Error::NotLoggedIn)?;
        if account.sessions.token_usable(&token, chrono::Utc::now()) {
            Ok(Self { account_id, token })
        } else {
            Err(Error::NotLoggedIn)
        }
    }
}
