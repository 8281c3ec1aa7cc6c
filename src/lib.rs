#![warn(missing_docs)]
//!
//! [EVE Online SSO](https://developers.eveonline.com/) login strategy built on the
//! [`oauth2`] crate.
//!
//! The strategy drives the OAuth 2.0 authorization code flow against the EVE SSO and turns the
//! resulting access token into a normalized character profile:
//!
//!  1. Configure an [`EveStrategy`] from [`StrategyOptions`] and a verify callback that maps a
//!     character to an application user.
//!  2. Redirect the user to [`EveStrategy::authorize_url`], keeping the returned CSRF token.
//!  3. When the SSO redirects back, parse the query with [`AuthorizationResponse`] and check it
//!     with [`AuthorizationResponse::into_code`].
//!  4. Call [`EveStrategy::authenticate`] (or [`EveStrategy::authenticate_async`]) with the code.
//!     The code is exchanged for an access token, the character is fetched from the SSO's verify
//!     endpoint, and the verify callback decides the outcome.
//!
//! Every request the strategy makes carries the configured custom headers, including the
//! `User-Agent` EVE requires applications to send.
//!
//! # Example
//!
//! ```rust,no_run
//! use eve_oauth::{
//!     AuthorizationResponse, Authentication, BasicTokenResponse, ClientId, ClientSecret,
//!     CsrfToken, EveStrategy, RedirectUrl, Scope, StrategyOptions, UserProfile,
//! };
//! # #[cfg(feature = "reqwest-blocking")]
//! use eve_oauth::reqwest;
//! use std::convert::Infallible;
//!
//! # #[cfg(feature = "reqwest-blocking")]
//! # fn err_wrapper() -> Result<(), anyhow::Error> {
//! let options = StrategyOptions::new(ClientId::new("client_id".to_string()))
//!     .set_client_secret(ClientSecret::new("client_secret".to_string()))
//!     .set_callback_url(RedirectUrl::new("https://example.com/callback".to_string())?)
//!     .add_scope(Scope::new("publicData".to_string()))
//!     .set_user_agent("example.com");
//!
//! let strategy = EveStrategy::new(
//!     options,
//!     |_token: &BasicTokenResponse, profile: &UserProfile| -> Result<_, Infallible> {
//!         Ok(profile.id().cloned())
//!     },
//! )?;
//!
//! let (authorize_url, csrf_state) = strategy.authorize_url(CsrfToken::new_random);
//! // Redirect the user to `authorize_url`. Once they've logged in, the SSO redirects back to
//! // the callback URL.
//! # let callback_query = "code=some+authorization+code&state=some+state";
//! let code = AuthorizationResponse::from_query(callback_query).into_code(&csrf_state)?;
//!
//! let http_client = reqwest::blocking::ClientBuilder::new()
//!     // Following redirects opens the client up to SSRF vulnerabilities.
//!     .redirect(reqwest::redirect::Policy::none())
//!     .build()?;
//!
//! match strategy.authenticate(code, &http_client)? {
//!     Authentication::Authenticated(character_id) => println!("logged in as {character_id:?}"),
//!     Authentication::Rejected => println!("login rejected"),
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod macros;

/// Callback handling.
mod authorization;

/// Strategy options and their defaults.
pub mod config;

mod helpers;

mod http_utils;

/// Character profile normalization.
pub mod profile;

/// The [`Strategy`] trait and the EVE SSO strategy.
pub mod strategy;

/// Profile field types.
mod types;

pub use oauth2::{
    basic::{BasicErrorResponse, BasicErrorResponseType, BasicTokenResponse, BasicTokenType},
    AccessToken, AsyncHttpClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret,
    CodeTokenRequest, CsrfToken, EndpointNotSet, EndpointSet, HttpClientError, HttpRequest,
    HttpResponse, RedirectUrl, RefreshToken, RequestTokenError, Scope, StandardErrorResponse,
    SyncHttpClient, TokenResponse, TokenUrl,
};

/// Public re-exports of types used for HTTP client interfaces.
pub use oauth2::http;
pub use oauth2::url;

#[cfg(all(feature = "curl", not(target_arch = "wasm32")))]
pub use oauth2::curl;

#[cfg(any(feature = "reqwest", feature = "reqwest-blocking"))]
pub use oauth2::reqwest;

#[cfg(feature = "ureq")]
pub use oauth2::ureq;

pub use crate::authorization::{AuthorizationResponse, CallbackError, ACCESS_DENIED};
pub use crate::config::{ConfigurationError, StrategyOptions};
pub use crate::http_utils::DefaultHeadersClient;
pub use crate::profile::{EveProfile, ProfileParseError, UserProfile};
pub use crate::strategy::{
    AuthenticateError, Authentication, EveOAuth2Client, EveStrategy, FetchError, Strategy,
    UserProfileError, Verify,
};
pub use crate::types::{
    CharacterId, CharacterName, CharacterOwnerHash, CharacterUrl, EveProvider, ExpiresOn,
    ProfileTokenType, Scopes, PROVIDER_NAME,
};
