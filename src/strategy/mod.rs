use crate::config::{ConfigurationError, StrategyOptions};
use crate::helpers::join_scopes;
use crate::http_utils::{apply_default_headers, auth_bearer, DefaultHeadersClient, MIME_TYPE_JSON};
use crate::profile::UserProfile;
use crate::types::{CharacterUrl, PROVIDER_NAME};
use crate::{
    AccessToken, AsyncHttpClient, AuthUrl, AuthorizationCode, ClientId, CsrfToken, HttpRequest,
    HttpResponse, RedirectUrl, Scope, SyncHttpClient, TokenResponse, TokenUrl,
};

use http::header::{HeaderMap, HeaderValue, ACCEPT};
use http::{Method, StatusCode};
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::{CodeTokenRequest, EndpointNotSet, EndpointSet, RequestTokenError};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use std::fmt::{Debug, Formatter, Result as FormatterResult};
use std::future::Future;

#[cfg(test)]
mod tests;

/// OAuth2 client configured with the SSO's authorization and token endpoints.
pub type EveOAuth2Client =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// An authentication strategy: a named provider that can turn an access token into a user
/// profile.
///
/// Implementors supply the HTTP request for the provider's profile endpoint and the mapping of its
/// response. The provided [`user_profile`](Self::user_profile) and
/// [`user_profile_async`](Self::user_profile_async) methods perform the request with any `oauth2`
/// HTTP client.
pub trait Strategy {
    /// Profile produced by a successful fetch.
    type Profile;

    /// Name the strategy is registered under.
    fn name(&self) -> &'static str;

    /// Builds the profile request for the given access token.
    fn user_profile_request(&self, access_token: &AccessToken) -> Result<HttpRequest, http::Error>;

    /// Maps the profile endpoint's HTTP response to a profile.
    fn user_profile_response<RE>(
        &self,
        http_response: HttpResponse,
    ) -> Result<Self::Profile, UserProfileError<RE>>
    where
        RE: std::error::Error + 'static;

    /// Fetches the profile of the user the access token was issued to, using the specified
    /// synchronous HTTP client.
    fn user_profile<C>(
        &self,
        access_token: &AccessToken,
        http_client: &C,
    ) -> Result<Self::Profile, UserProfileError<<C as SyncHttpClient>::Error>>
    where
        C: SyncHttpClient,
    {
        let http_request = self
            .user_profile_request(access_token)
            .map_err(|err| UserProfileError::Other(format!("failed to prepare request: {err}")))?;
        let http_response = http_client.call(http_request).map_err(|err| {
            log::warn!("{} profile request failed: {}", self.name(), err);
            UserProfileError::Fetch(FetchError::Request(err))
        })?;
        self.user_profile_response(http_response)
    }

    /// Fetches the profile of the user the access token was issued to, using the specified
    /// asynchronous HTTP client.
    fn user_profile_async<'c, C>(
        &'c self,
        access_token: &'c AccessToken,
        http_client: &'c C,
    ) -> impl Future<
        Output = Result<Self::Profile, UserProfileError<<C as AsyncHttpClient<'c>>::Error>>,
    > + 'c
    where
        Self: 'c,
        Self::Profile: 'c,
        C: AsyncHttpClient<'c>,
    {
        Box::pin(async move {
            let http_request = self.user_profile_request(access_token).map_err(|err| {
                UserProfileError::Other(format!("failed to prepare request: {err}"))
            })?;
            let http_response = http_client.call(http_request).await.map_err(|err| {
                log::warn!("{} profile request failed: {}", self.name(), err);
                UserProfileError::Fetch(FetchError::Request(err))
            })?;
            self.user_profile_response(http_response)
        })
    }
}

/// Decides whether an authenticated character maps to an application user.
///
/// Implemented for any `Fn(&BasicTokenResponse, &P) -> Result<Option<U>, E>`. Returning
/// `Ok(None)` rejects the login without treating it as an error.
pub trait Verify<P> {
    /// Application user produced by a successful verification.
    type User;
    /// Error raised by the application while verifying.
    type Error: std::error::Error + 'static;

    /// Verifies the character described by `profile`, authorized by `token_response`.
    fn verify(
        &self,
        token_response: &BasicTokenResponse,
        profile: &P,
    ) -> Result<Option<Self::User>, Self::Error>;
}
impl<P, U, E, F> Verify<P> for F
where
    F: Fn(&BasicTokenResponse, &P) -> Result<Option<U>, E>,
    E: std::error::Error + 'static,
{
    type User = U;
    type Error = E;

    fn verify(&self, token_response: &BasicTokenResponse, profile: &P) -> Result<Option<U>, E> {
        (self)(token_response, profile)
    }
}

/// Outcome of [`EveStrategy::authenticate`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Authentication<U> {
    /// The verify callback accepted the character.
    Authenticated(U),
    /// The verify callback declined the character.
    Rejected,
}

/// EVE Online SSO strategy.
///
/// Holds an `oauth2` client configured for the SSO and delegates the authorization redirect and
/// code exchange to it. After the exchange, the character behind the access token is fetched from
/// the character URL and normalized into a [`UserProfile`], which the verify callback `V` maps to
/// an application user (see [`authenticate`](Self::authenticate)).
///
/// The strategy holds no mutable state and may be shared across threads when `V` allows it.
pub struct EveStrategy<V> {
    oauth2_client: EveOAuth2Client,
    callback_url: RedirectUrl,
    scope: Vec<Scope>,
    scope_separator: String,
    character_url: CharacterUrl,
    custom_headers: HeaderMap,
    verify: V,
}
impl<V> EveStrategy<V> {
    /// Creates the strategy, applying defaults for every option that isn't set.
    ///
    /// Fails with [`ConfigurationError::MissingCallbackUrl`] if no callback URL is configured, or
    /// with another [`ConfigurationError`] if a custom header is malformed.
    pub fn new(options: StrategyOptions, verify: V) -> Result<Self, ConfigurationError> {
        let options = options.resolve()?;

        let mut oauth2_client = BasicClient::new(options.client_id)
            .set_auth_uri(options.authorization_url)
            .set_token_uri(options.token_url)
            .set_redirect_uri(options.callback_url.clone());
        if let Some(client_secret) = options.client_secret {
            oauth2_client = oauth2_client.set_client_secret(client_secret);
        }

        Ok(EveStrategy {
            oauth2_client,
            callback_url: options.callback_url,
            scope: options.scope,
            scope_separator: options.scope_separator,
            character_url: options.character_url,
            custom_headers: options.custom_headers,
            verify,
        })
    }

    /// Returns the underlying `oauth2` client.
    pub fn oauth2_client(&self) -> &EveOAuth2Client {
        &self.oauth2_client
    }
    /// Returns the client ID.
    pub fn client_id(&self) -> &ClientId {
        self.oauth2_client.client_id()
    }
    /// Returns the authorization endpoint.
    pub fn authorization_url(&self) -> &AuthUrl {
        self.oauth2_client.auth_uri()
    }
    /// Returns the token endpoint.
    pub fn token_url(&self) -> &TokenUrl {
        self.oauth2_client.token_uri()
    }
    /// Returns the callback URL.
    pub fn callback_url(&self) -> &RedirectUrl {
        &self.callback_url
    }
    /// Returns the character (verify) endpoint.
    pub fn character_url(&self) -> &CharacterUrl {
        &self.character_url
    }
    /// Returns the scopes requested during authorization.
    pub fn scopes(&self) -> &[Scope] {
        &self.scope
    }
    /// Returns the delimiter used to join the requested scopes.
    pub fn scope_separator(&self) -> &str {
        &self.scope_separator
    }
    /// Returns the headers sent with every request, including `User-Agent`.
    pub fn custom_headers(&self) -> &HeaderMap {
        &self.custom_headers
    }
    /// Returns the verify callback.
    pub fn verify(&self) -> &V {
        &self.verify
    }

    /// Builds the URL to redirect the user to in order to start the login.
    ///
    /// The configured scopes are sent as a single `scope` parameter joined with the scope
    /// separator, and omitted entirely when none are configured. The returned CSRF token must be
    /// stored (e.g. in the user's session) and checked when the SSO redirects back; see
    /// [`AuthorizationResponse::into_code`](crate::AuthorizationResponse::into_code).
    pub fn authorize_url<S>(&self, state_fn: S) -> (Url, CsrfToken)
    where
        S: FnOnce() -> CsrfToken,
    {
        let mut request = self.oauth2_client.authorize_url(state_fn);
        if !self.scope.is_empty() {
            request =
                request.add_extra_param("scope", join_scopes(&self.scope, &self.scope_separator));
        }
        request.url()
    }

    /// Creates a request to exchange an authorization code for an access token.
    ///
    /// Send it through [`http_client`](Self::http_client) so that the token request carries the
    /// configured headers as well.
    pub fn exchange_code(
        &self,
        code: AuthorizationCode,
    ) -> CodeTokenRequest<'_, BasicErrorResponse, BasicTokenResponse> {
        self.oauth2_client.exchange_code(code)
    }

    /// Wraps an `oauth2` HTTP client so that each request it sends carries the configured custom
    /// headers.
    pub fn http_client<'a, C>(&'a self, inner: &'a C) -> DefaultHeadersClient<'a, C>
    where
        C: ?Sized,
    {
        DefaultHeadersClient::new(&self.custom_headers, inner)
    }

    /// Completes a login using the specified synchronous HTTP client.
    ///
    /// Exchanges `code` for an access token, fetches the character's profile with it, and passes
    /// both to the verify callback.
    pub fn authenticate<C>(
        &self,
        code: AuthorizationCode,
        http_client: &C,
    ) -> Result<Authentication<V::User>, AuthenticateError<<C as SyncHttpClient>::Error, V::Error>>
    where
        C: SyncHttpClient,
        V: Verify<UserProfile>,
    {
        let http_client = self.http_client(http_client);

        let token_response = self
            .exchange_code(code)
            .request(&http_client)
            .map_err(|err| {
                log::warn!("{PROVIDER_NAME} token exchange failed: {err}");
                AuthenticateError::TokenExchange(err)
            })?;
        let profile = self
            .user_profile(token_response.access_token(), &http_client)
            .map_err(AuthenticateError::UserProfile)?;

        self.verify_profile(&token_response, profile)
    }

    /// Completes a login using the specified asynchronous HTTP client.
    ///
    /// See [`authenticate`](Self::authenticate).
    pub fn authenticate_async<'c, C, RE>(
        &'c self,
        code: AuthorizationCode,
        http_client: &'c C,
    ) -> impl Future<Output = Result<Authentication<V::User>, AuthenticateError<RE, V::Error>>> + 'c
    where
        Self: 'c,
        C: for<'h> AsyncHttpClient<'h, Error = RE>,
        RE: std::error::Error + 'static,
        V: Verify<UserProfile>,
    {
        Box::pin(async move {
            let http_client = self.http_client(http_client);

            let token_response = self
                .exchange_code(code)
                .request_async(&http_client)
                .await
                .map_err(|err| {
                    log::warn!("{PROVIDER_NAME} token exchange failed: {err}");
                    AuthenticateError::TokenExchange(err)
                })?;
            let profile = self
                .user_profile_async(token_response.access_token(), &http_client)
                .await
                .map_err(AuthenticateError::UserProfile)?;

            self.verify_profile(&token_response, profile)
        })
    }

    fn verify_profile<RE>(
        &self,
        token_response: &BasicTokenResponse,
        profile: UserProfile,
    ) -> Result<Authentication<V::User>, AuthenticateError<RE, V::Error>>
    where
        RE: std::error::Error + 'static,
        V: Verify<UserProfile>,
    {
        match self
            .verify
            .verify(token_response, &profile)
            .map_err(AuthenticateError::Verify)?
        {
            Some(user) => {
                log::debug!("{PROVIDER_NAME} character {:?} authenticated", profile.id());
                Ok(Authentication::Authenticated(user))
            }
            None => {
                log::debug!("{PROVIDER_NAME} character {:?} rejected", profile.id());
                Ok(Authentication::Rejected)
            }
        }
    }
}
impl<V> Strategy for EveStrategy<V> {
    type Profile = UserProfile;

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    // The access token goes in the `Authorization` header, never in the query string.
    fn user_profile_request(&self, access_token: &AccessToken) -> Result<HttpRequest, http::Error> {
        let (auth_header, auth_value) = auth_bearer(access_token)?;

        let mut http_request = http::Request::builder()
            .uri(self.character_url.as_str())
            .method(Method::GET)
            .header(ACCEPT, HeaderValue::from_static(MIME_TYPE_JSON))
            .header(auth_header, auth_value)
            .body(Vec::new())?;
        apply_default_headers(&self.custom_headers, &mut http_request);

        log::debug!("requesting {PROVIDER_NAME} profile from {}", self.character_url.as_str());
        Ok(http_request)
    }

    fn user_profile_response<RE>(
        &self,
        http_response: HttpResponse,
    ) -> Result<UserProfile, UserProfileError<RE>>
    where
        RE: std::error::Error + 'static,
    {
        if !http_response.status().is_success() {
            log::warn!(
                "{PROVIDER_NAME} profile request returned HTTP status code {}",
                http_response.status()
            );
            return Err(UserProfileError::Fetch(FetchError::Response(
                http_response.status(),
                http_response.body().to_owned(),
                format!(
                    "HTTP status code {} at {}",
                    http_response.status(),
                    self.character_url.as_str()
                ),
            )));
        }

        let json: Value =
            serde_json::from_slice(http_response.body()).map_err(UserProfileError::Parse)?;
        let raw = String::from_utf8_lossy(http_response.body()).into_owned();

        let profile = UserProfile::new(raw, json);
        log::debug!("normalized {PROVIDER_NAME} profile for character {:?}", profile.id());
        Ok(profile)
    }
}
impl<V> Debug for EveStrategy<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatterResult {
        f.debug_struct("EveStrategy")
            .field("oauth2_client", &self.oauth2_client)
            .field("callback_url", &self.callback_url)
            .field("scope", &self.scope)
            .field("scope_separator", &self.scope_separator)
            .field("character_url", &self.character_url)
            .field("custom_headers", &self.custom_headers)
            .finish_non_exhaustive()
    }
}

/// Error fetching a user profile.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserProfileError<RE>
where
    RE: std::error::Error + 'static,
{
    /// The profile endpoint could not be reached or returned an unsuccessful status.
    #[error("Failed to fetch user profile")]
    Fetch(#[source] FetchError<RE>),
    /// The profile endpoint returned a body that is not valid JSON.
    #[error("Failed to parse user profile")]
    Parse(#[source] serde_json::Error),
    /// An unexpected error occurred.
    #[error("Other error: {0}")]
    Other(String),
}

/// Error communicating with the profile endpoint.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError<RE>
where
    RE: std::error::Error + 'static,
{
    /// An error occurred while sending the request or receiving the response (e.g., network
    /// connectivity failed).
    #[error("Request failed")]
    Request(#[source] RE),
    /// Server returned an unsuccessful status code. Holds the status, the response body, and a
    /// description.
    #[error("Server returned invalid response: {2}")]
    Response(StatusCode, Vec<u8>, String),
}

/// Error completing a login.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthenticateError<RE, VE>
where
    RE: std::error::Error + 'static,
    VE: std::error::Error + 'static,
{
    /// The authorization code could not be exchanged for an access token.
    #[error("Failed to exchange authorization code")]
    TokenExchange(#[source] RequestTokenError<RE, BasicErrorResponse>),
    /// The character's profile could not be fetched.
    #[error("Failed to fetch user profile")]
    UserProfile(#[source] UserProfileError<RE>),
    /// The verify callback failed.
    #[error("Failed to verify user")]
    Verify(#[source] VE),
}
