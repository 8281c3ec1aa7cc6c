use crate::helpers::deserialize_string_or_vec;
use crate::{AuthUrl, CharacterUrl, ClientId, ClientSecret, RedirectUrl, Scope, TokenUrl};

use http::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue, USER_AGENT,
};
use serde::Deserialize;
use thiserror::Error;

use std::collections::BTreeMap;


/// Default EVE SSO authorization endpoint.
pub const DEFAULT_AUTHORIZATION_URL: &str = "https://login.eveonline.com/oauth/authorize";
/// Default EVE SSO token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://login.eveonline.com/oauth/token";
/// Default EVE SSO character (verify) endpoint.
pub const DEFAULT_CHARACTER_URL: &str = "https://login.eveonline.com/oauth/verify";
/// Default delimiter used to join requested scopes.
pub const DEFAULT_SCOPE_SEPARATOR: &str = ",";
/// `User-Agent` sent when neither a `User-Agent` custom header nor a user agent is configured.
///
/// The JavaScript `passport-eve-oauth` strategy sends `passport-eve-oauth` here; this crate
/// identifies itself as `eve-oauth` instead. Set [`StrategyOptions::set_user_agent`] to keep a
/// stable value when migrating.
pub const DEFAULT_USER_AGENT: &str = "eve-oauth";

/// Options for constructing an [`EveStrategy`](crate::EveStrategy).
///
/// Build these with [`StrategyOptions::new`] and the `set_*`/`add_*` methods, or deserialize
/// them (e.g. from an application config file) using the option names `clientID`,
/// `clientSecret`, `callbackURL`, `authorizationURL`, `tokenURL`, `scope`, `scopeSeparator`,
/// `userAgent`, `customHeaders` and `characterURL`. Only `clientID` and `callbackURL` are
/// required; the latter is checked when the strategy is constructed.
///
/// EVE's developer guidelines require every request to carry a `User-Agent` identifying the
/// application (e.g. its domain name), so setting [`set_user_agent`](Self::set_user_agent) is
/// strongly recommended.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOptions {
    #[serde(rename = "clientID")]
    client_id: ClientId,
    #[serde(default)]
    client_secret: Option<ClientSecret>,
    #[serde(rename = "callbackURL", default)]
    callback_url: Option<RedirectUrl>,
    #[serde(rename = "authorizationURL", default)]
    authorization_url: Option<AuthUrl>,
    #[serde(rename = "tokenURL", default)]
    token_url: Option<TokenUrl>,
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    scope: Vec<Scope>,
    #[serde(default)]
    scope_separator: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    custom_headers: BTreeMap<String, String>,
    #[serde(rename = "characterURL", default)]
    character_url: Option<CharacterUrl>,
}
impl StrategyOptions {
    /// Creates options for the given SSO application client ID; everything else is defaulted.
    pub fn new(client_id: ClientId) -> Self {
        StrategyOptions {
            client_id,
            client_secret: None,
            callback_url: None,
            authorization_url: None,
            token_url: None,
            scope: Vec::new(),
            scope_separator: None,
            user_agent: None,
            custom_headers: BTreeMap::new(),
            character_url: None,
        }
    }

    /// Sets the SSO application's secret key.
    pub fn set_client_secret(mut self, client_secret: ClientSecret) -> Self {
        self.client_secret = Some(client_secret);
        self
    }

    /// Sets the URL the SSO redirects to after the user grants authorization. Required.
    pub fn set_callback_url(mut self, callback_url: RedirectUrl) -> Self {
        self.callback_url = Some(callback_url);
        self
    }

    /// Overrides the authorization endpoint.
    pub fn set_authorization_url(mut self, authorization_url: AuthUrl) -> Self {
        self.authorization_url = Some(authorization_url);
        self
    }

    /// Overrides the token endpoint.
    pub fn set_token_url(mut self, token_url: TokenUrl) -> Self {
        self.token_url = Some(token_url);
        self
    }

    /// Appends a scope to request (e.g. `publicData`).
    pub fn add_scope(mut self, scope: Scope) -> Self {
        self.scope.push(scope);
        self
    }

    /// Appends a collection of scopes to request.
    pub fn add_scopes<I>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = Scope>,
    {
        self.scope.extend(scopes);
        self
    }

    /// Overrides the delimiter used to join scopes in the authorization URL (default `,`).
    pub fn set_scope_separator<S: Into<String>>(mut self, scope_separator: S) -> Self {
        self.scope_separator = Some(scope_separator.into());
        self
    }

    /// Sets the `User-Agent` sent with every request, unless a `User-Agent` custom header is
    /// also set, which takes precedence.
    pub fn set_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Adds a header to send with every request.
    pub fn add_custom_header<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    /// Overrides the character (verify) endpoint.
    pub fn set_character_url(mut self, character_url: CharacterUrl) -> Self {
        self.character_url = Some(character_url);
        self
    }

    /// Returns the client ID.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }
    /// Returns the client secret, if set.
    pub fn client_secret(&self) -> Option<&ClientSecret> {
        self.client_secret.as_ref()
    }
    /// Returns the callback URL, if set.
    pub fn callback_url(&self) -> Option<&RedirectUrl> {
        self.callback_url.as_ref()
    }
    /// Returns the requested scopes.
    pub fn scopes(&self) -> &[Scope] {
        &self.scope
    }

    // Resolves every option to its final value.
    pub(crate) fn resolve(self) -> Result<ResolvedOptions, ConfigurationError> {
        let callback_url = self
            .callback_url
            .ok_or(ConfigurationError::MissingCallbackUrl)?;

        let mut custom_headers = HeaderMap::new();
        for (name, value) in &self.custom_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| ConfigurationError::InvalidHeaderName(name.clone(), err))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|err| ConfigurationError::InvalidHeaderValue(name.clone(), err))?;
            custom_headers.insert(header_name, header_value);
        }
        if !custom_headers.contains_key(USER_AGENT) {
            let user_agent = self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
            let header_value = HeaderValue::from_str(user_agent).map_err(|err| {
                ConfigurationError::InvalidHeaderValue(USER_AGENT.as_str().to_string(), err)
            })?;
            custom_headers.insert(USER_AGENT, header_value);
        }

        Ok(ResolvedOptions {
            client_id: self.client_id,
            client_secret: self.client_secret,
            callback_url,
            authorization_url: match self.authorization_url {
                Some(authorization_url) => authorization_url,
                None => AuthUrl::new(DEFAULT_AUTHORIZATION_URL.to_string())
                    .map_err(|err| ConfigurationError::InvalidUrl("authorization", err))?,
            },
            token_url: match self.token_url {
                Some(token_url) => token_url,
                None => TokenUrl::new(DEFAULT_TOKEN_URL.to_string())
                    .map_err(|err| ConfigurationError::InvalidUrl("token", err))?,
            },
            scope: self.scope,
            scope_separator: self
                .scope_separator
                .unwrap_or_else(|| DEFAULT_SCOPE_SEPARATOR.to_string()),
            custom_headers,
            character_url: match self.character_url {
                Some(character_url) => character_url,
                None => CharacterUrl::new(DEFAULT_CHARACTER_URL.to_string())
                    .map_err(|err| ConfigurationError::InvalidUrl("character", err))?,
            },
        })
    }
}

pub(crate) struct ResolvedOptions {
    pub(crate) client_id: ClientId,
    pub(crate) client_secret: Option<ClientSecret>,
    pub(crate) callback_url: RedirectUrl,
    pub(crate) authorization_url: AuthUrl,
    pub(crate) token_url: TokenUrl,
    pub(crate) scope: Vec<Scope>,
    pub(crate) scope_separator: String,
    pub(crate) custom_headers: HeaderMap,
    pub(crate) character_url: CharacterUrl,
}

/// Strategy options are missing or invalid.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// No callback URL was configured.
    #[error("eve-oauth strategy requires a callbackURL option")]
    MissingCallbackUrl,
    /// A custom header name is not a valid HTTP header name.
    #[error("Invalid header name `{0}`")]
    InvalidHeaderName(String, #[source] InvalidHeaderName),
    /// A custom header (or the user agent) has a value that is not a valid HTTP header value.
    #[error("Invalid value for header `{0}`")]
    InvalidHeaderValue(String, #[source] InvalidHeaderValue),
    /// A default endpoint URL failed to parse.
    #[error("Invalid {0} URL")]
    InvalidUrl(&'static str, #[source] url::ParseError),
}
