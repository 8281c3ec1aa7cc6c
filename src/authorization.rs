use crate::{AuthorizationCode, CsrfToken};

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::Url;

use std::borrow::Cow;

/// `error` value the SSO sends when the user declines to authorize the application.
pub const ACCESS_DENIED: &str = "access_denied";

/// Query parameters of the request the SSO redirects the user back with.
///
/// Deserialize it with the web framework's query extractor, or parse it with
/// [`from_query`](Self::from_query) / [`from_url`](Self::from_url), then call
/// [`into_code`](Self::into_code) to obtain the authorization code.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AuthorizationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_uri: Option<String>,
}
impl AuthorizationResponse {
    /// Parses a URL-encoded query string (without the leading `?`).
    ///
    /// Unrecognized parameters are ignored. When a parameter is repeated, the first occurrence
    /// wins.
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    /// Parses the query string of the URL the SSO redirected to.
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs())
    }

    fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Cow<'a, str>, Cow<'a, str>)>,
    {
        let mut response = AuthorizationResponse::default();
        for (name, value) in pairs {
            let field = match &*name {
                "code" => &mut response.code,
                "state" => &mut response.state,
                "error" => &mut response.error,
                "error_description" => &mut response.error_description,
                "error_uri" => &mut response.error_uri,
                _ => continue,
            };
            if field.is_none() {
                *field = Some(value.into_owned());
            }
        }
        response
    }

    /// Authorization code, if the user granted authorization.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
    /// Opaque state echoed back by the SSO.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }
    /// Error code, if authorization failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
    /// Human-readable description of the error.
    pub fn error_description(&self) -> Option<&str> {
        self.error_description.as_deref()
    }
    /// URI of a page describing the error.
    pub fn error_uri(&self) -> Option<&str> {
        self.error_uri.as_deref()
    }

    /// Extracts the authorization code after checking that the SSO reported no error and that the
    /// returned state matches the CSRF token issued by
    /// [`EveStrategy::authorize_url`](crate::EveStrategy::authorize_url).
    ///
    /// Errors take precedence over the state check, so a user declining authorization is always
    /// reported as [`CallbackError::AccessDenied`].
    pub fn into_code(self, expected_state: &CsrfToken) -> Result<AuthorizationCode, CallbackError> {
        if let Some(error) = self.error {
            if error == ACCESS_DENIED {
                return Err(CallbackError::AccessDenied {
                    description: self.error_description,
                });
            }
            return Err(CallbackError::Authorization {
                error,
                description: self.error_description,
                uri: self.error_uri,
            });
        }

        let state = self.state.ok_or(CallbackError::StateMismatch)?;
        if !bool::from(
            state
                .as_bytes()
                .ct_eq(expected_state.secret().as_bytes()),
        ) {
            return Err(CallbackError::StateMismatch);
        }

        self.code
            .map(AuthorizationCode::new)
            .ok_or(CallbackError::MissingCode)
    }
}

/// Error handling the SSO's redirect back to the application.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CallbackError {
    /// The user declined to authorize the application.
    #[error("User denied authorization")]
    AccessDenied {
        /// Description reported by the SSO.
        description: Option<String>,
    },
    /// The SSO reported an authorization error.
    #[error("Authorization failed: {error}")]
    Authorization {
        /// Error code.
        error: String,
        /// Human-readable description.
        description: Option<String>,
        /// URI of a page describing the error.
        uri: Option<String>,
    },
    /// The returned state is missing or doesn't match the CSRF token issued for this login.
    #[error("State mismatch")]
    StateMismatch,
    /// The redirect carried neither an authorization code nor an error.
    #[error("Missing authorization code")]
    MissingCode,
}
