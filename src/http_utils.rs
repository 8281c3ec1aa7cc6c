use http::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, AUTHORIZATION};
use oauth2::{AccessToken, AsyncHttpClient, HttpRequest, HttpResponse, SyncHttpClient};

pub const MIME_TYPE_JSON: &str = "application/json";

pub const BEARER: &str = "Bearer";

pub fn auth_bearer(
    access_token: &AccessToken,
) -> Result<(HeaderName, HeaderValue), InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("{} {}", BEARER, access_token.secret()))?;
    value.set_sensitive(true);
    Ok((AUTHORIZATION, value))
}

// Headers already present on the request take precedence over the defaults.
pub fn apply_default_headers(headers: &HeaderMap, request: &mut HttpRequest) {
    for (name, value) in headers {
        if !request.headers().contains_key(name) {
            request.headers_mut().insert(name.clone(), value.clone());
        }
    }
}

/// HTTP client wrapper that adds the strategy's custom headers (including `User-Agent`) to every
/// outgoing request.
///
/// Returned by [`EveStrategy::http_client`](crate::EveStrategy::http_client). Wrap the client
/// passed to the token endpoint request so that the token exchange identifies the application
/// the same way the profile request does. Headers set on an individual request are never
/// overwritten.
#[derive(Debug)]
pub struct DefaultHeadersClient<'a, C: ?Sized> {
    headers: &'a HeaderMap,
    inner: &'a C,
}
impl<'a, C: ?Sized> DefaultHeadersClient<'a, C> {
    pub(crate) fn new(headers: &'a HeaderMap, inner: &'a C) -> Self {
        Self { headers, inner }
    }

    /// Returns the headers added to each request.
    pub fn headers(&self) -> &HeaderMap {
        self.headers
    }

    /// Returns the wrapped HTTP client.
    pub fn inner(&self) -> &C {
        self.inner
    }
}
impl<'a, C: ?Sized> Clone for DefaultHeadersClient<'a, C> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, C: ?Sized> Copy for DefaultHeadersClient<'a, C> {}

impl<'a, C> SyncHttpClient for DefaultHeadersClient<'a, C>
where
    C: SyncHttpClient + ?Sized,
{
    type Error = C::Error;

    fn call(&self, mut request: HttpRequest) -> Result<HttpResponse, Self::Error> {
        apply_default_headers(self.headers, &mut request);
        self.inner.call(request)
    }
}

impl<'a, 'c, C> AsyncHttpClient<'c> for DefaultHeadersClient<'a, C>
where
    'a: 'c,
    C: AsyncHttpClient<'c> + ?Sized,
{
    type Error = C::Error;
    type Future = C::Future;

    fn call(&'c self, mut request: HttpRequest) -> Self::Future {
        apply_default_headers(self.headers, &mut request);
        self.inner.call(request)
    }
}
