use crate::strategy::{
    AuthenticateError, Authentication, EveStrategy, FetchError, Strategy, UserProfileError,
};
use crate::{
    AccessToken, AuthorizationCode, BasicTokenResponse, ClientId, ClientSecret,
    ConfigurationError, CsrfToken, HttpRequest, HttpResponse, RedirectUrl, RequestTokenError,
    Scope, Scopes, StrategyOptions, TokenResponse, UserProfile,
};

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use thiserror::Error;

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::io::{Error as IoError, ErrorKind};

const TEST_PILOT_JSON: &str = "{\
    \"CharacterID\":12345678,\
    \"CharacterName\":\"Test Pilot\",\
    \"ExpiresOn\":\"2024-01-01T00:00:00\",\
    \"Scopes\":\"publicData\",\
    \"TokenType\":\"Character\",\
    \"CharacterOwnerHash\":\"abc123\"\
}";

const TOKEN_JSON: &str = "{\
    \"access_token\":\"uNEEh8oT3ku-8pMAE3ctqw\",\
    \"token_type\":\"Bearer\",\
    \"expires_in\":1199,\
    \"refresh_token\":\"gEy0T1x0KQTo7QGSfTk9AA\"\
}";

type NoVerify = fn(&BasicTokenResponse, &UserProfile) -> Result<Option<()>, Infallible>;

fn accept_nobody(
    _token_response: &BasicTokenResponse,
    _profile: &UserProfile,
) -> Result<Option<()>, Infallible> {
    Ok(None)
}

fn options() -> StrategyOptions {
    StrategyOptions::new(ClientId::new("3rdparty_clientid".to_string()))
        .set_client_secret(ClientSecret::new("jkfopwkmif90e0womkepowe9irkjo3p9mkfwe".to_string()))
        .set_callback_url(RedirectUrl::new("https://3rdpartysite.com/callback".to_string()).unwrap())
        .set_user_agent("3rdpartysite.com")
}

fn strategy() -> EveStrategy<NoVerify> {
    EveStrategy::new(options(), accept_nobody as NoVerify).unwrap()
}

fn json_response(status: u16, body: &str) -> HttpResponse {
    http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(body.as_bytes().to_vec())
        .unwrap()
}

fn connection_refused() -> IoError {
    IoError::new(ErrorKind::ConnectionRefused, "connection refused")
}

// Canned SSO responses for the token and verify endpoints.
fn sso_response(request: &HttpRequest) -> HttpResponse {
    match request.uri().path() {
        "/oauth/token" => json_response(200, TOKEN_JSON),
        "/oauth/verify" => json_response(200, TEST_PILOT_JSON),
        other => panic!("unexpected request path {}", other),
    }
}

#[test]
fn test_new_without_callback_url() {
    let options = StrategyOptions::new(ClientId::new("3rdparty_clientid".to_string()))
        .set_client_secret(ClientSecret::new("secret".to_string()))
        .set_user_agent("3rdpartysite.com")
        .add_scope(Scope::new("publicData".to_string()));

    match EveStrategy::new(options, accept_nobody as NoVerify) {
        Err(ConfigurationError::MissingCallbackUrl) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_defaults() {
    let strategy = strategy();

    assert_eq!("eve", strategy.name());
    assert_eq!("3rdparty_clientid", strategy.client_id().as_str());
    assert_eq!(
        "https://login.eveonline.com/oauth/authorize",
        strategy.authorization_url().as_str()
    );
    assert_eq!(
        "https://login.eveonline.com/oauth/token",
        strategy.token_url().as_str()
    );
    assert_eq!(
        "https://login.eveonline.com/oauth/verify",
        strategy.character_url().as_str()
    );
    assert_eq!(
        "https://3rdpartysite.com/callback",
        strategy.callback_url().as_str()
    );
    assert_eq!(",", strategy.scope_separator());
    assert!(strategy.scopes().is_empty());
    assert_eq!("3rdpartysite.com", strategy.custom_headers()[USER_AGENT]);
}

#[test]
fn test_authorize_url() {
    let scoped = EveStrategy::new(
        options().add_scopes(vec![
            Scope::new("publicData".to_string()),
            Scope::new("esi-skills.read_skills.v1".to_string()),
        ]),
        accept_nobody as NoVerify,
    )
    .unwrap();

    let (url, state) = scoped.authorize_url(|| CsrfToken::new("CSRF123".to_string()));
    assert_eq!("CSRF123", state.secret());
    assert_eq!(
        "https://login.eveonline.com/oauth/authorize?response_type=code\
         &client_id=3rdparty_clientid\
         &state=CSRF123\
         &redirect_uri=https%3A%2F%2F3rdpartysite.com%2Fcallback\
         &scope=publicData%2Cesi-skills.read_skills.v1",
        url.as_str()
    );

    let unscoped = strategy();
    let (url, _) = unscoped.authorize_url(|| CsrfToken::new("CSRF123".to_string()));
    let params = url.query_pairs().into_owned().collect::<HashMap<_, _>>();
    assert!(!params.contains_key("scope"));
    assert_eq!("code", params["response_type"]);
}

#[test]
fn test_authorize_url_custom_separator() {
    let strategy = EveStrategy::new(
        options().set_scope_separator(" ").add_scopes(vec![
            Scope::new("publicData".to_string()),
            Scope::new("esi-skills.read_skills.v1".to_string()),
        ]),
        accept_nobody as NoVerify,
    )
    .unwrap();

    let (url, _) = strategy.authorize_url(CsrfToken::new_random);
    let params = url.query_pairs().into_owned().collect::<HashMap<_, _>>();
    assert_eq!("publicData esi-skills.read_skills.v1", params["scope"]);
}

#[test]
fn test_user_profile_request() {
    let strategy = EveStrategy::new(
        options().add_custom_header("X-Request-Source", "login"),
        accept_nobody as NoVerify,
    )
    .unwrap();

    let request = strategy
        .user_profile_request(&AccessToken::new("uNEEh8oT3ku-8pMAE3ctqw".to_string()))
        .unwrap();

    assert_eq!(Method::GET, request.method());
    assert_eq!(
        "https://login.eveonline.com/oauth/verify",
        request.uri().to_string()
    );
    assert_eq!(None, request.uri().query());
    assert_eq!(
        "Bearer uNEEh8oT3ku-8pMAE3ctqw",
        request.headers()[AUTHORIZATION]
    );
    assert_eq!("application/json", request.headers()[ACCEPT]);
    assert_eq!("3rdpartysite.com", request.headers()[USER_AGENT]);
    assert_eq!("login", request.headers()["x-request-source"]);
    assert!(request.body().is_empty());
}

#[test]
fn test_user_profile() {
    let strategy = strategy();
    let seen = RefCell::new(Vec::new());
    let http_client = |request: HttpRequest| -> Result<HttpResponse, IoError> {
        let response = sso_response(&request);
        seen.borrow_mut().push(request);
        Ok(response)
    };

    let profile = strategy
        .user_profile(
            &AccessToken::new("uNEEh8oT3ku-8pMAE3ctqw".to_string()),
            &http_client,
        )
        .unwrap();

    assert_eq!("eve", profile.provider());
    assert_eq!("12345678", profile.id().unwrap().as_str());
    assert_eq!("Test Pilot", profile.name().unwrap().as_str());
    assert_eq!(
        Some(&Scopes::Delimited("publicData".to_string())),
        profile.scopes()
    );
    assert_eq!(TEST_PILOT_JSON, profile.raw());
    assert_eq!(
        &serde_json::from_str::<serde_json::Value>(TEST_PILOT_JSON).unwrap(),
        profile.json()
    );

    let seen = seen.into_inner();
    assert_eq!(1, seen.len());
    assert_eq!(
        "Bearer uNEEh8oT3ku-8pMAE3ctqw",
        seen[0].headers()[AUTHORIZATION]
    );
}

#[test]
fn test_user_profile_not_json() {
    let http_client = |_: HttpRequest| -> Result<HttpResponse, IoError> {
        Ok(http::Response::builder()
            .status(200)
            .header(CONTENT_TYPE, "text/html")
            .body(b"<html>maintenance</html>".to_vec())
            .unwrap())
    };

    match strategy().user_profile(&AccessToken::new("token".to_string()), &http_client) {
        Err(UserProfileError::Parse(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_user_profile_transport_failure() {
    let http_client = |_: HttpRequest| -> Result<HttpResponse, IoError> { Err(connection_refused()) };

    match strategy().user_profile(&AccessToken::new("token".to_string()), &http_client) {
        Err(UserProfileError::Fetch(FetchError::Request(err))) => {
            assert_eq!(ErrorKind::ConnectionRefused, err.kind())
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_user_profile_invalid_access_token() {
    let requested = RefCell::new(false);
    let http_client = |request: HttpRequest| -> Result<HttpResponse, IoError> {
        *requested.borrow_mut() = true;
        Ok(sso_response(&request))
    };

    match strategy().user_profile(&AccessToken::new("bad\ntoken".to_string()), &http_client) {
        Err(UserProfileError::Other(message)) => {
            assert!(message.starts_with("failed to prepare request"))
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!requested.into_inner());
}

#[test]
fn test_user_profile_error_status() {
    let http_client = |_: HttpRequest| -> Result<HttpResponse, IoError> {
        Ok(json_response(
            401,
            "{\"error\":\"invalid_token\",\"error_description\":\"The authorization header is not set\"}",
        ))
    };

    match strategy().user_profile(&AccessToken::new("expired".to_string()), &http_client) {
        Err(UserProfileError::Fetch(FetchError::Response(status, body, message))) => {
            assert_eq!(StatusCode::UNAUTHORIZED, status);
            assert!(String::from_utf8(body).unwrap().contains("invalid_token"));
            assert_eq!(
                "HTTP status code 401 Unauthorized at https://login.eveonline.com/oauth/verify",
                message
            );
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_user_profile_async() {
    let strategy = strategy();
    let http_client =
        |request: HttpRequest| std::future::ready(Ok::<_, IoError>(sso_response(&request)));

    let profile = strategy
        .user_profile_async(&AccessToken::new("token".to_string()), &http_client)
        .await
        .unwrap();
    assert_eq!("abc123", profile.character_owner_hash().unwrap().as_str());

    let failing = |_: HttpRequest| std::future::ready(Err::<HttpResponse, _>(connection_refused()));
    match strategy
        .user_profile_async(&AccessToken::new("token".to_string()), &failing)
        .await
    {
        Err(UserProfileError::Fetch(FetchError::Request(_))) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[derive(Debug, Error)]
#[error("character is banned")]
struct Banned;

fn verify_character(
    token_response: &BasicTokenResponse,
    profile: &UserProfile,
) -> Result<Option<String>, Banned> {
    assert_eq!("uNEEh8oT3ku-8pMAE3ctqw", token_response.access_token().secret());
    match profile.id().map(|id| id.as_str()) {
        Some("12345678") => Ok(Some(format!("user:{}", profile.name().unwrap().as_str()))),
        Some("66666666") => Err(Banned),
        _ => Ok(None),
    }
}

#[test]
fn test_authenticate() {
    let strategy = EveStrategy::new(options(), verify_character).unwrap();
    let seen = RefCell::new(Vec::new());
    let http_client = |request: HttpRequest| -> Result<HttpResponse, IoError> {
        let response = sso_response(&request);
        seen.borrow_mut().push(request);
        Ok(response)
    };

    let authentication = strategy
        .authenticate(AuthorizationCode::new("AUTHCODE".to_string()), &http_client)
        .unwrap();
    assert_eq!(
        Authentication::Authenticated("user:Test Pilot".to_string()),
        authentication
    );

    let seen = seen.into_inner();
    assert_eq!(2, seen.len());

    let token_request = &seen[0];
    assert_eq!(Method::POST, token_request.method());
    assert_eq!(
        "https://login.eveonline.com/oauth/token",
        token_request.uri().to_string()
    );
    assert_eq!("3rdpartysite.com", token_request.headers()[USER_AGENT]);
    assert!(token_request.headers()[AUTHORIZATION]
        .to_str()
        .unwrap()
        .starts_with("Basic "));
    let token_body = String::from_utf8(token_request.body().clone()).unwrap();
    assert!(token_body.contains("grant_type=authorization_code"));
    assert!(token_body.contains("code=AUTHCODE"));

    let profile_request = &seen[1];
    assert_eq!(Method::GET, profile_request.method());
    assert_eq!(
        "Bearer uNEEh8oT3ku-8pMAE3ctqw",
        profile_request.headers()[AUTHORIZATION]
    );
    assert_eq!("3rdpartysite.com", profile_request.headers()[USER_AGENT]);
}

#[test]
fn test_authenticate_rejected_and_verify_error() {
    let strategy = EveStrategy::new(options(), verify_character).unwrap();

    let unknown = |request: HttpRequest| -> Result<HttpResponse, IoError> {
        match request.uri().path() {
            "/oauth/verify" => Ok(json_response(200, "{\"CharacterID\":90000001}")),
            _ => Ok(sso_response(&request)),
        }
    };
    assert_eq!(
        Authentication::Rejected,
        strategy
            .authenticate(AuthorizationCode::new("AUTHCODE".to_string()), &unknown)
            .unwrap()
    );

    let banned = |request: HttpRequest| -> Result<HttpResponse, IoError> {
        match request.uri().path() {
            "/oauth/verify" => Ok(json_response(200, "{\"CharacterID\":\"66666666\"}")),
            _ => Ok(sso_response(&request)),
        }
    };
    match strategy.authenticate(AuthorizationCode::new("AUTHCODE".to_string()), &banned) {
        Err(AuthenticateError::Verify(Banned)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_authenticate_token_exchange_failure() {
    let strategy = EveStrategy::new(options(), verify_character).unwrap();
    let profile_requested = RefCell::new(false);
    let http_client = |request: HttpRequest| -> Result<HttpResponse, IoError> {
        match request.uri().path() {
            "/oauth/token" => Ok(json_response(
                400,
                "{\"error\":\"invalid_grant\",\"error_description\":\"Authorization code is invalid\"}",
            )),
            _ => {
                *profile_requested.borrow_mut() = true;
                Ok(sso_response(&request))
            }
        }
    };

    match strategy.authenticate(AuthorizationCode::new("STALE".to_string()), &http_client) {
        Err(AuthenticateError::TokenExchange(RequestTokenError::ServerResponse(err))) => {
            assert_eq!("invalid_grant", err.error().as_ref());
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!profile_requested.into_inner());
}

#[test]
fn test_authenticate_profile_failure() {
    let strategy = EveStrategy::new(options(), verify_character).unwrap();
    let http_client = |request: HttpRequest| -> Result<HttpResponse, IoError> {
        match request.uri().path() {
            "/oauth/verify" => Err(connection_refused()),
            _ => Ok(sso_response(&request)),
        }
    };

    match strategy.authenticate(AuthorizationCode::new("AUTHCODE".to_string()), &http_client) {
        Err(AuthenticateError::UserProfile(UserProfileError::Fetch(FetchError::Request(_)))) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_authenticate_async() {
    let strategy = EveStrategy::new(options(), verify_character).unwrap();
    let seen = RefCell::new(Vec::new());
    let http_client = |request: HttpRequest| {
        seen.borrow_mut().push(request.headers().get(USER_AGENT).cloned());
        std::future::ready(Ok::<_, IoError>(sso_response(&request)))
    };

    let authentication = strategy
        .authenticate_async(AuthorizationCode::new("AUTHCODE".to_string()), &http_client)
        .await
        .unwrap();
    assert_eq!(
        Authentication::Authenticated("user:Test Pilot".to_string()),
        authentication
    );

    let seen = seen.into_inner();
    assert_eq!(2, seen.len());
    assert!(seen
        .iter()
        .all(|user_agent| user_agent.as_ref().unwrap() == "3rdpartysite.com"));
}

#[test]
fn test_debug_omits_secrets() {
    let debug = format!("{:?}", strategy());
    assert!(debug.starts_with("EveStrategy"));
    assert!(!debug.contains("jkfopwkmif90e0womkepowe9irkjo3p9mkfwe"));
}
