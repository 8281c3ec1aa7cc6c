//!
//! This example showcases the process of logging in with the
//! [EVE Online SSO](https://developers.eveonline.com/).
//!
//! Before running it, you'll need to register an application on the EVE developers site with
//! `http://localhost:8080` as its callback URL.
//!
//! In order to run the example call:
//!
//! ```sh
//! EVE_CLIENT_ID=xxx EVE_CLIENT_SECRET=yyy EVE_USER_AGENT="my-app (me@example.com)" \
//!     cargo run --example eve_login --features reqwest-blocking
//! ```
//!
//! ...and follow the instructions.
//!

use eve_oauth::reqwest;
use eve_oauth::{
    AuthorizationResponse, Authentication, BasicTokenResponse, ClientId, ClientSecret, CsrfToken,
    EveStrategy, RedirectUrl, Scope, StrategyOptions, TokenResponse, UserProfile,
};
use url::Url;

use std::convert::Infallible;
use std::env;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::process::exit;

fn handle_error<T: std::error::Error>(fail: &T, msg: &'static str) {
    let mut err_msg = format!("ERROR: {}", msg);
    let mut cur_fail: Option<&dyn std::error::Error> = Some(fail);
    while let Some(cause) = cur_fail {
        err_msg += &format!("\n    caused by: {}", cause);
        cur_fail = cause.source();
    }
    println!("{}", err_msg);
    exit(1);
}

// Accepts every character; a real application would look up or create its own user here.
fn verify(
    token_response: &BasicTokenResponse,
    profile: &UserProfile,
) -> Result<Option<String>, Infallible> {
    println!(
        "EVE SSO returned access token expiring in {:?}",
        token_response.expires_in()
    );
    Ok(profile.name().map(|name| name.to_string()))
}

fn main() {
    env_logger::init();

    let client_id = ClientId::new(
        env::var("EVE_CLIENT_ID").expect("Missing the EVE_CLIENT_ID environment variable."),
    );
    let client_secret = ClientSecret::new(
        env::var("EVE_CLIENT_SECRET").expect("Missing the EVE_CLIENT_SECRET environment variable."),
    );

    let mut options = StrategyOptions::new(client_id)
        .set_client_secret(client_secret)
        // This example will be running its own server at localhost:8080.
        // See below for the server implementation.
        .set_callback_url(
            RedirectUrl::new("http://localhost:8080".to_string()).expect("Invalid callback URL"),
        )
        // This example only needs the character's public information.
        .add_scope(Scope::new("publicData".to_string()));
    if let Ok(user_agent) = env::var("EVE_USER_AGENT") {
        options = options.set_user_agent(user_agent);
    }

    let strategy = EveStrategy::new(options, verify).unwrap_or_else(|err| {
        handle_error(&err, "Invalid strategy options");
        unreachable!();
    });

    let http_client = reqwest::blocking::ClientBuilder::new()
        // Following redirects opens the client up to SSRF vulnerabilities.
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|err| {
            handle_error(&err, "Failed to build HTTP client");
            unreachable!();
        });

    // Generate the authorization URL to which we'll redirect the user.
    let (authorize_url, csrf_state) = strategy.authorize_url(CsrfToken::new_random);

    println!("Open this URL in your browser:\n{}\n", authorize_url);

    // A very naive implementation of the redirect server.
    let listener = TcpListener::bind("127.0.0.1:8080").unwrap();

    // Accept one connection
    let (mut stream, _) = listener.accept().unwrap();

    let mut reader = BufReader::new(&stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();

    let redirect_url = request_line.split_whitespace().nth(1).unwrap();
    let url = Url::parse(&("http://localhost".to_string() + redirect_url)).unwrap();

    let callback = AuthorizationResponse::from_url(&url);

    let message = "Go back to your terminal :)";
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{}",
        message.len(),
        message
    );
    stream.write_all(response.as_bytes()).unwrap();

    let code = callback.into_code(&csrf_state).unwrap_or_else(|err| {
        handle_error(&err, "EVE SSO redirect failed");
        unreachable!();
    });

    // Exchange the code for a token, fetch the character, and run the verify callback.
    match strategy.authenticate(code, &http_client) {
        Ok(Authentication::Authenticated(name)) => println!("Logged in as {}", name),
        Ok(Authentication::Rejected) => println!("Character was rejected"),
        Err(err) => handle_error(&err, "Failed to authenticate"),
    }
}
