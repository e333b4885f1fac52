//! Google sign-in through the OAuth2 authorization-code flow with a loopback redirect.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;

use oauth2::{
    basic::BasicClient, reqwest::http_client, AuthUrl, AuthorizationCode, ClientId, ClientSecret,
    CsrfToken, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use tracing::{debug, info};

use super::{Authorization, IdentityProvider};
use crate::config::GoogleConfig;
use crate::error::AuthError;
use crate::models::Session;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

// Embedded at build time when set in the build environment
const BUILD_CLIENT_ID: Option<&str> = option_env!("GOOGLE_CLIENT_ID");
const BUILD_CLIENT_SECRET: Option<&str> = option_env!("GOOGLE_CLIENT_SECRET");

pub const PROVIDER_GOOGLE: &str = "google";

pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
}

impl GoogleProvider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// Credentials from config (environment overrides already applied), else
    /// the values embedded at build time.
    pub fn from_config(config: &GoogleConfig) -> Result<Self, AuthError> {
        let client_id = config
            .client_id
            .clone()
            .or_else(|| BUILD_CLIENT_ID.map(String::from))
            .ok_or_else(|| {
                AuthError::NotConfigured(
                    "Google client ID not configured. Set GOOGLE_CLIENT_ID or google.client_id in the config file".into(),
                )
            })?;
        let client_secret = config
            .client_secret
            .clone()
            .or_else(|| BUILD_CLIENT_SECRET.map(String::from))
            .ok_or_else(|| {
                AuthError::NotConfigured(
                    "Google client secret not configured. Set GOOGLE_CLIENT_SECRET or google.client_secret in the config file".into(),
                )
            })?;
        Ok(Self::new(client_id, client_secret))
    }

    fn client(&self, redirect_uri: String) -> Result<BasicClient, AuthError> {
        let client = BasicClient::new(
            ClientId::new(self.client_id.clone()),
            Some(ClientSecret::new(self.client_secret.clone())),
            AuthUrl::new(AUTH_URL.to_string()).map_err(provider_error)?,
            Some(TokenUrl::new(TOKEN_URL.to_string()).map_err(provider_error)?),
        )
        .set_redirect_uri(RedirectUrl::new(redirect_uri).map_err(provider_error)?);
        Ok(client)
    }
}

impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_GOOGLE
    }

    fn authorize(&self) -> Result<Authorization, AuthError> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let client = self.client(format!("http://127.0.0.1:{}", port))?;

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .url();

        println!("\nOpening browser for Google sign-in...\n");
        if webbrowser::open(auth_url.as_str()).is_err() {
            println!("Could not open browser automatically.");
            println!("Please open this URL manually:\n");
            println!("{}\n", auth_url);
        }
        println!("Waiting for authorization...");
        debug!(port, "waiting for oauth callback");

        let (code, received_state) = wait_for_callback(&listener)?;
        if received_state != *csrf_token.secret() {
            return Err(AuthError::CsrfMismatch);
        }

        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .request(http_client)
            .map_err(|e| AuthError::Provider(format!("token exchange failed: {}", e)))?;

        let access_token = token.access_token().secret().to_string();
        let refresh_token = token.refresh_token().map(|t| t.secret().to_string());
        let email = fetch_email(&access_token)?;
        info!(%email, "google authorization complete");

        Ok(Authorization {
            email,
            access_token: Some(access_token),
            refresh_token,
        })
    }

    fn revoke(&self, session: &Session) -> Result<(), AuthError> {
        let Some(token) = session
            .refresh_token
            .as_deref()
            .or(session.access_token.as_deref())
        else {
            return Ok(());
        };

        let response = reqwest::blocking::Client::new()
            .post(REVOKE_URL)
            .form(&[("token", token)])
            .send()
            .map_err(provider_error)?;
        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "revoke returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

fn provider_error<E: std::fmt::Display>(e: E) -> AuthError {
    AuthError::Provider(e.to_string())
}

/// Extract `(code, state)` from the first line of the redirect request,
/// e.g. `GET /?state=abc&code=xyz HTTP/1.1`.
pub fn parse_callback_request(request_line: &str) -> Result<(String, String), AuthError> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| AuthError::Provider("invalid callback request".into()))?;

    let url = url::Url::parse(&format!("http://localhost{}", target)).map_err(provider_error)?;
    let params: HashMap<_, _> = url.query_pairs().collect();

    if let Some(error) = params.get("error") {
        return Err(AuthError::Provider(format!("authorization denied: {}", error)));
    }
    let code = params
        .get("code")
        .ok_or_else(|| AuthError::Provider("no authorization code received".into()))?
        .to_string();
    let state = params
        .get("state")
        .ok_or_else(|| AuthError::Provider("no state parameter received".into()))?
        .to_string();
    Ok((code, state))
}

fn wait_for_callback(listener: &TcpListener) -> Result<(String, String), AuthError> {
    let (mut stream, _) = listener.accept()?;
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line)?;

    let result = parse_callback_request(&request_line);
    let body = match &result {
        Ok(_) => "<h1>Signed in</h1><p>You can close this window and return to ideacanvas.</p>",
        Err(_) => "<h1>Sign-in failed</h1><p>Return to ideacanvas for details.</p>",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html\r\n\
         Connection: close\r\n\r\n\
         <html><body style=\"font-family: system-ui; text-align: center; padding: 50px;\">{}</body></html>",
        body
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()?;

    result
}

fn fetch_email(access_token: &str) -> Result<String, AuthError> {
    let response = reqwest::blocking::Client::new()
        .get(USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .map_err(provider_error)?;

    if !response.status().is_success() {
        return Err(AuthError::Provider(format!(
            "failed to get user info: {}",
            response.status()
        )));
    }

    let json: serde_json::Value = response.json().map_err(provider_error)?;
    json["email"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AuthError::Provider("email not found in user info".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_request() {
        let (code, state) =
            parse_callback_request("GET /?state=s%20t&code=4%2F0Ab HTTP/1.1\r\n").unwrap();
        assert_eq!(code, "4/0Ab");
        assert_eq!(state, "s t");
    }

    #[test]
    fn test_parse_callback_request_errors() {
        assert!(parse_callback_request("").is_err());
        assert!(parse_callback_request("GET /?state=abc HTTP/1.1").is_err());
        assert!(matches!(
            parse_callback_request("GET /?error=access_denied&state=abc HTTP/1.1"),
            Err(AuthError::Provider(msg)) if msg.contains("access_denied")
        ));
    }

    #[test]
    fn test_from_config_prefers_configured_values() {
        let config = GoogleConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
        };
        let provider = GoogleProvider::from_config(&config).unwrap();
        assert_eq!(provider.client_id, "id");
        assert_eq!(provider.name(), PROVIDER_GOOGLE);
    }
}
