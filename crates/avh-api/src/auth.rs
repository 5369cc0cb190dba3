// API token authentication
//
// `POST v1/auth/login` exchanges the long-lived API token for a
// short-lived access token, kept in the client for later requests.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{AvhClient, handle_response, parse_error};
use crate::error::Error;

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    expiration: Option<DateTime<Utc>>,
}

/// Outcome of a successful login. The token itself stays inside the client.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub expires_at: Option<DateTime<Utc>>,
}

impl AvhClient {
    /// Authenticate with an API token.
    ///
    /// `POST v1/auth/login` with `{ "apiToken": ... }`. On success the
    /// returned access token is attached to every subsequent request.
    /// Only 400/401/403 count as a rejected token; any other failure
    /// status is an [`Error::Api`].
    pub async fn login(&self, api_token: &SecretString) -> Result<Session, Error> {
        let url = self.url("v1/auth/login")?;
        debug!("logging in at {url}");

        let body = json!({ "apiToken": api_token.expose_secret() });
        let resp = self.http().post(url).json(&body).send().await?;

        let status = resp.status();
        if is_token_rejection(status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }

        let login: LoginResponse = handle_response(resp).await?;
        self.set_access_token(SecretString::from(login.token));

        debug!(expires_at = ?login.expiration, "login successful");
        Ok(Session {
            expires_at: login.expiration,
        })
    }
}

/// Statuses the login endpoint uses to refuse an API token.
fn is_token_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    )
}
