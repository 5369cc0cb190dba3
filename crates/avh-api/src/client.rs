// REST API HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, bearer-token injection,
// and error-body parsing. Endpoint groups (instances, images, ...) are
// inherent methods in their own modules; this one only does transport.

use std::sync::{PoisonError, RwLock};

use reqwest::multipart::Form;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the AVH REST API.
///
/// Endpoints live under `{base}/v1/`. Every call except [`login`] sends
/// the access token obtained by `login` as a bearer token.
///
/// [`login`]: AvhClient::login
pub struct AvhClient {
    http: reqwest::Client,
    base_url: Url,
    access_token: RwLock<Option<SecretString>>,
}

impl AvhClient {
    /// Build a client for `endpoint` (e.g. `https://app.avh.arm.com/api`).
    pub fn new(endpoint: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(endpoint, http)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(endpoint: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(endpoint)?,
            access_token: RwLock::new(None),
        })
    }

    /// The API root, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether `login` has stored an access token.
    pub fn is_authenticated(&self) -> bool {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn set_access_token(&self, token: SecretString) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"v1/projects"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Append path segments to the base URL, percent-encoding each one.
    ///
    /// Use this when a segment comes from service data (a model key) and
    /// may contain `/`, `?` or `#`.
    pub(crate) fn url_from_segments(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        let guard = self
            .access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let token = guard.as_ref().ok_or(Error::NotAuthenticated)?;
        Ok(builder.bearer_auth(token.expose_secret()))
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.get_url(self.url(path)?).await
    }

    pub(crate) async fn get_url<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");

        let resp = self.authorize(self.http.get(url))?.send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.authorize(self.http.post(url))?.json(body).send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn post_empty(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.authorize(self.http.post(url))?.send().await?;
        handle_empty(resp).await
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url} (multipart)");

        let resp = self.authorize(self.http.post(url))?.multipart(form).send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.authorize(self.http.put(url))?.json(body).send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.authorize(self.http.delete(url))?.send().await?;
        handle_empty(resp).await
    }
}

/// Ensure the base URL ends in `/` so relative joins append instead of
/// replacing the last path segment.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}

// ── Response handling ────────────────────────────────────────────────

pub(crate) async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error(status, resp).await)
    }
}

pub(crate) async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::TokenRejected;
    }

    let raw = resp.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorResponse>(&raw) {
        Ok(err) => Error::Api {
            status: status.as_u16(),
            message: err
                .error
                .or(err.message)
                .unwrap_or_else(|| status.to_string()),
            code: err.code,
        },
        Err(_) => Error::Api {
            status: status.as_u16(),
            message: if raw.is_empty() { status.to_string() } else { raw },
            code: None,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("https://arm.corellium.io/api").unwrap();
        assert_eq!(url.as_str(), "https://arm.corellium.io/api/");
        assert_eq!(
            url.join("v1/projects").unwrap().as_str(),
            "https://arm.corellium.io/api/v1/projects"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_idempotent() {
        let url = normalize_base_url("https://app.avh.arm.com/api/").unwrap();
        assert_eq!(url.as_str(), "https://app.avh.arm.com/api/");
    }

    #[test]
    fn path_segments_are_escaped() {
        let client =
            AvhClient::from_reqwest("https://arm.corellium.io/api", reqwest::Client::new())
                .unwrap();

        let url = client
            .url_from_segments(&["v1", "models", "efr32/mg24?rev#2", "software"])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://arm.corellium.io/api/v1/models/efr32%2Fmg24%3Frev%232/software"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        assert!(matches!(
            normalize_base_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn authenticated_calls_fail_before_login() {
        let client = AvhClient::from_reqwest("http://127.0.0.1:9", reqwest::Client::new()).unwrap();
        assert!(!client.is_authenticated());

        let result: Result<serde_json::Value, Error> = client.get("v1/projects").await;
        assert!(matches!(result, Err(Error::NotAuthenticated)));
    }
}
