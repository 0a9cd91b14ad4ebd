//! JSON-over-HTTP client shared by every resource
//!
//! Every failure comes back as a [`FetchError`]: transport problems as
//! `Network`, non-2xx answers as `Status` (message taken from the body's
//! `error` field when the server sent one), undecodable bodies as `Decode`.

use crate::session::SessionProvider;
use opsdeck_query::FetchError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Query string pairs
pub type QueryPairs = Vec<(&'static str, String)>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Shared HTTP client bound to a session
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    session: Arc<dyn SessionProvider>,
}

impl ApiClient {
    /// Client reading tenant and token from `session`
    pub fn new(session: Arc<dyn SessionProvider>) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Unavailable(format!("http client: {e}")))?;
        Ok(Self { http, session })
    }

    /// `{api_url}/api` of the current tenant
    pub fn base_url(&self) -> Result<String, FetchError> {
        let tenant = self.session.tenant();
        let api_url = tenant.api_url.trim().trim_end_matches('/');
        if api_url.is_empty() {
            return Err(FetchError::Unavailable("no API url configured".into()));
        }
        Ok(format!("{api_url}/api"))
    }

    /// GET `path` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryPairs,
    ) -> Result<T, FetchError> {
        let request = self.request(Method::GET, path)?.query(query);
        let response = send(request).await?;
        let body = response.bytes().await.map_err(network)?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// PUT a JSON body to `path`, ignoring the response body
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), FetchError> {
        let request = self.request(Method::PUT, path)?.json(body);
        send(request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, FetchError> {
        let url = format!("{}{path}", self.base_url()?);
        tracing::trace!(%method, %url, "api request");

        let mut request = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.session.bearer_token() {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url().ok())
            .finish_non_exhaustive()
    }
}

async fn send(request: RequestBuilder) -> Result<Response, FetchError> {
    let response = request.send().await.map_err(network)?;
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

async fn status_error(response: Response) -> FetchError {
    let status = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| {
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        });
    FetchError::status(status.as_u16(), message)
}

fn network(err: reqwest::Error) -> FetchError {
    FetchError::Network(err.to_string())
}
