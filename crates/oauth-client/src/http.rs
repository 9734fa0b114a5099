//! HTTP capability consumed by the client
//!
//! The protocol code only needs a form POST and a GET with headers. Both
//! return a boxed future so the trait stays dyn-compatible (`Arc<dyn HttpClient>`).
//!
//! Two error modes are supported, mirroring common HTTP client conventions:
//! - `http_errors = false`: non-2xx responses come back as ordinary `HttpResponse`s
//! - `http_errors = true`: non-2xx responses are raised as `Error::Transport`
//!
//! The client handles both identically: either way a non-2xx ends up as a
//! transport error carrying the status reason phrase.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Status and raw body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Boxed future returned by `HttpClient` methods.
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'a>>;

/// Outbound HTTP capability.
///
/// Implementations enforce their own timeout and report expiry, connection
/// failures and (in `http_errors` mode) non-2xx statuses as `Error::Transport`.
pub trait HttpClient: Send + Sync {
    /// POST an `application/x-www-form-urlencoded` body.
    fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(&'a str, &'a str)]) -> HttpFuture<'a>;

    /// GET with extra request headers.
    fn get<'a>(&'a self, url: &'a Url, headers: &'a [(&'a str, &'a str)]) -> HttpFuture<'a>;
}

/// Human-readable reason for a status, e.g. "Unauthorized".
pub fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| status.as_str().to_owned())
}

/// `HttpClient` backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestHttp {
    client: reqwest::Client,
    http_errors: bool,
}

impl ReqwestHttp {
    /// Build a client with the given timeout. TLS certificates are always verified.
    pub fn new(timeout: Duration, http_errors: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {e}")))?;
        Ok(Self::with_client(client, http_errors))
    }

    /// Wrap an existing `reqwest::Client` (shares its connection pool).
    pub fn with_client(client: reqwest::Client, http_errors: bool) -> Self {
        Self {
            client,
            http_errors,
        }
    }

    async fn finish(
        &self,
        sent: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<HttpResponse> {
        let response = sent.map_err(|e| {
            if e.is_timeout() {
                Error::Transport("request timed out".into())
            } else {
                Error::Transport(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), "received response");
        if self.http_errors && !status.is_success() {
            return Err(Error::Transport(reason_phrase(status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("reading response body: {e}")))?;
        Ok(HttpResponse { status, body })
    }
}

impl HttpClient for ReqwestHttp {
    fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(&'a str, &'a str)]) -> HttpFuture<'a> {
        Box::pin(async move {
            let sent = self.client.post(url.clone()).form(form).send().await;
            self.finish(sent).await
        })
    }

    fn get<'a>(&'a self, url: &'a Url, headers: &'a [(&'a str, &'a str)]) -> HttpFuture<'a> {
        Box::pin(async move {
            let mut request = self.client.get(url.clone());
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            let sent = request.send().await;
            self.finish(sent).await
        })
    }
}
