//! HTTP execution: plain GET calls, streamed media responses, multipart
//! uploads, cookie preservation and cooperative cancellation.

use crate::error::{Result, SynoError};
use crate::host::HostAddress;
use crate::request::{ApiRequest, WEBAPI_PREFIX};
use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt, stream};
use log::debug;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Proxy, Url};
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Settings used to build the underlying `reqwest::Client`
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Skip TLS certificate validation. Stations commonly serve self-signed
    /// certificates; this is opt-in.
    pub accept_invalid_certs: bool,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            accept_invalid_certs: false,
            proxy: None,
            user_agent: format!("syno-station/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Cookie jar owned by one client instance.
///
/// Wraps a `reqwest::cookie::Jar` that can be swapped for an empty one,
/// which logout requires.
#[derive(Debug)]
pub struct SessionCookies {
    /// URL below which every station call is made
    station: Url,
    jar: RwLock<Arc<Jar>>,
}

impl SessionCookies {
    /// Creates an empty jar for the station at `base`
    ///
    /// # Errors
    ///
    /// Returns [`SynoError::Configuration`] if `base` cannot address `webapi/`.
    pub fn new(base: &HostAddress) -> Result<Self> {
        let station = base
            .url()
            .join(&format!("{WEBAPI_PREFIX}/"))
            .map_err(|e| SynoError::Configuration(format!("invalid base address {base}: {e}")))?;
        Ok(Self {
            station,
            jar: RwLock::new(Arc::new(Jar::default())),
        })
    }

    fn current(&self) -> Arc<Jar> {
        Arc::clone(&self.jar.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Drops every stored cookie
    pub fn clear(&self) {
        *self.jar.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(Jar::default());
        debug!("Cookie jar cleared");
    }

    /// `true` if no cookie would be sent to the station
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current().cookies(&self.station).is_none()
    }

    /// Value of cookie `name` as it would be sent to the station
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let header = self.current().cookies(&self.station)?;
        header
            .to_str()
            .ok()?
            .split("; ")
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.current().set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.current().cookies(url)
    }
}

/// Executes requests against one station
#[derive(Debug)]
pub struct Transport {
    http: Client,
    base: HostAddress,
    cookies: Arc<SessionCookies>,
}

impl Transport {
    /// Creates a transport for `base`
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the HTTP client cannot be built.
    pub fn new(base: HostAddress, config: &TransportConfig) -> Result<Self> {
        let cookies = Arc::new(SessionCookies::new(&base)?);
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .cookie_provider(Arc::clone(&cookies));

        if config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| SynoError::Configuration(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| SynoError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            cookies,
        })
    }

    #[must_use]
    pub fn base(&self) -> &HostAddress {
        &self.base
    }

    #[must_use]
    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    /// Full URL of `request`
    #[must_use]
    pub fn url(&self, request: &ApiRequest) -> String {
        format!("{}/{}", self.base, request.encode())
    }

    /// Builds the GET request for `request` without sending it, for callers
    /// that fetch and stream large media themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built.
    pub fn prepare(&self, request: &ApiRequest) -> Result<reqwest::Request> {
        Ok(self.http.get(self.url(request)).build()?)
    }

    /// Sends a prepared request and hands back the live response
    ///
    /// # Errors
    ///
    /// Returns [`SynoError::Canceled`] if `cancel` fires first and
    /// [`SynoError::Transport`] for network failures and non-success statuses.
    pub async fn send(
        &self,
        request: reqwest::Request,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        debug!("Sending {} {}", request.method(), redact(request.url()));
        let response = cancellable(cancel, self.http.execute(request)).await?;
        debug!("API request status: {}", response.status());
        Ok(response.error_for_status()?)
    }

    /// GET `request` and return the full body
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn execute(&self, request: &ApiRequest, cancel: &CancellationToken) -> Result<Bytes> {
        let response = self.send(self.prepare(request)?, cancel).await?;
        cancellable(cancel, response.bytes()).await
    }

    /// GET `request` and return the response with its body unread
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn open(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<MediaStream> {
        let response = self.send(self.prepare(request)?, cancel).await?;
        Ok(MediaStream { response })
    }

    /// POST `request` as `multipart/form-data` with the file read from `file`
    ///
    /// Head parameters and the session token stay in the query string; every
    /// free-form parameter becomes a text part, and the file follows as the
    /// final `application/octet-stream` part named `field_name`.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn execute_multipart<R>(
        &self,
        request: &ApiRequest,
        file_name: &str,
        field_name: &str,
        file: R,
        cancel: &CancellationToken,
    ) -> Result<Bytes>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        let encoder = MultipartEncoder::new(request, field_name, file_name);
        let url = format!("{}/{}", self.base, request.encode_head());
        let content_type = encoder.content_type();

        let body = stream::iter([Ok::<_, std::io::Error>(encoder.preamble())])
            .chain(ReaderStream::new(file))
            .chain(stream::iter([Ok(encoder.epilogue())]));

        let http_request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(reqwest::Body::wrap_stream(body))
            .build()?;

        let response = self.send(http_request, cancel).await?;
        cancellable(cancel, response.bytes()).await
    }
}

/// Live response whose body has not been read yet
#[derive(Debug)]
pub struct MediaStream {
    response: reqwest::Response,
}

impl MediaStream {
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// `true` if the server answered with an envelope instead of media
    #[must_use]
    pub fn is_envelope(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.starts_with("application/json") || ct.starts_with("text/json"))
    }

    #[must_use]
    pub fn into_response(self) -> reqwest::Response {
        self.response
    }

    /// Body chunks as they arrive
    pub fn bytes_stream(self) -> impl Stream<Item = Result<Bytes>> {
        self.response.bytes_stream().map_err(SynoError::from)
    }

    /// Reads the whole body
    ///
    /// # Errors
    ///
    /// Returns [`SynoError::Canceled`] if `cancel` fires first.
    pub async fn bytes(self, cancel: &CancellationToken) -> Result<Bytes> {
        cancellable(cancel, self.response.bytes()).await
    }
}

/// Frames `multipart/form-data` the way the station parser expects:
/// disposition names and file names are written unquoted.
#[derive(Debug, Clone)]
pub struct MultipartEncoder {
    boundary: String,
    preamble: Bytes,
}

impl MultipartEncoder {
    #[must_use]
    pub fn new(request: &ApiRequest, field_name: &str, file_name: &str) -> Self {
        Self::with_boundary(
            format!("----syno{}", uuid::Uuid::new_v4().simple()),
            request,
            field_name,
            file_name,
        )
    }

    #[must_use]
    pub fn with_boundary(
        boundary: String,
        request: &ApiRequest,
        field_name: &str,
        file_name: &str,
    ) -> Self {
        let mut preamble = String::new();
        for (name, value) in request.params() {
            preamble.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name={name}\r\n\r\n{value}\r\n"
            ));
        }
        preamble.push_str(&format!(
            "--{boundary}\r\nContent-Type: application/octet-stream\r\n\
             Content-Disposition: form-data; name={field_name}; filename={file_name}\r\n\r\n"
        ));
        Self {
            boundary,
            preamble: Bytes::from(preamble),
        }
    }

    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Text parts plus the header of the file part
    #[must_use]
    pub fn preamble(&self) -> Bytes {
        self.preamble.clone()
    }

    /// Terminates the file part and the body
    #[must_use]
    pub fn epilogue(&self) -> Bytes {
        Bytes::from(format!("\r\n--{}--\r\n", self.boundary))
    }
}

/// Runs `fut` until it completes or `cancel` fires.
///
/// An aborted transfer usually surfaces as a generic transport error, so a
/// failure observed while `cancel` is set is reported as [`SynoError::Canceled`].
///
/// # Errors
///
/// Returns [`SynoError::Canceled`] or [`SynoError::Transport`].
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = reqwest::Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(SynoError::Canceled);
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("Request aborted by cancellation");
            Err(SynoError::Canceled)
        }
        result = fut => result.map_err(|e| reclassify(e, cancel)),
    }
}

fn reclassify(error: reqwest::Error, cancel: &CancellationToken) -> SynoError {
    if cancel.is_cancelled() {
        debug!("Transport failure after cancellation, reporting as canceled: {error}");
        SynoError::Canceled
    } else {
        SynoError::Transport(error)
    }
}

/// URL for logging, with secrets masked
fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let masked = matches!(k.as_ref(), "_sid" | "passwd" | "otp_code" | "__cIpHeRtExT");
            (k.into_owned(), if masked { "***".into() } else { v.into_owned() })
        })
        .collect();
    if pairs.is_empty() {
        return redacted.to_string();
    }
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
