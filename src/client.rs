use crate::download_station::DownloadStation;
use crate::entities::{EndpointSpec, SessionInfo, SynologyResponse};
use crate::error::{ApplicationError, Result, SynoError};
use crate::host::HostAddress;
use crate::registry::EndpointRegistry;
use crate::request::ApiRequest;
use crate::session::API_AUTH;
use crate::transport::{MediaStream, SessionCookies, Transport, TransportConfig};
use crate::video_station::VideoStation;
use log::debug;
use serde::de::DeserializeOwned;
use std::env;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// The station subsystem a client talks to: the session scope name sent at
/// login/logout and the APIs requested from discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    session_name: String,
    required_apis: Vec<String>,
}

impl Capability {
    /// `SYNO.API.Auth` is always part of the required set
    #[must_use]
    pub fn new<I, S>(session_name: impl Into<String>, required_apis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut apis = vec![API_AUTH.to_string()];
        for api in required_apis {
            let api = api.into();
            if !apis.contains(&api) {
                apis.push(api);
            }
        }
        Self {
            session_name: session_name.into(),
            required_apis: apis,
        }
    }

    #[must_use]
    pub fn video_station() -> Self {
        Self::new(
            crate::video_station::SESSION_NAME,
            crate::video_station::REQUIRED_APIS.iter().copied(),
        )
    }

    #[must_use]
    pub fn download_station() -> Self {
        Self::new(
            crate::download_station::SESSION_NAME,
            crate::download_station::REQUIRED_APIS.iter().copied(),
        )
    }

    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    #[must_use]
    pub fn required_apis(&self) -> &[String] {
        &self.required_apis
    }
}

/// Client for one station on one host
///
/// Token, cookie jar and discovery cache belong to the instance; share it
/// between tasks behind an `Arc`. Changing host means building a new client.
#[derive(Debug)]
pub struct SynoClient {
    pub(crate) transport: Transport,
    pub(crate) registry: EndpointRegistry,
    pub(crate) capability: Capability,
    /// Live session. Authenticated calls hold a read guard for their whole
    /// request; login and logout take the write guard.
    pub(crate) session: RwLock<Option<SessionInfo>>,
}

impl SynoClient {
    /// Creates a new client for `host`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The host string cannot be normalised
    /// - The HTTP client cannot be built (e.g. invalid proxy)
    pub fn new(host: &str, capability: Capability, config: &TransportConfig) -> Result<Self> {
        let base = HostAddress::parse(host)?;
        let transport = Transport::new(base, config)?;
        let registry = EndpointRegistry::new(capability.required_apis().iter().cloned());
        debug!(
            "Created {} client for {}",
            capability.session_name(),
            transport.base()
        );
        Ok(Self {
            transport,
            registry,
            capability,
            session: RwLock::new(None),
        })
    }

    /// Creates a new `SynoClient` with a builder pattern
    #[must_use]
    pub fn builder() -> SynoClientBuilder {
        SynoClientBuilder::default()
    }

    #[must_use]
    pub fn host(&self) -> &HostAddress {
        self.transport.base()
    }

    #[must_use]
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    #[must_use]
    pub fn cookies(&self) -> &SessionCookies {
        self.transport.cookies()
    }

    #[must_use]
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Video Station operations
    #[must_use]
    pub fn video_station(&self) -> VideoStation<'_> {
        VideoStation::new(self)
    }

    /// Download Station operations
    #[must_use]
    pub fn download_station(&self) -> DownloadStation<'_> {
        DownloadStation::new(self)
    }

    /// Current session token, if logged in
    pub async fn session_token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.sid.clone())
    }

    pub async fn session_info(&self) -> Option<SessionInfo> {
        self.session.read().await.clone()
    }

    pub async fn is_authorized(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Resolves `api` through the discovery cache
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails or the server does not provide `api`.
    pub async fn endpoint(&self, api: &str, cancel: &CancellationToken) -> Result<EndpointSpec> {
        self.registry.resolve(&self.transport, api, cancel).await
    }

    /// Starts a request to `api`, addressed to its discovered path and the
    /// supported version closest to `preferred_version`
    ///
    /// # Errors
    ///
    /// See [`Self::endpoint`].
    pub async fn request(
        &self,
        api: &str,
        method: &str,
        preferred_version: u32,
        cancel: &CancellationToken,
    ) -> Result<ApiRequest> {
        let endpoint = self.endpoint(api, cancel).await?;
        Ok(ApiRequest::new(api, method)
            .cgi_path(endpoint.path.clone())
            .version(endpoint.negotiate(preferred_version)))
    }

    /// Sends `request` with the current session and unwraps `data`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or is canceled
    /// - API returns an error response
    /// - Response cannot be parsed
    pub async fn call<D>(&self, request: ApiRequest, cancel: &CancellationToken) -> Result<D>
    where
        D: DeserializeOwned,
    {
        let session = self.session.read().await;
        let request = attach_session(request, session.as_ref());
        let body = self.transport.execute(&request, cancel).await?;
        drop(session);
        SynologyResponse::<D>::decode(&body)?.into_result(request.api())
    }

    /// Sends `request` without a session token
    ///
    /// # Errors
    ///
    /// See [`Self::call`].
    pub async fn call_anonymous<D>(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<D>
    where
        D: DeserializeOwned,
    {
        let body = self.transport.execute(request, cancel).await?;
        SynologyResponse::<D>::decode(&body)?.into_result(request.api())
    }

    /// Sends `request` with the current session and hands back the media
    /// response unread. An envelope answer is decoded and reported as an error.
    ///
    /// # Errors
    ///
    /// See [`Self::call`]. A successful envelope where media was expected is
    /// [`SynoError::InvalidResponse`].
    pub async fn open_stream(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<MediaStream> {
        let session = self.session.read().await;
        let request = attach_session(request, session.as_ref());
        let stream = self.transport.open(&request, cancel).await?;
        drop(session);

        if !stream.is_envelope() {
            return Ok(stream);
        }
        let body = stream.bytes(cancel).await?;
        SynologyResponse::<serde::de::IgnoredAny>::decode(&body)?.into_result(request.api())?;
        Err(SynoError::InvalidResponse(format!(
            "{} returned an envelope instead of media",
            request.api()
        )))
    }

    /// Builds the authenticated GET for `request` without sending it
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built.
    pub async fn prepare_stream(&self, request: ApiRequest) -> Result<reqwest::Request> {
        let session = self.session.read().await;
        self.transport
            .prepare(&attach_session(request, session.as_ref()))
    }

    /// Uploads `file` as a multipart POST with the current session
    ///
    /// # Errors
    ///
    /// See [`Self::call`].
    pub async fn upload<D, R>(
        &self,
        request: ApiRequest,
        file_name: &str,
        field_name: &str,
        file: R,
        cancel: &CancellationToken,
    ) -> Result<D>
    where
        D: DeserializeOwned,
        R: AsyncRead + Send + Sync + 'static,
    {
        let session = self.session.read().await;
        let request = attach_session(request, session.as_ref());
        debug!(
            "Uploading {file_name} as field {field_name} to {}",
            request.api()
        );
        let body = self
            .transport
            .execute_multipart(&request, file_name, field_name, file, cancel)
            .await?;
        drop(session);
        SynologyResponse::<D>::decode(&body)?.into_result(request.api())
    }

    /// Checks that the station answers discovery queries, bypassing the cache
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::ServerUnreachable`] for connect, DNS and
    /// timeout failures; other failures as they occur.
    pub async fn probe(&self, cancel: &CancellationToken) -> Result<()> {
        match self.registry.fetch(&self.transport, cancel).await {
            Ok(catalog) => {
                debug!("Probe found {} APIs on {}", catalog.len(), self.host());
                Ok(())
            }
            Err(SynoError::Transport(e)) if e.is_connect() || e.is_timeout() => {
                Err(ApplicationError::ServerUnreachable(e.to_string()).into())
            }
            Err(e) => Err(e),
        }
    }
}

fn attach_session(request: ApiRequest, session: Option<&SessionInfo>) -> ApiRequest {
    match session {
        Some(session) => request.session(session.sid.clone()),
        None => request,
    }
}

/// Builder for [`SynoClient`]
#[derive(Default)]
pub struct SynoClientBuilder {
    host: Option<String>,
    capability: Option<Capability>,
    timeout: Option<u64>,
    accept_invalid_certs: bool,
    proxy: Option<String>,
    user_agent: Option<String>,
}

impl SynoClientBuilder {
    /// Starts a builder from `SYNOLOGY_HOST`, `SYNOLOGY_TIMEOUT_MS`,
    /// `SYNOLOGY_ACCEPT_INVALID_CERTS` and `SYNOLOGY_PROXY`
    ///
    /// # Errors
    ///
    /// Returns an error if `SYNOLOGY_HOST` is missing or `SYNOLOGY_TIMEOUT_MS`
    /// is not a number.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::default().host(env::var("SYNOLOGY_HOST")?);
        if let Ok(timeout) = env::var("SYNOLOGY_TIMEOUT_MS") {
            let timeout = timeout.parse().map_err(|_| {
                SynoError::Configuration(format!("SYNOLOGY_TIMEOUT_MS is not a number: {timeout}"))
            })?;
            builder = builder.timeout(timeout);
        }
        if let Ok(flag) = env::var("SYNOLOGY_ACCEPT_INVALID_CERTS") {
            builder = builder.accept_invalid_certs(matches!(flag.as_str(), "1" | "true" | "yes"));
        }
        if let Ok(proxy) = env::var("SYNOLOGY_PROXY") {
            builder = builder.proxy(proxy);
        }
        Ok(builder)
    }

    /// Sets the host, e.g. `nas`, `https://nas:5001` or `QuickConnect.to/id`
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Sets the request timeout in milliseconds
    #[must_use]
    pub fn timeout(mut self, timeout_millis: u64) -> Self {
        self.timeout = Some(timeout_millis);
        self
    }

    /// Skips TLS certificate validation
    #[must_use]
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds the [`SynoClient`]
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Host or capability is not provided
    /// - The host cannot be normalised
    /// - The HTTP client cannot be built
    pub fn build(self) -> Result<SynoClient> {
        let host = self
            .host
            .ok_or_else(|| SynoError::Configuration("Host is required".into()))?;
        let capability = self
            .capability
            .ok_or_else(|| SynoError::Configuration("Capability is required".into()))?;

        let mut config = TransportConfig {
            accept_invalid_certs: self.accept_invalid_certs,
            proxy: self.proxy,
            ..TransportConfig::default()
        };
        if let Some(timeout) = self.timeout {
            config.timeout = Duration::from_millis(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }

        SynoClient::new(&host, capability, &config)
    }
}
