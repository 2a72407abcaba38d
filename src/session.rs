//! Authentication lifecycle.
//!
//! `Anonymous -> Authenticating -> Authenticated -> Anonymous`. Login and
//! logout hold the session write guard for their whole exchange, so they are
//! serialised with each other and with in-flight authenticated calls.

use crate::client::SynoClient;
use crate::entities::SessionInfo;
use crate::error::{Result, SynoError};
use crate::request::ApiRequest;
use crate::transport::SessionCookies;
use chrono::Utc;
use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::de::IgnoredAny;
use tokio_util::sync::CancellationToken;

/// Authentication API
pub const API_AUTH: &str = "SYNO.API.Auth";

/// Preferred version of [`API_AUTH`]; device tokens need 6 or later
pub const AUTH_VERSION: u32 = 7;

pub const OTP_LENGTH: usize = 6;

/// Parameters of one login attempt
#[derive(Debug)]
pub struct LoginRequest {
    username: String,
    password: SecretString,
    otp_code: Option<String>,
    trust_device: bool,
    device_id: Option<String>,
    device_name: Option<String>,
    cipher_text: Option<SecretString>,
}

impl LoginRequest {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            otp_code: None,
            trust_device: true,
            device_id: None,
            device_name: None,
            cipher_text: None,
        }
    }

    /// Answers a two-step verification challenge. Takes precedence over
    /// [`Self::device_id`].
    #[must_use]
    pub fn otp_code(mut self, otp_code: impl Into<String>) -> Self {
        self.otp_code = Some(otp_code.into());
        self
    }

    /// Whether the server should issue a trusted device id along with an
    /// OTP login, so later logins can skip the challenge. Default `true`.
    #[must_use]
    pub fn trust_device(mut self, trust: bool) -> Self {
        self.trust_device = trust;
        self
    }

    /// A device id issued by an earlier OTP login
    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = Some(device_name.into());
        self
    }

    /// Encrypted credentials; sent instead of the plain password
    #[must_use]
    pub fn cipher_text(mut self, cipher_text: impl Into<String>) -> Self {
        self.cipher_text = Some(SecretString::from(cipher_text.into()));
        self
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn has_otp_code(&self) -> bool {
        self.otp_code.is_some()
    }

    #[must_use]
    pub fn has_device_id(&self) -> bool {
        self.device_id.is_some()
    }

    /// Checks the preconditions that hold before any network traffic
    ///
    /// # Errors
    ///
    /// Returns [`SynoError::InvalidArgument`] if:
    /// - Username or password is blank
    /// - An OTP code is present but not exactly six characters long
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(SynoError::InvalidArgument("Username cannot be empty".into()));
        }
        if self.password.expose_secret().trim().is_empty() {
            return Err(SynoError::InvalidArgument("Password cannot be empty".into()));
        }
        if self
            .otp_code
            .as_ref()
            .is_some_and(|otp| otp.chars().count() != OTP_LENGTH)
        {
            return Err(SynoError::InvalidArgument(format!(
                "OTP code must be {OTP_LENGTH} characters long"
            )));
        }
        Ok(())
    }

    /// Appends the login parameters to `request` in wire order
    fn apply(&self, request: ApiRequest, session_name: &str, client_time: i64) -> ApiRequest {
        let mut request = request
            .param("session", session_name)
            .param("format", "sid")
            .param("account", &self.username);

        request = match &self.cipher_text {
            Some(cipher) => request.param("__cIpHeRtExT", cipher.expose_secret()),
            None => request.param("passwd", self.password.expose_secret()),
        };

        if let Some(otp) = &self.otp_code {
            request = request
                .param("otp_code", otp)
                .param("enable_device_token", if self.trust_device { "yes" } else { "no" })
                .param_opt("device_name", self.device_name.as_ref());
        } else if let Some(device_id) = &self.device_id {
            request = request
                .device_id(device_id)
                .param_opt("device_name", self.device_name.as_ref());
        }

        request.param("client_time", client_time)
    }
}

impl SynoClient {
    /// Logs in and keeps the returned session for subsequent calls.
    ///
    /// Any previous session is dropped first. When the server answers with
    /// [`AuthCode::OneTimePasswordNotSpecified`](crate::codes::AuthCode::OneTimePasswordNotSpecified)
    /// (see [`SynoError::is_otp_required`]) the caller retries with
    /// [`LoginRequest::otp_code`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Arguments are invalid ([`SynoError::InvalidArgument`])
    /// - The client addresses a QuickConnect relay ([`SynoError::UnsupportedConnectionType`])
    /// - Network request fails or is canceled
    /// - Credentials are rejected ([`SynoError::Protocol`])
    pub async fn login(
        &self,
        login: &LoginRequest,
        cancel: &CancellationToken,
    ) -> Result<SessionInfo> {
        login.validate()?;
        if self.host().is_quickconnect() {
            return Err(SynoError::UnsupportedConnectionType(format!(
                "login through QuickConnect relay {} is not supported",
                self.host()
            )));
        }

        let mut session = self.session.write().await;
        if session.take().is_some() {
            debug!("Dropping previous session before login");
        }

        debug!(
            "Logging in to {} as {} ({})",
            self.host(),
            login.username(),
            self.capability.session_name()
        );

        let endpoint = self.endpoint(API_AUTH, cancel).await?;
        let request = login.apply(
            ApiRequest::new(API_AUTH, "login")
                .cgi_path(endpoint.path.clone())
                .version(endpoint.negotiate(AUTH_VERSION)),
            self.capability.session_name(),
            Utc::now().timestamp(),
        );

        let info: SessionInfo = self.call_anonymous(&request, cancel).await.inspect_err(|e| {
            debug!("Login failed: {e}");
        })?;

        debug!("Login successful");
        *session = Some(info.clone());
        Ok(info)
    }

    /// Ends the session.
    ///
    /// The local token is cleared before the server is contacted and the
    /// cookie jar is cleared afterwards whatever the outcome, including
    /// cancellation. A server-side rejection is still returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the logout call fails or the server rejects it.
    pub async fn logout(&self, cancel: &CancellationToken) -> Result<()> {
        let mut session = self.session.write().await;
        let previous = session.take();
        let _clear = ClearCookiesOnDrop(self.cookies());

        debug!("Logging out of {}", self.capability.session_name());

        let endpoint = self.endpoint(API_AUTH, cancel).await?;
        let request = ApiRequest::new(API_AUTH, "logout")
            .cgi_path(endpoint.path.clone())
            .version(endpoint.negotiate(AUTH_VERSION))
            .param("session", self.capability.session_name())
            .session(previous.map(|s| s.sid).unwrap_or_default());

        self.call_anonymous::<IgnoredAny>(&request, cancel)
            .await
            .inspect_err(|e| warn!("Server rejected logout: {e}"))?;
        debug!("Logout complete");
        Ok(())
    }
}

struct ClearCookiesOnDrop<'a>(&'a SessionCookies);

impl Drop for ClearCookiesOnDrop<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(LoginRequest::new("admin", "secret").validate().is_ok());
        assert!(LoginRequest::new(" ", "secret").validate().is_err());
        assert!(LoginRequest::new("admin", "").validate().is_err());

        let err = LoginRequest::new("admin", "secret")
            .otp_code("12345")
            .validate()
            .unwrap_err();
        assert!(matches!(err, SynoError::InvalidArgument(_)));
        assert!(
            LoginRequest::new("admin", "secret")
                .otp_code("123456")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_plain_login_parameters() {
        let request = LoginRequest::new("admin", "p@ss").apply(
            ApiRequest::new(API_AUTH, "login").cgi_path("entry.cgi").version(6),
            "VideoStation",
            1_700_000_000,
        );
        assert_eq!(
            request.encode(),
            "webapi/entry.cgi?api=SYNO.API.Auth&version=6&method=login&session=VideoStation\
             &format=sid&account=admin&passwd=p%40ss&client_time=1700000000"
        );
    }

    #[test]
    fn test_otp_excludes_device_id() {
        let request = LoginRequest::new("admin", "pw")
            .otp_code("123456")
            .device_id("old-device")
            .device_name("laptop")
            .apply(ApiRequest::new(API_AUTH, "login"), "DownloadStation", 1);
        let params: Vec<_> = request.params().map(|(k, _)| k).collect();
        assert_eq!(
            params,
            [
                "session",
                "format",
                "account",
                "passwd",
                "otp_code",
                "enable_device_token",
                "device_name",
                "client_time"
            ]
        );
    }

    #[test]
    fn test_trusted_device_and_cipher_text() {
        let request = LoginRequest::new("admin", "pw")
            .device_id("dev-1")
            .cipher_text("encrypted")
            .apply(ApiRequest::new(API_AUTH, "login"), "VideoStation", 1);
        let params: Vec<_> = request.params().collect();
        assert!(params.contains(&("did", "dev-1")));
        assert!(params.contains(&("__cIpHeRtExT", "encrypted")));
        assert!(!params.iter().any(|(k, _)| *k == "passwd"));
    }
}
