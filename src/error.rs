use crate::codes::{AuthCode, ErrorKind, VideoStationCode};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Result alias used by every operation of the crate
pub type Result<T, E = SynoError> = std::result::Result<T, E>;

/// Custom error types for the [`SynoClient`](crate::client::SynoClient)
#[derive(Error, Debug)]
pub enum SynoError {
    /// No response: DNS, connection refused, TLS or a broken body stream.
    #[error("Network request error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The caller's cancellation signal was active when the operation failed
    #[error("Operation canceled")]
    Canceled,

    #[error("Synology API error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("Invalid input parameter: {0}")]
    InvalidArgument(String),

    #[error("API not provided by the server: {0}")]
    EndpointNotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported connection type: {0}")]
    UnsupportedConnectionType(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Environment variable error: {0}")]
    Environment(#[from] env::VarError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynoError {
    /// The raw protocol code, if the server rejected the call
    #[must_use]
    pub fn protocol_code(&self) -> Option<i32> {
        match self {
            Self::Protocol(e) => Some(e.code),
            _ => None,
        }
    }

    /// `true` when the login has to be retried with a one-time password
    #[must_use]
    pub fn is_otp_required(&self) -> bool {
        matches!(
            self,
            Self::Protocol(e) if e.kind() == ErrorKind::Auth(AuthCode::OneTimePasswordNotSpecified)
        )
    }

    /// `true` when a stream has to be reopened with the raw format
    #[must_use]
    pub fn is_transcoding_rejected(&self) -> bool {
        matches!(
            self,
            Self::Protocol(e)
                if e.kind() == ErrorKind::VideoStation(VideoStationCode::TranscodeNotSupported)
        )
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// `true` when the session is gone and a new login might resolve it
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        use crate::codes::CommonCode::{ConnectionTimeout, MultipleLoginDetected, SessionNotFound};
        matches!(
            self,
            Self::Protocol(e) if matches!(
                e.kind(),
                ErrorKind::Common(ConnectionTimeout | MultipleLoginDetected | SessionNotFound)
            )
        )
    }
}

/// A well-formed envelope with `success=false`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("api={api}, code={code}, message={}", self.message())]
pub struct ProtocolError {
    /// API that returned the code; codes are only meaningful per API family
    pub api: String,
    pub code: i32,
}

impl ProtocolError {
    #[must_use]
    pub fn new(api: impl Into<String>, code: i32) -> Self {
        Self {
            api: api.into(),
            code,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::classify(&self.api, self.code)
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        self.kind().message()
    }
}

/// Failures synthesized by the client itself, never returned by the server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("No video libraries are available to this account")]
    NoVideoLibraries,

    #[error("Operation timed out after {0:?}")]
    OperationTimedOut(Duration),

    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}

impl ApplicationError {
    /// Client-side code, kept apart from every server code range
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidHost(_) => 9001,
            Self::NoVideoLibraries => 9002,
            Self::OperationTimedOut(_) => 9003,
            Self::ServerUnreachable(_) => 9004,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_required_only_for_auth_api() {
        let auth: SynoError = ProtocolError::new("SYNO.API.Auth", 403).into();
        assert!(auth.is_otp_required());

        let task: SynoError = ProtocolError::new("SYNO.DownloadStation2.Task", 403).into();
        assert!(!task.is_otp_required());
        assert_eq!(task.protocol_code(), Some(403));
    }

    #[test]
    fn test_session_expired() {
        let err: SynoError = ProtocolError::new("SYNO.VideoStation2.Movie", 119).into();
        assert!(err.is_session_expired());
        assert!(!SynoError::Canceled.is_session_expired());
    }

    #[test]
    fn test_display() {
        let err: SynoError = ProtocolError::new("SYNO.API.Auth", 400).into();
        assert_eq!(
            err.to_string(),
            "Synology API error: api=SYNO.API.Auth, code=400, message=No such account or incorrect password"
        );
        let err: SynoError = ApplicationError::NoVideoLibraries.into();
        assert_eq!(err.to_string(), "No video libraries are available to this account");
    }
}
