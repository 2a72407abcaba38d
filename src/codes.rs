//! Numeric error codes returned in the `error.code` field of a response envelope.
//!
//! The same number means different things depending on which API produced it:
//! `400` is "no such account or incorrect password" on `SYNO.API.Auth` but
//! "file upload failed" on a Download Station task API. Codes below `400` are
//! shared by every API; everything else is looked up in the table of the API
//! family that returned it.

use std::fmt;

/// Codes shared by every API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommonCode {
    Unknown,
    InvalidParameter,
    ApiNotFound,
    MethodNotFound,
    VersionNotSupported,
    InsufficientPrivilege,
    ConnectionTimeout,
    MultipleLoginDetected,
    UploadFailed,
    NetworkUnstable,
    SessionNotFound,
}

impl CommonCode {
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            100 => Self::Unknown,
            101 => Self::InvalidParameter,
            102 => Self::ApiNotFound,
            103 => Self::MethodNotFound,
            104 => Self::VersionNotSupported,
            105 => Self::InsufficientPrivilege,
            106 => Self::ConnectionTimeout,
            107 => Self::MultipleLoginDetected,
            108 => Self::UploadFailed,
            109 => Self::NetworkUnstable,
            119 => Self::SessionNotFound,
            _ => return None,
        })
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown error",
            Self::InvalidParameter => "Invalid or missing API parameter",
            Self::ApiNotFound => "The requested API does not exist",
            Self::MethodNotFound => "The requested method does not exist",
            Self::VersionNotSupported => "The requested version does not support this functionality",
            Self::InsufficientPrivilege => "The logged in session does not have permission",
            Self::ConnectionTimeout => "Session timed out",
            Self::MultipleLoginDetected => "Session interrupted by a duplicate login",
            Self::UploadFailed => "Failed to upload the file",
            Self::NetworkUnstable => "The network connection is unstable or the system is busy",
            Self::SessionNotFound => "Session ID not found",
        }
    }
}

/// Codes returned by `SYNO.API.Auth`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCode {
    InvalidPassword,
    AccountDisabled,
    PermissionDenied,
    /// The account has two-factor authentication enabled and no code was sent.
    /// Callers re-prompt and retry the login with an OTP code.
    OneTimePasswordNotSpecified,
    OneTimePasswordFailed,
    OneTimePasswordEnforced,
    IpBlocked,
    ExpiredPasswordCannotChange,
    PasswordExpired,
    PasswordMustChange,
}

impl AuthCode {
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            400 => Self::InvalidPassword,
            401 => Self::AccountDisabled,
            402 => Self::PermissionDenied,
            403 => Self::OneTimePasswordNotSpecified,
            404 => Self::OneTimePasswordFailed,
            406 => Self::OneTimePasswordEnforced,
            407 => Self::IpBlocked,
            408 => Self::ExpiredPasswordCannotChange,
            409 => Self::PasswordExpired,
            410 => Self::PasswordMustChange,
            _ => return None,
        })
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::InvalidPassword => 400,
            Self::AccountDisabled => 401,
            Self::PermissionDenied => 402,
            Self::OneTimePasswordNotSpecified => 403,
            Self::OneTimePasswordFailed => 404,
            Self::OneTimePasswordEnforced => 406,
            Self::IpBlocked => 407,
            Self::ExpiredPasswordCannotChange => 408,
            Self::PasswordExpired => 409,
            Self::PasswordMustChange => 410,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidPassword => "No such account or incorrect password",
            Self::AccountDisabled => "Account disabled",
            Self::PermissionDenied => "Permission denied",
            Self::OneTimePasswordNotSpecified => "Two-step verification code required",
            Self::OneTimePasswordFailed => "Failed to authenticate two-step verification code",
            Self::OneTimePasswordEnforced => "Two-step verification is enforced for this account",
            Self::IpBlocked => "Too many failed attempts, IP address blocked",
            Self::ExpiredPasswordCannotChange => "Password expired and cannot be changed",
            Self::PasswordExpired => "Password expired",
            Self::PasswordMustChange => "Password must be changed",
        }
    }
}

/// Codes returned by the Download Station task APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStationCode {
    FileUploadFailed,
    MaxTasksReached,
    DestinationDenied,
    DestinationNotFound,
    InvalidTaskId,
    InvalidTaskAction,
    NoDefaultDestination,
    SetDestinationFailed,
    FileNotFound,
}

impl DownloadStationCode {
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            400 => Self::FileUploadFailed,
            401 => Self::MaxTasksReached,
            402 => Self::DestinationDenied,
            403 => Self::DestinationNotFound,
            404 => Self::InvalidTaskId,
            405 => Self::InvalidTaskAction,
            406 => Self::NoDefaultDestination,
            407 => Self::SetDestinationFailed,
            408 => Self::FileNotFound,
            _ => return None,
        })
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::FileUploadFailed => "File upload failed",
            Self::MaxTasksReached => "Max number of tasks reached",
            Self::DestinationDenied => "Destination denied",
            Self::DestinationNotFound => "Destination does not exist",
            Self::InvalidTaskId => "Invalid task id",
            Self::InvalidTaskAction => "Invalid task action",
            Self::NoDefaultDestination => "No default destination",
            Self::SetDestinationFailed => "Set destination failed",
            Self::FileNotFound => "File does not exist",
        }
    }
}

/// Codes returned by the Video Station APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStationCode {
    FileNotFound,
    StreamOpenFailed,
    /// The media cannot be transcoded. Recoverable: reopen the stream with the raw format.
    TranscodeNotSupported,
    TranscodeBusy,
}

impl VideoStationCode {
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1001 => Self::FileNotFound,
            1200 => Self::StreamOpenFailed,
            1201 => Self::TranscodeNotSupported,
            1202 => Self::TranscodeBusy,
            _ => return None,
        })
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::FileNotFound => 1001,
            Self::StreamOpenFailed => 1200,
            Self::TranscodeNotSupported => 1201,
            Self::TranscodeBusy => 1202,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::FileNotFound => "Video file not found",
            Self::StreamOpenFailed => "Failed to open the stream",
            Self::TranscodeNotSupported => "Transcoding is not supported for this media",
            Self::TranscodeBusy => "The server is busy transcoding other streams",
        }
    }
}

/// A protocol error code resolved against the API family that returned it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Common(CommonCode),
    Auth(AuthCode),
    DownloadStation(DownloadStationCode),
    VideoStation(VideoStationCode),
    Unknown(i32),
}

impl ErrorKind {
    /// Classifies `code` as returned by `api`
    #[must_use]
    pub fn classify(api: &str, code: i32) -> Self {
        if let Some(common) = CommonCode::from_code(code) {
            return Self::Common(common);
        }
        let scoped = if api.starts_with("SYNO.API.Auth") {
            AuthCode::from_code(code).map(Self::Auth)
        } else if api.starts_with("SYNO.DownloadStation") {
            DownloadStationCode::from_code(code).map(Self::DownloadStation)
        } else if api.starts_with("SYNO.VideoStation") {
            VideoStationCode::from_code(code).map(Self::VideoStation)
        } else {
            None
        };
        scoped.unwrap_or(Self::Unknown(code))
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Common(c) => c.message(),
            Self::Auth(c) => c.message(),
            Self::DownloadStation(c) => c.message(),
            Self::VideoStation(c) => c.message(),
            Self::Unknown(_) => "Unrecognised error code",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_codes_win_in_every_api() {
        assert_eq!(
            ErrorKind::classify("SYNO.API.Auth", 105),
            ErrorKind::Common(CommonCode::InsufficientPrivilege)
        );
        assert_eq!(
            ErrorKind::classify("SYNO.VideoStation2.Movie", 119),
            ErrorKind::Common(CommonCode::SessionNotFound)
        );
    }

    #[test]
    fn test_same_code_differs_by_api() {
        assert_eq!(
            ErrorKind::classify("SYNO.API.Auth", 403),
            ErrorKind::Auth(AuthCode::OneTimePasswordNotSpecified)
        );
        assert_eq!(
            ErrorKind::classify("SYNO.DownloadStation2.Task", 403),
            ErrorKind::DownloadStation(DownloadStationCode::DestinationNotFound)
        );
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(ErrorKind::classify("SYNO.Foo", 555), ErrorKind::Unknown(555));
        assert_eq!(ErrorKind::classify("SYNO.API.Auth", 999), ErrorKind::Unknown(999));
    }

    #[test]
    fn test_video_station_transcode_rejection() {
        let kind = ErrorKind::classify("SYNO.VideoStation2.Streaming", 1201);
        assert_eq!(
            kind,
            ErrorKind::VideoStation(VideoStationCode::TranscodeNotSupported)
        );
        assert_eq!(kind.to_string(), "Transcoding is not supported for this media");
    }
}
