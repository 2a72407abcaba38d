use crate::error::{ProtocolError, Result, SynoError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Response envelope shared by every API
#[derive(Deserialize, Debug)]
pub struct SynologyResponse<D> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<D>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

/// Error information from the `error` member of an envelope
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: i32,
    /// Per-item details some APIs attach, e.g. failed task ids
    #[serde(default)]
    pub errors: Option<Value>,
}

impl<D: DeserializeOwned> SynologyResponse<D> {
    /// Decodes `body` envelope-first: the common `{success, error}` shape is
    /// validated before `data` is parsed into `D`.
    ///
    /// A successful envelope without `data` is accepted when `D` can be read
    /// from JSON `null` (`()`, `Option<_>`, [`serde::de::IgnoredAny`]).
    ///
    /// # Errors
    ///
    /// Returns [`SynoError::InvalidResponse`] if:
    /// - The body is not a JSON envelope
    /// - `success=true` comes with a non-zero error code
    /// - `success=false` comes without an error code
    /// - `data` does not match `D`
    pub fn decode(body: &[u8]) -> Result<Self> {
        let raw: SynologyResponse<Value> = serde_json::from_slice(body)
            .map_err(|e| SynoError::InvalidResponse(format!("malformed envelope: {e}")))?;

        if !raw.success {
            return match raw.error {
                Some(error) => Ok(Self {
                    success: false,
                    data: None,
                    error: Some(error),
                }),
                None => Err(SynoError::InvalidResponse(
                    "unsuccessful response without error code".into(),
                )),
            };
        }

        if let Some(error) = raw.error.filter(|e| e.code != 0) {
            return Err(SynoError::InvalidResponse(format!(
                "successful response carries error code {}",
                error.code
            )));
        }

        let data = serde_json::from_value(raw.data.unwrap_or(Value::Null))
            .map_err(|e| SynoError::InvalidResponse(format!("unexpected data: {e}")))?;

        Ok(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

impl<D> SynologyResponse<D> {
    /// Unwraps `data`, or turns the error code into a [`ProtocolError`] for `api`
    ///
    /// # Errors
    ///
    /// Returns [`SynoError::Protocol`] for an unsuccessful envelope and
    /// [`SynoError::InvalidResponse`] for a successful one without data.
    pub fn into_result(self, api: &str) -> Result<D> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (true, None, _) => Err(SynoError::InvalidResponse("No data received".into())),
            (false, _, Some(error)) => Err(ProtocolError::new(api, error.code).into()),
            (false, _, None) => Err(SynoError::InvalidResponse(format!(
                "{api} failed, unknown error"
            ))),
        }
    }
}

/// Location and supported versions of one API, as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub api_name: String,
    /// cgi path below `webapi/`, e.g. `entry.cgi`
    pub path: String,
    pub min_version: u32,
    pub max_version: u32,
}

impl EndpointSpec {
    /// Clamps `preferred` into the supported `[min_version, max_version]` range
    #[must_use]
    pub fn negotiate(&self, preferred: u32) -> u32 {
        preferred.clamp(self.min_version, self.max_version.max(self.min_version))
    }
}

/// One catalog entry of the `SYNO.API.Info` response
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfoEntry {
    pub path: String,
    pub min_version: u32,
    pub max_version: u32,
    #[serde(default)]
    pub request_format: Option<String>,
}

/// `SYNO.API.Info` response data
pub type ApiInfo = HashMap<String, ApiInfoEntry>;

/// Authentication response data
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session ID used for authenticated requests
    pub sid: String,
    /// Trusted device id, issued when a login asked to skip OTP next time
    #[serde(default, alias = "did")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub is_portal_port: bool,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub synotoken: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::IgnoredAny;

    #[test]
    fn test_decode_success() {
        let body = br#"{"success":true,"data":{"sid":"abc","did":"dev-1"}}"#;
        let info = SynologyResponse::<SessionInfo>::decode(body)
            .unwrap()
            .into_result("SYNO.API.Auth")
            .unwrap();
        assert_eq!(info.sid, "abc");
        assert_eq!(info.device_id.as_deref(), Some("dev-1"));
        assert!(!info.is_portal_port);
    }

    #[test]
    fn test_decode_failure_carries_code() {
        let body = br#"{"success":false,"error":{"code":403}}"#;
        let response = SynologyResponse::<SessionInfo>::decode(body).unwrap();
        assert!(response.data.is_none());
        let err = response.into_result("SYNO.API.Auth").unwrap_err();
        assert!(err.is_otp_required());
    }

    #[test]
    fn test_decode_success_without_data() {
        let body = br#"{"success":true}"#;
        SynologyResponse::<()>::decode(body).unwrap().into_result("X").unwrap();
        SynologyResponse::<IgnoredAny>::decode(br#"{"success":true,"data":{"a":1}}"#).unwrap();

        let err = SynologyResponse::<SessionInfo>::decode(body).unwrap_err();
        assert!(matches!(err, SynoError::InvalidResponse(_)));
    }

    #[test]
    fn test_inconsistent_envelopes_rejected() {
        let err = SynologyResponse::<()>::decode(br#"{"success":false}"#).unwrap_err();
        assert!(matches!(err, SynoError::InvalidResponse(_)));

        let err =
            SynologyResponse::<()>::decode(br#"{"success":true,"error":{"code":105}}"#).unwrap_err();
        assert!(matches!(err, SynoError::InvalidResponse(_)));

        let err = SynologyResponse::<()>::decode(b"<html>").unwrap_err();
        assert!(matches!(err, SynoError::InvalidResponse(_)));
    }

    #[test]
    fn test_negotiate_version() {
        let spec = EndpointSpec {
            api_name: "SYNO.API.Auth".into(),
            path: "entry.cgi".into(),
            min_version: 1,
            max_version: 6,
        };
        assert_eq!(spec.negotiate(7), 6);
        assert_eq!(spec.negotiate(3), 3);
        assert_eq!(spec.negotiate(0), 1);
    }
}
