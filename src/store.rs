//! Persisted client-side state: past logins, trusted device ids and the
//! preferred video quality. The backing store is supplied by the caller.

use crate::entities::SessionInfo;
use crate::error::{Result, SynoError};
use crate::session::LoginRequest;
use crate::video_station::entities::StreamFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

/// Key under which [`LoginHistory`] keeps its records
pub const LOGIN_HISTORY_KEY: &str = "login_history";
/// Key under which the [`VideoQuality`] preference is kept
pub const VIDEO_QUALITY_KEY: &str = "video_quality";

/// String key-value persistence
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: String) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

/// [`KeyValueStore`] kept in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// One remembered login
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginRecord {
    pub host: String,
    pub account: String,
    /// Trusted device id that lets the next login skip OTP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub last_login: DateTime<Utc>,
}

/// Login records stored as a JSON array, most recent first
#[derive(Debug)]
pub struct LoginHistory<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> LoginHistory<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns an error if the store fails or holds malformed records.
    pub fn records(&self) -> Result<Vec<LoginRecord>> {
        match self.store.get(LOGIN_HISTORY_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json).map_err(io::Error::from)?),
            None => Ok(Vec::new()),
        }
    }

    /// Most recent login, if any
    ///
    /// # Errors
    ///
    /// See [`Self::records`].
    pub fn last(&self) -> Result<Option<LoginRecord>> {
        Ok(self.records()?.into_iter().next())
    }

    /// # Errors
    ///
    /// See [`Self::records`].
    pub fn find(&self, host: &str, account: &str) -> Result<Option<LoginRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .find(|r| r.host == host && r.account == account))
    }

    /// Records a successful login. A device id issued by `session` replaces
    /// the stored one; otherwise the stored one is kept.
    ///
    /// # Errors
    ///
    /// See [`Self::records`].
    pub fn remember(&self, host: &str, account: &str, session: &SessionInfo) -> Result<()> {
        let mut records = self.records()?;
        let previous = records
            .iter()
            .position(|r| r.host == host && r.account == account)
            .map(|i| records.remove(i));

        let device_id = session
            .device_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| previous.and_then(|r| r.device_id));

        records.insert(
            0,
            LoginRecord {
                host: host.to_string(),
                account: account.to_string(),
                device_id,
                last_login: Utc::now(),
            },
        );
        self.save(&records)
    }

    /// # Errors
    ///
    /// See [`Self::records`].
    pub fn forget(&self, host: &str, account: &str) -> Result<()> {
        let mut records = self.records()?;
        records.retain(|r| !(r.host == host && r.account == account));
        self.save(&records)
    }

    /// Adds the remembered device id for `host` to `login`, unless it
    /// already answers an OTP challenge or names a device
    ///
    /// # Errors
    ///
    /// See [`Self::records`].
    pub fn trusted_login(&self, host: &str, login: LoginRequest) -> Result<LoginRequest> {
        if login.has_otp_code() || login.has_device_id() {
            return Ok(login);
        }
        match self.find(host, login.username())? {
            Some(LoginRecord {
                device_id: Some(device_id),
                ..
            }) => Ok(login.device_id(device_id)),
            _ => Ok(login),
        }
    }

    fn save(&self, records: &[LoginRecord]) -> Result<()> {
        let json = serde_json::to_string(records).map_err(io::Error::from)?;
        self.store.set(LOGIN_HISTORY_KEY, json)
    }
}

/// Preferred playback quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoQuality {
    /// Untouched source file
    #[default]
    Original,
    High,
    Medium,
    Low,
}

impl VideoQuality {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Stream format that delivers this quality
    #[must_use]
    pub fn stream_format(self) -> StreamFormat {
        match self {
            Self::Original => StreamFormat::Raw,
            _ => StreamFormat::Hls,
        }
    }

    /// Stored preference, [`VideoQuality::Original`] when unset
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or holds an unknown value.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        store
            .get(VIDEO_QUALITY_KEY)?
            .map_or(Ok(Self::default()), |value| value.parse())
    }

    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn save<S: KeyValueStore + ?Sized>(self, store: &S) -> Result<()> {
        store.set(VIDEO_QUALITY_KEY, self.as_str().to_string())
    }
}

impl FromStr for VideoQuality {
    type Err = SynoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "original" => Ok(Self::Original),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(SynoError::Configuration(format!(
                "Unknown video quality: {s}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(device_id: Option<&str>) -> SessionInfo {
        SessionInfo {
            sid: String::from("sid"),
            device_id: device_id.map(String::from),
            ..SessionInfo::default()
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::default();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v".into()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_remember_moves_login_to_front() {
        let store = MemoryStore::default();
        let history = LoginHistory::new(&store);
        history
            .remember("http://nas:5000", "admin", &session(Some("dev-1")))
            .unwrap();
        history
            .remember("http://other:5000", "guest", &session(None))
            .unwrap();
        history
            .remember("http://nas:5000", "admin", &session(None))
            .unwrap();

        let records = history.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].account, "admin");
        assert_eq!(records[0].device_id.as_deref(), Some("dev-1"));
        assert_eq!(history.last().unwrap().unwrap().host, "http://nas:5000");
    }

    #[test]
    fn test_forget() {
        let store = MemoryStore::default();
        let history = LoginHistory::new(&store);
        history
            .remember("http://nas:5000", "admin", &session(Some("dev-1")))
            .unwrap();
        history.forget("http://nas:5000", "admin").unwrap();
        assert!(history.records().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_history_is_an_error() {
        let store = MemoryStore::default();
        store.set(LOGIN_HISTORY_KEY, "{not json".into()).unwrap();
        let err = LoginHistory::new(&store).records().unwrap_err();
        assert!(matches!(err, SynoError::Io(_)));
    }

    #[test]
    fn test_trusted_login_adds_device_id() {
        let store = MemoryStore::default();
        let history = LoginHistory::new(&store);
        history
            .remember("http://nas:5000", "admin", &session(Some("dev-1")))
            .unwrap();

        let login = history
            .trusted_login("http://nas:5000", LoginRequest::new("admin", "pw"))
            .unwrap();
        assert!(login.has_device_id());

        let login = history
            .trusted_login(
                "http://nas:5000",
                LoginRequest::new("admin", "pw").otp_code("123456"),
            )
            .unwrap();
        assert!(!login.has_device_id());

        let login = history
            .trusted_login("http://nas:5000", LoginRequest::new("guest", "pw"))
            .unwrap();
        assert!(!login.has_device_id());
    }

    #[test]
    fn test_video_quality_preference() {
        let store = MemoryStore::default();
        assert_eq!(VideoQuality::load(&store).unwrap(), VideoQuality::Original);
        assert_eq!(VideoQuality::Original.stream_format(), StreamFormat::Raw);

        VideoQuality::Medium.save(&store).unwrap();
        let quality = VideoQuality::load(&store).unwrap();
        assert_eq!(quality, VideoQuality::Medium);
        assert_eq!(quality.stream_format(), StreamFormat::Hls);

        store.set(VIDEO_QUALITY_KEY, "4k".into()).unwrap();
        assert!(VideoQuality::load(&store).is_err());
    }
}
