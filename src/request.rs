//! Request descriptors and the order-sensitive query-string encoding.
//!
//! The encoded form is `webapi[/<cgi>]?api=..&version=..&method=..` followed
//! by the free-form parameters in insertion order and, last, `_sid=<token>`.
//! Several server endpoints hash or validate the query as sent, so keys are
//! never sorted.

use serde::Serialize;

/// Fixed prefix of every API path
pub const WEBAPI_PREFIX: &str = "webapi";

/// Query parameter name used for a trusted device id
pub const DEVICE_ID_PARAM: &str = "did";

/// Query parameter name carrying the session token
pub const SESSION_PARAM: &str = "_sid";

/// A request to one method of one API, before it is turned into a URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    api: String,
    cgi_path: String,
    version: String,
    method: String,
    session: String,
    params: Vec<(String, String)>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(api: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            method: method.into(),
            ..Self::default()
        }
    }

    /// Sets the cgi sub-path below `webapi/`, e.g. `entry.cgi`
    #[must_use]
    pub fn cgi_path(mut self, path: impl Into<String>) -> Self {
        self.cgi_path = path.into();
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl ToString) -> Self {
        self.version = version.to_string();
        self
    }

    /// Attaches a session token; an empty token means "no session"
    #[must_use]
    pub fn session(mut self, token: impl Into<String>) -> Self {
        self.session = token.into();
        self
    }

    /// Adds a free-form parameter. Setting an existing key replaces its value
    /// but keeps its original position.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    #[must_use]
    pub fn param_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Adds a parameter whose value is the JSON encoding of `value`
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn json_param(
        self,
        key: impl Into<String>,
        value: &impl Serialize,
    ) -> serde_json::Result<Self> {
        Ok(self.param(key, serde_json::to_string(value)?))
    }

    #[must_use]
    pub fn device_id(self, device_id: impl ToString) -> Self {
        self.param(DEVICE_ID_PARAM, device_id)
    }

    #[must_use]
    pub fn api(&self) -> &str {
        &self.api
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn version_str(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn session_token(&self) -> &str {
        &self.session
    }

    /// Free-form parameters in insertion order
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Path below the base address, e.g. `webapi/entry.cgi`
    #[must_use]
    pub fn path(&self) -> String {
        if self.cgi_path.is_empty() {
            WEBAPI_PREFIX.to_string()
        } else {
            format!("{WEBAPI_PREFIX}/{}", self.cgi_path.trim_start_matches('/'))
        }
    }

    /// Path and full query, e.g. `webapi?api=X&version=2&method=list&a=1&_sid=T`
    #[must_use]
    pub fn encode(&self) -> String {
        self.encode_with(true)
    }

    /// Path and query without the free-form parameters. Used for uploads,
    /// where those travel as multipart fields instead.
    #[must_use]
    pub fn encode_head(&self) -> String {
        self.encode_with(false)
    }

    fn encode_with(&self, free_form: bool) -> String {
        let head: [(&str, &str); 3] = [
            ("api", self.api.as_str()),
            ("version", self.version.as_str()),
            ("method", self.method.as_str()),
        ];
        let head = head.into_iter().filter(|(_, v)| !v.is_empty());
        let free = self.params().filter(move |_| free_form);
        let session = (!self.session.is_empty()).then_some((SESSION_PARAM, self.session.as_str()));

        let query = head
            .chain(free)
            .chain(session)
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        if query.is_empty() {
            self.path()
        } else {
            format!("{}?{query}", self.path())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_then_params_in_insertion_order() {
        let request = ApiRequest::new("X", "list")
            .version(2)
            .param("a", "1")
            .param("b", "2");
        assert_eq!(request.encode(), "webapi?api=X&version=2&method=list&a=1&b=2");
    }

    #[test]
    fn test_session_token_appended_last() {
        let request = ApiRequest::new("X", "list")
            .version(2)
            .session("T")
            .param("a", "1")
            .param("b", "2");
        assert_eq!(
            request.encode(),
            "webapi?api=X&version=2&method=list&a=1&b=2&_sid=T"
        );
    }

    #[test]
    fn test_empty_head_values_skipped() {
        let request = ApiRequest::new("SYNO.API.Info", "").param("query", "all");
        assert_eq!(request.encode(), "webapi?api=SYNO.API.Info&query=all");
        assert_eq!(ApiRequest::default().encode(), "webapi");
    }

    #[test]
    fn test_cgi_path_and_encoding() {
        let request = ApiRequest::new("SYNO.VideoStation2.Movie", "list")
            .cgi_path("entry.cgi")
            .version(1)
            .param("additional", r#"["summary","poster_mtime"]"#)
            .param("keyword", "a&b c");
        assert_eq!(
            request.encode(),
            "webapi/entry.cgi?api=SYNO.VideoStation2.Movie&version=1&method=list\
             &additional=%5B%22summary%22%2C%22poster_mtime%22%5D&keyword=a%26b%20c"
        );
    }

    #[test]
    fn test_replacing_param_keeps_position() {
        let request = ApiRequest::new("X", "m")
            .param("a", "1")
            .param("b", "2")
            .param("a", "3");
        assert_eq!(request.params().collect::<Vec<_>>(), [("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_encode_head_omits_free_form() {
        let request = ApiRequest::new("SYNO.DownloadStation2.Task", "create")
            .cgi_path("entry.cgi")
            .version(2)
            .param("type", "\"file\"")
            .session("abc");
        assert_eq!(
            request.encode_head(),
            "webapi/entry.cgi?api=SYNO.DownloadStation2.Task&version=2&method=create&_sid=abc"
        );
    }
}
