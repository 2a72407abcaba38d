//! Normalisation of user-entered host strings into a base address.
//!
//! `nas`, `nas:5001`, `https://nas`, `[fe80::1]:5000` and `192.168.1.5` are
//! all direct connections. `QuickConnect.to/<id>` and `qc:<id>` name a
//! relay-routed connection which can be addressed but not logged into.

use crate::error::{ApplicationError, Result};
use reqwest::Url;
use std::fmt;

pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_HTTPS_PORT: u16 = 5001;

const QUICKCONNECT_HOST: &str = "quickconnect.to";
const QUICKCONNECT_PREFIX: &str = "qc:";

/// How the base address reaches the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionKind {
    Direct,
    /// Routed through the vendor relay; login is not supported
    QuickConnect { id: String },
}

/// Normalised base address of a station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    url: Url,
    kind: ConnectionKind,
}

impl HostAddress {
    /// Parses and normalises `input`
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::InvalidHost`] if:
    /// - The input is blank
    /// - The scheme is neither `http` nor `https`
    /// - The input carries a path, an unbracketed IPv6 literal or an invalid port
    /// - The host name is not ASCII
    /// - A QuickConnect ID does not start with a letter or contains other than letters, digits and hyphens
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid(input, "host cannot be empty"));
        }

        if let Some(id) = quickconnect_id(input) {
            if !is_quickconnect_id(id) {
                return Err(invalid(input, "malformed QuickConnect ID"));
            }
            let id = id.to_ascii_lowercase();
            let url = Url::parse(&format!("https://{id}.{QUICKCONNECT_HOST}"))
                .map_err(|e| invalid(input, &e.to_string()))?;
            return Ok(Self {
                url,
                kind: ConnectionKind::QuickConnect { id },
            });
        }

        let (scheme, rest) = match input.split_once("://") {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => ("http".to_string(), input),
        };
        let default_port = match scheme.as_str() {
            "http" => DEFAULT_HTTP_PORT,
            "https" => DEFAULT_HTTPS_PORT,
            _ => return Err(invalid(input, "scheme must be http or https")),
        };

        let authority = rest.trim_end_matches('/');
        if authority.is_empty() || authority.contains('/') {
            return Err(invalid(input, "expected a host with an optional port"));
        }
        if !authority.is_ascii() {
            return Err(invalid(input, "host names must be ASCII, use the punycode form"));
        }

        let has_port = if let Some(bracketed) = authority.strip_prefix('[') {
            let (_, after) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid(input, "unterminated IPv6 literal"))?;
            after.starts_with(':')
        } else {
            match authority.matches(':').count() {
                0 => false,
                1 => true,
                _ => return Err(invalid(input, "IPv6 literals must be enclosed in brackets")),
            }
        };

        let spec = if has_port {
            format!("{scheme}://{authority}")
        } else {
            format!("{scheme}://{authority}:{default_port}")
        };
        let url = Url::parse(&spec).map_err(|e| invalid(input, &e.to_string()))?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid(input, "missing host name"));
        }

        Ok(Self {
            url,
            kind: ConnectionKind::Direct,
        })
    }

    /// Base address without trailing slash, e.g. `http://nas:5000`
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn kind(&self) -> &ConnectionKind {
        &self.kind
    }

    #[must_use]
    pub fn is_quickconnect(&self) -> bool {
        matches!(self.kind, ConnectionKind::QuickConnect { .. })
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid(input: &str, reason: &str) -> crate::error::SynoError {
    ApplicationError::InvalidHost(format!("{input}: {reason}")).into()
}

/// Extracts the ID from `qc:<id>` or `[scheme://]QuickConnect.to/<id>`
fn quickconnect_id(input: &str) -> Option<&str> {
    let prefixed = input
        .get(..QUICKCONNECT_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(QUICKCONNECT_PREFIX));
    if prefixed {
        return input.get(QUICKCONNECT_PREFIX.len()..);
    }
    let rest = input.split_once("://").map_or(input, |(_, rest)| rest);
    let (host, id) = rest.split_once('/')?;
    host.eq_ignore_ascii_case(QUICKCONNECT_HOST)
        .then(|| id.trim_end_matches('/'))
}

fn is_quickconnect_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}
