//! Runtime discovery of API paths and versions.
//!
//! The first resolution on a client issues a single `SYNO.API.Info` query for
//! every API the client declared and keeps the whole answer for the lifetime
//! of the instance. Concurrent first callers wait on the same discovery call.

use crate::entities::{ApiInfo, EndpointSpec, SynologyResponse};
use crate::error::{Result, SynoError};
use crate::request::ApiRequest;
use crate::transport::Transport;
use log::debug;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// API answering discovery queries
pub const API_INFO: &str = "SYNO.API.Info";

/// cgi path of the discovery API, fixed by the server
pub const API_INFO_PATH: &str = "query.cgi";

/// Memoized `api name -> endpoint` catalog
#[derive(Debug)]
pub struct EndpointRegistry {
    required: Vec<String>,
    catalog: OnceCell<HashMap<String, EndpointSpec>>,
}

impl EndpointRegistry {
    #[must_use]
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            catalog: OnceCell::new(),
        }
    }

    /// API names sent in the discovery query
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// The discovery request for the declared API set
    #[must_use]
    pub fn discovery_request(&self) -> ApiRequest {
        ApiRequest::new(API_INFO, "query")
            .cgi_path(API_INFO_PATH)
            .version(1)
            .param("query", self.required.join(","))
    }

    /// Resolves `api_name`, running discovery first if nothing is cached yet
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Discovery fails (transport, cancellation or protocol error)
    /// - The catalog has no entry equal to or starting with `api_name`
    pub async fn resolve(
        &self,
        transport: &Transport,
        api_name: &str,
        cancel: &CancellationToken,
    ) -> Result<EndpointSpec> {
        let catalog = self
            .catalog
            .get_or_try_init(|| self.discover(transport, cancel))
            .await?;
        lookup(catalog, api_name)
    }

    /// The cached catalog, if discovery already ran
    #[must_use]
    pub fn catalog(&self) -> Option<&HashMap<String, EndpointSpec>> {
        self.catalog.get()
    }

    /// Queries the server without touching the cache
    ///
    /// # Errors
    ///
    /// Returns an error if the discovery call fails.
    pub async fn fetch(
        &self,
        transport: &Transport,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, EndpointSpec>> {
        let body = transport.execute(&self.discovery_request(), cancel).await?;
        let info = SynologyResponse::<ApiInfo>::decode(&body)?.into_result(API_INFO)?;
        Ok(info
            .into_iter()
            .map(|(api_name, entry)| {
                let spec = EndpointSpec {
                    api_name: api_name.clone(),
                    path: entry.path,
                    min_version: entry.min_version,
                    max_version: entry.max_version,
                };
                (api_name, spec)
            })
            .collect())
    }

    async fn discover(
        &self,
        transport: &Transport,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, EndpointSpec>> {
        debug!("Discovering {} APIs", self.required.len());
        let catalog = self.fetch(transport, cancel).await?;
        debug!("Discovery returned {} APIs", catalog.len());
        Ok(catalog)
    }
}

/// Finds `api_name` in `catalog`: an exact entry wins, otherwise the
/// lexicographically first entry whose name starts with `api_name`.
///
/// # Errors
///
/// Returns [`SynoError::EndpointNotFound`] when nothing matches.
pub fn lookup(catalog: &HashMap<String, EndpointSpec>, api_name: &str) -> Result<EndpointSpec> {
    if let Some(spec) = catalog.get(api_name) {
        return Ok(spec.clone());
    }
    catalog
        .iter()
        .filter(|(name, _)| name.starts_with(api_name))
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, spec)| spec.clone())
        .ok_or_else(|| SynoError::EndpointNotFound(api_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, max_version: u32) -> (String, EndpointSpec) {
        (
            name.to_string(),
            EndpointSpec {
                api_name: name.to_string(),
                path: "entry.cgi".into(),
                min_version: 1,
                max_version,
            },
        )
    }

    #[test]
    fn test_discovery_request() {
        let registry = EndpointRegistry::new(["SYNO.API.Auth", "SYNO.VideoStation2.Movie"]);
        assert_eq!(
            registry.discovery_request().encode(),
            "webapi/query.cgi?api=SYNO.API.Info&version=1&method=query\
             &query=SYNO.API.Auth%2CSYNO.VideoStation2.Movie"
        );
        assert!(registry.catalog().is_none());
    }

    #[test]
    fn test_lookup_exact_then_prefix() {
        let catalog: HashMap<_, _> = [
            spec("SYNO.VideoStation2.TVShow", 1),
            spec("SYNO.VideoStation2.TVShowEpisode", 2),
            spec("SYNO.VideoStation2.Streaming", 3),
        ]
        .into_iter()
        .collect();

        let exact = lookup(&catalog, "SYNO.VideoStation2.TVShow").unwrap();
        assert_eq!(exact.api_name, "SYNO.VideoStation2.TVShow");

        let prefix = lookup(&catalog, "SYNO.VideoStation2.Stream").unwrap();
        assert_eq!(prefix.api_name, "SYNO.VideoStation2.Streaming");

        let err = lookup(&catalog, "SYNO.DownloadStation2.Task").unwrap_err();
        assert!(matches!(err, SynoError::EndpointNotFound(name) if name == "SYNO.DownloadStation2.Task"));
    }
}
