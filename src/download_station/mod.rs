//! Download Station task operations.
//!
//! ```rust,no_run
//! use syno_station::client::{Capability, SynoClient};
//! use syno_station::session::LoginRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> syno_station::Result<()> {
//! let client = SynoClient::builder()
//!     .host("nas")
//!     .capability(Capability::download_station())
//!     .build()?;
//! let cancel = CancellationToken::new();
//! client.login(&LoginRequest::new("admin", "secret"), &cancel).await?;
//!
//! let tasks = client.download_station().get_tasks(&cancel).await?;
//! for task in tasks.task {
//!     println!("{} {:?} {}", task.title, task.status, task.calculate_size());
//! }
//! # Ok(())
//! # }
//! ```

pub mod entities;
pub mod utils;

use crate::client::SynoClient;
use crate::error::{Result, SynoError};
use crate::query::ListOptions;
use entities::TaskStatus::Finished;
use entities::{TaskCompleted, TaskCreated, TaskInfo, TaskOperation, Tasks};
use log::debug;
use serde::de::IgnoredAny;
use std::io::Cursor;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Session scope name sent at login/logout
pub const SESSION_NAME: &str = "DownloadStation";

pub const API_TASK: &str = "SYNO.DownloadStation2.Task";
pub const API_TASK_COMPLETE: &str = "SYNO.DownloadStation2.Task.Complete";

pub const REQUIRED_APIS: &[&str] = &[API_TASK, API_TASK_COMPLETE];

const TASK_VERSION: u32 = 2;
const TASK_COMPLETE_VERSION: u32 = 1;
const ADDITIONAL: &str = r#"["transfer","detail"]"#;

/// Download Station operations over a [`SynoClient`]
#[derive(Debug, Clone, Copy)]
pub struct DownloadStation<'a> {
    client: &'a SynoClient,
}

impl<'a> DownloadStation<'a> {
    pub(crate) fn new(client: &'a SynoClient) -> Self {
        Self { client }
    }

    /// Gets all Download Station tasks
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails or is canceled
    /// - API returns an error response
    /// - Response cannot be parsed
    /// - Session is invalid or expired
    pub async fn get_tasks(&self, cancel: &CancellationToken) -> Result<Tasks> {
        self.list_tasks(&ListOptions::default(), cancel).await
    }

    /// Gets one page of tasks. Sorting is not supported by the task API and
    /// is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `options` asks for sorting or an invalid page size
    /// - Network request fails or is canceled
    /// - API returns an error response
    pub async fn list_tasks(
        &self,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Tasks> {
        if options.sort_by.is_some() {
            return Err(SynoError::InvalidArgument(
                "Download tasks cannot be sorted by the server".into(),
            ));
        }
        let request = self
            .client
            .request(API_TASK, "list", TASK_VERSION, cancel)
            .await?;
        let request = options.apply(request)?.param("additional", ADDITIONAL);
        self.client.call(request, cancel).await
    }

    /// Gets detailed information about specific task(s)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - IDs slice is empty
    /// - Network request fails or is canceled
    /// - API returns an error response
    pub async fn get_task(&self, ids: &[&str], cancel: &CancellationToken) -> Result<TaskInfo> {
        if ids.is_empty() {
            return Err(SynoError::InvalidArgument("Task IDs cannot be empty".into()));
        }

        let request = self
            .client
            .request(API_TASK, "get", TASK_VERSION, cancel)
            .await?
            .param("id", ids.join(","))
            .param("additional", ADDITIONAL);
        self.client.call(request, cancel).await
    }

    /// Creates a new download task from a URI (HTTP/HTTPS URL or magnet link)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - URI or destination is empty
    /// - URI doesn't start with http://, https://, or magnet:
    /// - Network request fails or is canceled
    /// - API returns an error response
    pub async fn create_task(
        &self,
        uri: &str,
        destination: &str,
        cancel: &CancellationToken,
    ) -> Result<TaskCreated> {
        if uri.is_empty() {
            return Err(SynoError::InvalidArgument("URI cannot be empty".into()));
        }
        if destination.is_empty() {
            return Err(SynoError::InvalidArgument(
                "Destination path cannot be empty".into(),
            ));
        }
        if !["http://", "https://", "magnet:"]
            .iter()
            .any(|scheme| uri.starts_with(scheme))
        {
            return Err(SynoError::InvalidArgument(format!(
                "URI must start with http://, https://, or magnet:, got: {uri}"
            )));
        }

        debug!("Creating download task. URI: {uri}, Destination: {destination}");

        let request = self
            .client
            .request(API_TASK, "create", TASK_VERSION, cancel)
            .await?
            .json_param("type", &"url")
            .and_then(|r| r.json_param("destination", &destination))
            .and_then(|r| r.json_param("url", &[uri]))
            .map_err(|e| SynoError::InvalidArgument(e.to_string()))?
            .param("create_list", "false");
        self.client.call(request, cancel).await
    }

    /// Creates a new download task from a torrent file read from `file`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File name or destination is empty
    /// - Network request fails or is canceled
    /// - API returns an error response, e.g. the torrent is invalid
    pub async fn create_task_from_file<R>(
        &self,
        file: R,
        file_name: &str,
        destination: &str,
        cancel: &CancellationToken,
    ) -> Result<TaskCreated>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        if file_name.is_empty() {
            return Err(SynoError::InvalidArgument("File name cannot be empty".into()));
        }
        if destination.is_empty() {
            return Err(SynoError::InvalidArgument(
                "Destination path cannot be empty".into(),
            ));
        }
        if !file_name.ends_with(".torrent") {
            debug!("File name does not end with .torrent extension: {file_name}");
        }

        let request = self
            .client
            .request(API_TASK, "create", TASK_VERSION, cancel)
            .await?
            .json_param("type", &"file")
            .and_then(|r| r.json_param("file", &["torrent"]))
            .and_then(|r| r.json_param("destination", &destination))
            .map_err(|e| SynoError::InvalidArgument(e.to_string()))?
            .param("create_list", "false");

        self.client
            .upload(request, file_name, "torrent", file, cancel)
            .await
    }

    /// [`Self::create_task_from_file`] for an in-memory torrent
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_task_from_file`], and fails if `file_data` is empty.
    pub async fn create_task_from_bytes(
        &self,
        file_data: Vec<u8>,
        file_name: &str,
        destination: &str,
        cancel: &CancellationToken,
    ) -> Result<TaskCreated> {
        if file_data.is_empty() {
            return Err(SynoError::InvalidArgument("File data cannot be empty".into()));
        }
        debug!(
            "Creating download task from file. Name: {}, Size: {} bytes",
            file_name,
            file_data.len()
        );
        self.create_task_from_file(Cursor::new(file_data), file_name, destination, cancel)
            .await
    }

    /// Pause a specific task
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be paused or the call fails.
    pub async fn pause(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let request = self
            .client
            .request(API_TASK, "pause", TASK_VERSION, cancel)
            .await?
            .param("id", id);
        self.client.call::<IgnoredAny>(request, cancel).await?;
        Ok(())
    }

    /// Resume a specific task
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be resumed or the call fails.
    pub async fn resume(&self, id: &str, cancel: &CancellationToken) -> Result<TaskOperation> {
        let request = self
            .client
            .request(API_TASK, "resume", TASK_VERSION, cancel)
            .await?
            .param("id", id);
        self.client.call(request, cancel).await
    }

    /// Complete a specific task
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be completed or the call fails.
    pub async fn complete(&self, id: &str, cancel: &CancellationToken) -> Result<TaskCompleted> {
        let request = self
            .client
            .request(API_TASK_COMPLETE, "start", TASK_COMPLETE_VERSION, cancel)
            .await?
            .param("id", id);
        self.client.call(request, cancel).await
    }

    /// Delete a specific task
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be deleted or the call fails.
    pub async fn delete_task(
        &self,
        id: &str,
        force_complete: bool,
        cancel: &CancellationToken,
    ) -> Result<TaskOperation> {
        let request = self
            .client
            .request(API_TASK, "delete", TASK_VERSION, cancel)
            .await?
            .param("id", id)
            .param("force_complete", force_complete);
        self.client.call(request, cancel).await
    }

    /// Clear completed tasks
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn clear_completed(&self, cancel: &CancellationToken) -> Result<()> {
        let request = self
            .client
            .request(API_TASK, "delete_condition", TASK_VERSION, cancel)
            .await?
            .param("status", Finished as u8);
        self.client.call::<IgnoredAny>(request, cancel).await?;
        Ok(())
    }
}
