//! Video Station media operations.
//!
//! Streams follow an open/stream/close exchange. [`VideoStation::with_stream`]
//! wraps it and always closes the server-side stream:
//!
//! ```rust,no_run
//! use syno_station::client::{Capability, SynoClient};
//! use syno_station::session::LoginRequest;
//! use syno_station::video_station::entities::StreamFormat;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> syno_station::Result<()> {
//! let client = SynoClient::builder()
//!     .host("nas")
//!     .capability(Capability::video_station())
//!     .build()?;
//! let token = CancellationToken::new();
//! let cancel = &token;
//! client.login(&LoginRequest::new("admin", "secret"), cancel).await?;
//!
//! let video = client.video_station();
//! let bytes = video
//!     .with_stream(300, StreamFormat::Hls, cancel, |session| async move {
//!         video.stream(&session, cancel).await?.bytes(cancel).await
//!     })
//!     .await?;
//! println!("{} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```

pub mod entities;

use crate::cancel::{INTERACTIVE_TIMEOUT, with_deadline};
use crate::client::SynoClient;
use crate::error::{ApplicationError, Result, SynoError};
use crate::query::ListOptions;
use crate::transport::MediaStream;
use entities::{
    Episodes, Libraries, Movies, PosterKind, StreamFormat, StreamSession, Subtitles, TvShows,
};
use log::{debug, warn};
use serde::de::IgnoredAny;
use serde_json::json;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Session scope name sent at login/logout
pub const SESSION_NAME: &str = "VideoStation";

pub const API_LIBRARY: &str = "SYNO.VideoStation2.Library";
pub const API_MOVIE: &str = "SYNO.VideoStation2.Movie";
pub const API_TV_SHOW: &str = "SYNO.VideoStation2.TVShow";
pub const API_EPISODE: &str = "SYNO.VideoStation2.TVShowEpisode";
pub const API_POSTER: &str = "SYNO.VideoStation2.Poster";
pub const API_BACKDROP: &str = "SYNO.VideoStation2.Backdrop";
pub const API_SUBTITLE: &str = "SYNO.VideoStation2.Subtitle";
pub const API_STREAMING: &str = "SYNO.VideoStation2.Streaming";
pub const API_WATCH_STATUS: &str = "SYNO.VideoStation2.WatchStatus";

pub const REQUIRED_APIS: &[&str] = &[
    API_LIBRARY,
    API_MOVIE,
    API_TV_SHOW,
    API_EPISODE,
    API_POSTER,
    API_BACKDROP,
    API_SUBTITLE,
    API_STREAMING,
    API_WATCH_STATUS,
];

const VERSION: u32 = 1;
const MEDIA_ADDITIONAL: &str = r#"["summary","file","watched_ratio"]"#;

/// Video Station operations over a [`SynoClient`]
#[derive(Debug, Clone, Copy)]
pub struct VideoStation<'a> {
    client: &'a SynoClient,
}

impl<'a> VideoStation<'a> {
    pub(crate) fn new(client: &'a SynoClient) -> Self {
        Self { client }
    }

    /// Lists the libraries visible to the logged-in account
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `options` is invalid
    /// - Network request fails or is canceled
    /// - API returns an error response
    pub async fn list_libraries(
        &self,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Libraries> {
        let request = self
            .client
            .request(API_LIBRARY, "list", VERSION, cancel)
            .await?;
        self.client.call(options.apply(request)?, cancel).await
    }

    /// [`Self::list_libraries`] for accounts that must see at least one library
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::NoVideoLibraries`] when the list is empty,
    /// otherwise as [`Self::list_libraries`].
    pub async fn require_libraries(&self, cancel: &CancellationToken) -> Result<Libraries> {
        let libraries = self.list_libraries(&ListOptions::default(), cancel).await?;
        if libraries.libraries.is_empty() {
            return Err(ApplicationError::NoVideoLibraries.into());
        }
        Ok(libraries)
    }

    /// # Errors
    ///
    /// Returns an error if `options` is invalid or the call fails.
    pub async fn list_movies(
        &self,
        library_id: u32,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Movies> {
        let request = self
            .client
            .request(API_MOVIE, "list", VERSION, cancel)
            .await?
            .param("library_id", library_id);
        let request = options.apply(request)?.param("additional", MEDIA_ADDITIONAL);
        self.client.call(request, cancel).await
    }

    /// # Errors
    ///
    /// Returns an error if `options` is invalid or the call fails.
    pub async fn list_tv_shows(
        &self,
        library_id: u32,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<TvShows> {
        let request = self
            .client
            .request(API_TV_SHOW, "list", VERSION, cancel)
            .await?
            .param("library_id", library_id);
        self.client.call(options.apply(request)?, cancel).await
    }

    /// # Errors
    ///
    /// Returns an error if `options` is invalid or the call fails.
    pub async fn list_episodes(
        &self,
        library_id: u32,
        tvshow_id: u64,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> Result<Episodes> {
        let request = self
            .client
            .request(API_EPISODE, "list", VERSION, cancel)
            .await?
            .param("library_id", library_id)
            .param("tvshow_id", tvshow_id);
        let request = options.apply(request)?.param("additional", MEDIA_ADDITIONAL);
        self.client.call(request, cancel).await
    }

    /// Opens the poster image of a movie, show or episode
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the server answers with an
    /// envelope instead of an image.
    pub async fn poster(
        &self,
        kind: PosterKind,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<MediaStream> {
        let request = self
            .client
            .request(API_POSTER, "get", VERSION, cancel)
            .await?
            .param("id", id)
            .param("type", kind.as_str());
        self.client.open_stream(request, cancel).await
    }

    /// Opens the backdrop image for a `mapper_id`
    ///
    /// # Errors
    ///
    /// See [`Self::poster`].
    pub async fn backdrop(&self, mapper_id: u64, cancel: &CancellationToken) -> Result<MediaStream> {
        let request = self
            .client
            .request(API_BACKDROP, "get", VERSION, cancel)
            .await?
            .param("mapper_id", mapper_id);
        self.client.open_stream(request, cancel).await
    }

    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn list_subtitles(&self, file_id: u64, cancel: &CancellationToken) -> Result<Subtitles> {
        let request = self
            .client
            .request(API_SUBTITLE, "list", VERSION, cancel)
            .await?
            .param("id", file_id);
        self.client.call(request, cancel).await
    }

    /// Opens the content of one subtitle track
    ///
    /// # Errors
    ///
    /// See [`Self::poster`].
    pub async fn fetch_subtitle(
        &self,
        file_id: u64,
        subtitle_id: &str,
        cancel: &CancellationToken,
    ) -> Result<MediaStream> {
        let request = self
            .client
            .request(API_SUBTITLE, "get", VERSION, cancel)
            .await?
            .param("id", file_id)
            .param("subtitle_id", subtitle_id);
        self.client.open_stream(request, cancel).await
    }

    /// Opens a stream of `file_id`. The returned session must be closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails. A rejected transcode is reported
    /// through [`SynoError::is_transcoding_rejected`].
    pub async fn open_stream(
        &self,
        file_id: u64,
        format: StreamFormat,
        cancel: &CancellationToken,
    ) -> Result<StreamSession> {
        let request = self
            .client
            .request(API_STREAMING, "open", VERSION, cancel)
            .await?
            .json_param("file", &json!({ "id": file_id }))
            .map_err(|e| SynoError::InvalidArgument(e.to_string()))?
            .param("format", format);
        let session: StreamSession = self.client.call(request, cancel).await?;
        debug!(
            "Opened stream {} of file {file_id} as {}",
            session.stream_id, session.format
        );
        Ok(session)
    }

    /// [`Self::open_stream`], reopening with [`StreamFormat::Raw`] when the
    /// server cannot transcode the file
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt.
    pub async fn open_with_fallback(
        &self,
        file_id: u64,
        format: StreamFormat,
        cancel: &CancellationToken,
    ) -> Result<StreamSession> {
        match self.open_stream(file_id, format, cancel).await {
            Err(e) if format.is_transcoded() && e.is_transcoding_rejected() => {
                debug!("Transcoding {format} rejected for file {file_id}, retrying raw");
                self.open_stream(file_id, StreamFormat::Raw, cancel).await
            }
            result => result,
        }
    }

    /// Requests the media of an open stream
    ///
    /// # Errors
    ///
    /// See [`Self::poster`].
    pub async fn stream(
        &self,
        session: &StreamSession,
        cancel: &CancellationToken,
    ) -> Result<MediaStream> {
        let request = self
            .client
            .request(API_STREAMING, "stream", VERSION, cancel)
            .await?
            .param("stream_id", &session.stream_id)
            .param("format", session.format);
        self.client.open_stream(request, cancel).await
    }

    /// The authenticated request behind [`Self::stream`], for callers that
    /// hand the media URL to a player or fetch it themselves
    ///
    /// # Errors
    ///
    /// Returns an error if endpoint discovery fails.
    pub async fn stream_request(
        &self,
        session: &StreamSession,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Request> {
        let request = self
            .client
            .request(API_STREAMING, "stream", VERSION, cancel)
            .await?
            .param("stream_id", &session.stream_id)
            .param("format", session.format);
        self.client.prepare_stream(request).await
    }

    /// Releases an open stream on the server
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn close_stream(
        &self,
        session: &StreamSession,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let request = self
            .client
            .request(API_STREAMING, "close", VERSION, cancel)
            .await?
            .param("stream_id", &session.stream_id)
            .param("format", session.format);
        self.client.call::<IgnoredAny>(request, cancel).await?;
        debug!("Closed stream {}", session.stream_id);
        Ok(())
    }

    /// Opens a stream with [`Self::open_with_fallback`], hands it to
    /// `consume` and closes it afterwards.
    ///
    /// The close runs on its own token bounded by [`INTERACTIVE_TIMEOUT`], so
    /// it is attempted even when `cancel` fired during `consume`.
    ///
    /// # Errors
    ///
    /// Returns the error of `consume` if it failed, otherwise the error of
    /// the close call.
    pub async fn with_stream<T, F, Fut>(
        &self,
        file_id: u64,
        format: StreamFormat,
        cancel: &CancellationToken,
        consume: F,
    ) -> Result<T>
    where
        F: FnOnce(StreamSession) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = self.open_with_fallback(file_id, format, cancel).await?;
        let stream_id = session.stream_id.clone();

        let outcome = consume(session.clone()).await;
        let closed = with_deadline(
            INTERACTIVE_TIMEOUT,
            &CancellationToken::new(),
            |token| async move { self.close_stream(&session, &token).await },
        )
        .await;

        if let Err(e) = &closed {
            warn!("Failed to close stream {stream_id}: {e}");
        }
        let value = outcome?;
        closed?;
        Ok(value)
    }

    /// Stores the playback position of `file_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn set_watch_status(
        &self,
        file_id: u64,
        position_secs: u64,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let request = self
            .client
            .request(API_WATCH_STATUS, "setinfo", VERSION, cancel)
            .await?
            .param("id", file_id)
            .param("position", position_secs);
        self.client.call::<IgnoredAny>(request, cancel).await?;
        Ok(())
    }
}
