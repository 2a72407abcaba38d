//!# Synology Station API Client
//!
//! A Rust client library for the Synology Video Station and Download Station
//! Web APIs. Endpoints are discovered at runtime, sessions are scoped per
//! station, and every call takes a cancellation token.
//!
//! ## Features
//!
//! - Endpoint discovery through `SYNO.API.Info`, cached per client
//! - Login with two-step verification and trusted device ids
//! - Strictly ordered request parameters
//! - Typed error codes split into transport, protocol and client-side failures
//! - Download Station: list, create (URL, magnet or torrent upload), pause,
//!   resume, complete and delete tasks
//! - Video Station: libraries, movies, TV shows, episodes, artwork,
//!   subtitles, streaming with raw fallback and watch status
//! - Persisted login history and video quality preference over a pluggable store
//!
//! ## Usage example
//!
//! ```rust,no_run
//! use anyhow::Result;
//! use std::env;
//! use syno_station::client::{Capability, SynoClient};
//! use syno_station::session::LoginRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let client = SynoClient::builder()
//!         .host(env::var("SYNOLOGY_HOST")?)
//!         .capability(Capability::download_station())
//!         .build()?;
//!     let cancel = CancellationToken::new();
//!
//!     let login = LoginRequest::new(
//!         env::var("SYNOLOGY_USERNAME")?,
//!         env::var("SYNOLOGY_PASSWORD")?,
//!     );
//!     client.login(&login, &cancel).await?;
//!
//!     let tasks = client.download_station().get_tasks(&cancel).await?;
//!     for task in tasks.task {
//!         println!(
//!             "task: {}, title: {}, status: {:?}",
//!             task.id, task.title, task.status
//!         );
//!     }
//!
//!     client.logout(&cancel).await?;
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod client;
pub mod codes;
pub mod download_station;
pub mod entities;
pub mod error;
pub mod host;
pub mod query;
pub mod registry;
pub mod request;
pub mod session;
pub mod store;
pub mod transport;
pub mod video_station;

pub use error::{Result, SynoError};
