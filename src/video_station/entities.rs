use serde::{Deserialize, Serialize};
use std::fmt;

/// One page of video libraries
#[derive(Deserialize, Debug, Clone)]
pub struct Libraries {
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u32,
    pub libraries: Vec<Library>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub id: u32,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LibraryKind,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
    Movie,
    Tvshow,
    HomeVideo,
    TvRecord,
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Movies {
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u32,
    pub movies: Vec<Movie>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub sort_title: String,
    /// Release date as sent by the server, `YYYY-MM-DD`
    #[serde(default)]
    pub original_available: Option<String>,
    /// Key for [`super::VideoStation::backdrop`]
    #[serde(default)]
    pub mapper_id: Option<u64>,
    #[serde(default)]
    pub library_id: u32,
    #[serde(default)]
    pub additional: Option<MediaAdditional>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TvShows {
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u32,
    pub tvshows: Vec<TvShow>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TvShow {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub sort_title: String,
    #[serde(default)]
    pub original_available: Option<String>,
    #[serde(default)]
    pub mapper_id: Option<u64>,
    #[serde(default)]
    pub library_id: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Episodes {
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u32,
    pub episodes: Vec<Episode>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Episode {
    pub id: u64,
    pub tvshow_id: u64,
    #[serde(default)]
    pub season: u32,
    #[serde(default)]
    pub episode: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub additional: Option<MediaAdditional>,
}

/// Extra fields requested through `additional`
#[derive(Deserialize, Debug, Clone, Default)]
pub struct MediaAdditional {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub file: Vec<VideoFile>,
    /// Share already watched, `0.0..=1.0`
    #[serde(default)]
    pub watched_ratio: f64,
}

/// A playable file behind a movie or episode
#[derive(Deserialize, Debug, Clone)]
pub struct VideoFile {
    pub id: u64,
    #[serde(default)]
    pub path: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default)]
    pub resolutionx: u32,
    #[serde(default)]
    pub resolutiony: u32,
    #[serde(default)]
    pub video_codec: String,
    #[serde(default)]
    pub audio_codec: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Subtitles {
    pub subtitles: Vec<Subtitle>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub format: String,
    /// Muxed into the video container rather than a side file
    #[serde(default)]
    pub embedded: bool,
}

/// Delivery mode of a video stream
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreamFormat {
    /// Source file passed through unchanged
    #[default]
    Raw,
    Hls,
    HlsRemux,
}

impl StreamFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Hls => "hls",
            Self::HlsRemux => "hls_remux",
        }
    }

    #[must_use]
    pub fn is_transcoded(self) -> bool {
        self != Self::Raw
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open server-side stream. Has to be closed with
/// [`super::VideoStation::close_stream`].
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StreamSession {
    pub stream_id: String,
    pub format: StreamFormat,
}

/// Artwork owners understood by the poster API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosterKind {
    Movie,
    TvShow,
    Episode,
}

impl PosterKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::TvShow => "tvshow",
            Self::Episode => "tvshow_episode",
        }
    }
}
