use chrono::serde::ts_seconds;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::codes::ErrorKind;

/// Collection of download tasks
#[derive(Deserialize, Debug)]
pub struct Tasks {
    /// Index of the first task in this page, `0` when the server omits it
    #[serde(default)]
    pub offset: u32,
    pub task: Vec<Task>,
    /// Number of tasks on the server, across all pages
    pub total: u32,
}

/// Detailed information about specific tasks
#[derive(Deserialize, Debug)]
pub struct TaskInfo {
    pub task: Vec<Task>,
}

/// Individual download task information
#[derive(Deserialize, Debug)]
pub struct Task {
    /// Unique identifier for the task
    pub id: String,
    /// Owner of the task; empty when the listing leaves it out
    #[serde(default)]
    pub username: String,
    /// Type of download task (e.g., "bt" for `BitTorrent`)
    #[serde(rename = "type")]
    pub task_type: String,
    /// Task title/name
    pub title: String,
    /// Total size in bytes
    pub size: u64,
    /// Current status of the task
    pub status: TaskStatus,
    /// Extra task details, absent unless the task is erroring or extracting
    #[serde(default)]
    pub status_extra: Option<StatusExtra>,
    /// Additional detailed information about the task, present when
    /// requested through `additional`
    #[serde(default)]
    pub additional: Option<AdditionalTaskInfo>,
}

/// Extra task details
#[derive(Deserialize, Debug)]
pub struct StatusExtra {
    pub error_detail: Option<String>,
    pub unzip_progress: Option<i32>,
}

/// Additional detailed information about a task
#[derive(Deserialize, Default, Debug)]
pub struct AdditionalTaskInfo {
    pub detail: Option<Detail>,
    pub file: Option<Vec<File>>,
    pub peer: Option<Vec<Peer>>,
    pub tracker: Option<Vec<Tracker>>,
    pub transfer: Option<Transfer>,
}

/// Detailed task information
#[derive(Deserialize, Debug)]
pub struct Detail {
    #[serde(with = "ts_seconds")]
    pub completed_time: DateTime<Utc>,
    pub connected_leechers: u32,
    pub connected_peers: u32,
    pub connected_seeders: u32,
    #[serde(with = "ts_seconds")]
    pub created_time: DateTime<Utc>,
    pub destination: String,
    pub seed_elapsed: u64,
    #[serde(with = "ts_seconds")]
    pub started_time: DateTime<Utc>,
    pub total_peers: u32,
    pub total_pieces: u32,
    pub uri: String,
    pub unzip_password: Option<String>,
    pub waiting_seconds: u32,
}

/// Information about a file within a download task
#[derive(Deserialize, Debug)]
pub struct File {
    pub filename: String,
    pub index: u32,
    pub priority: String,
    pub size: u64,
    pub size_downloaded: u64,
    pub wanted: bool,
}

/// Information about a connected peer
#[derive(Deserialize, Debug)]
pub struct Peer {
    pub address: String,
    pub agent: String,
    pub progress: f32,
    pub speed_download: u64,
    pub speed_upload: u64,
}

/// Information about a tracker
#[derive(Deserialize, Debug)]
pub struct Tracker {
    pub peers: i32,
    pub seeds: i32,
    pub status: String,
    pub update_timer: u32,
    pub url: String,
}

/// Transfer statistics
#[derive(Deserialize, Default, Debug)]
pub struct Transfer {
    pub downloaded_pieces: u32,
    pub size_downloaded: u64,
    pub size_uploaded: u64,
    pub speed_download: u64,
    pub speed_upload: u64,
}

/// Download task status enum
#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskStatus {
    Waiting = 1,
    Downloading = 2,
    Paused = 3,
    Finishing = 4,
    Finished = 5,
    HashChecking = 6,
    PreSeeding = 7,
    Seeding = 8,
    FilehostingWaiting = 9,
    Extracting = 10,
    Preprocessing = 11,
    PreprocessPass = 12,
    Downloaded = 13,
    Postprocessing = 14,
    CaptchaNeeded = 15,
    Error = 101,
    ErrorBrokenLink = 102,
    ErrorDestNoExist = 103,
    ErrorDestDeny = 104,
    ErrorDiskFull = 105,
    ErrorQuotaReached = 106,
    ErrorTimeout = 107,
    ErrorExceedMaxFsSize = 108,
    ErrorExceedMaxTempFsSize = 109,
    ErrorExceedMaxDestFsSize = 110,
    ErrorNameTooLongEncryption = 111,
    ErrorNameTooLong = 112,
    ErrorTorrentDuplicate = 113,
    ErrorFileNoExist = 114,
    ErrorRequiredPremium = 115,
    ErrorNotSupportType = 116,
    ErrorFtpEncryptionNotSupportType = 117,
    ErrorExtractFail = 118,
    ErrorExtractWrongPassword = 119,
    ErrorExtractInvalidArchive = 120,
    ErrorExtractQuotaReached = 121,
    ErrorExtractDiskFull = 122,
    ErrorTorrentInvalid = 123,
    ErrorRequiredAccount = 124,
    ErrorTryItLater = 125,
    ErrorEncryption = 126,
    ErrorMissingPython = 127,
    ErrorPrivateVideo = 128,
    ErrorExtractFolderNotExist = 129,
    ErrorNzbMissingArticle = 130,
    ErrorEd2KLinkDuplicate = 131,
    ErrorDestFileDuplicate = 132,
    ErrorParchiveRepairFailed = 133,
    ErrorInvalidAccountPassword = 134,
}

/// Result of `SYNO.DownloadStation2.Task.Complete`
#[derive(Deserialize, Debug)]
pub struct TaskCompleted {
    pub task_id: String,
}

/// Ids of the tasks (or pending task lists) a create call produced
#[derive(Deserialize, Debug, Default)]
pub struct TaskCreated {
    /// Pending lists awaiting file selection; empty with `create_list=false`
    #[serde(default)]
    pub list_id: Vec<String>,
    /// Tasks started right away
    #[serde(default)]
    pub task_id: Vec<String>,
}

/// Per-task outcome of a pause/resume/delete call
#[derive(Deserialize, Debug, Default)]
pub struct TaskOperation {
    /// Tasks the operation could not be applied to; empty on full success
    #[serde(default)]
    pub failed_task: Vec<FailedTask>,
}

impl TaskOperation {
    /// Failed task ids paired with their error kind
    pub fn failures(&self) -> impl Iterator<Item = (&str, ErrorKind)> {
        self.failed_task
            .iter()
            .map(|f| (f.id.as_str(), ErrorKind::classify(super::API_TASK, f.error)))
    }
}

#[derive(Deserialize, Debug)]
pub struct FailedTask {
    pub error: i32,
    pub id: String,
}

impl TaskStatus {
    /// `true` for every `Error*` status
    #[must_use]
    pub fn is_error(self) -> bool {
        self as u8 >= TaskStatus::Error as u8
    }

    /// `true` while data is still moving in either direction
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            TaskStatus::Downloading | TaskStatus::Seeding | TaskStatus::Extracting
        )
    }
}
