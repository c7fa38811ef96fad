//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a task
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a fresh random task id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Task status
///
/// Tasks move `waiting → processing → {completed, error}` and never leave a
/// terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Admitted and waiting for a worker
    Waiting,
    /// A worker is running the task
    Processing,
    /// Finished with a result artifact
    Completed,
    /// Finished with an error
    Error,
}

impl TaskStatus {
    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Waiting, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Error)
        )
    }

    /// Lowercase name as stored in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Waiting => "waiting",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability granted to an API key
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Create new keys
    CreateKey,
    /// Delete keys
    DeleteKey,
    /// Read a single key
    GetKey,
    /// List all keys
    GetKeys,
    /// Submit video fetches
    GetVideo,
    /// Submit audio fetches
    GetAudio,
    /// Submit live video fetches
    GetLiveVideo,
    /// Submit live audio fetches
    GetLiveAudio,
    /// Submit metadata fetches
    GetInfo,
}

impl Permission {
    /// Every permission, granted to the bootstrap admin key
    pub const ALL: [Permission; 9] = [
        Permission::CreateKey,
        Permission::DeleteKey,
        Permission::GetKey,
        Permission::GetKeys,
        Permission::GetVideo,
        Permission::GetAudio,
        Permission::GetLiveVideo,
        Permission::GetLiveAudio,
        Permission::GetInfo,
    ];

    /// Snake-case name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CreateKey => "create_key",
            Permission::DeleteKey => "delete_key",
            Permission::GetKey => "get_key",
            Permission::GetKeys => "get_keys",
            Permission::GetVideo => "get_video",
            Permission::GetAudio => "get_audio",
            Permission::GetLiveVideo => "get_live_video",
            Permission::GetLiveAudio => "get_live_audio",
            Permission::GetInfo => "get_info",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_video_format() -> String {
    "bestvideo".to_string()
}

fn default_audio_format() -> String {
    "bestaudio".to_string()
}

/// What a task should fetch
///
/// Each variant carries exactly the fields its handler needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum TaskRequest {
    /// Download video and audio, merged into one container
    FetchVideo {
        /// Source locator
        url: String,
        /// Video format selector (default: "bestvideo")
        #[serde(default = "default_video_format")]
        video_format: String,
        /// Audio format selector (default: "bestaudio")
        #[serde(default = "default_audio_format")]
        audio_format: String,
        /// Clip start (HH:MM:SS)
        #[serde(default)]
        start_time: Option<String>,
        /// Clip end (HH:MM:SS)
        #[serde(default)]
        end_time: Option<String>,
        /// Re-encode around cut points so the clip starts on a keyframe
        #[serde(default)]
        force_keyframes: bool,
    },
    /// Download audio only
    FetchAudio {
        /// Source locator
        url: String,
        /// Audio format selector (default: "bestaudio")
        #[serde(default = "default_audio_format")]
        audio_format: String,
        /// Clip start (HH:MM:SS)
        #[serde(default)]
        start_time: Option<String>,
        /// Clip end (HH:MM:SS)
        #[serde(default)]
        end_time: Option<String>,
        /// Re-encode around cut points so the clip starts on a keyframe
        #[serde(default)]
        force_keyframes: bool,
    },
    /// Fetch the metadata document only
    FetchInfo {
        /// Source locator
        url: String,
    },
    /// Record a window of a live video stream
    FetchLiveVideo {
        /// Source locator
        url: String,
        /// Offset into the stream in seconds
        #[serde(default)]
        start: u64,
        /// Length of the recording in seconds
        duration: u64,
        /// Video format selector (default: "bestvideo")
        #[serde(default = "default_video_format")]
        video_format: String,
        /// Audio format selector (default: "bestaudio")
        #[serde(default = "default_audio_format")]
        audio_format: String,
    },
    /// Record a window of a live audio stream
    FetchLiveAudio {
        /// Source locator
        url: String,
        /// Offset into the stream in seconds
        #[serde(default)]
        start: u64,
        /// Length of the recording in seconds
        duration: u64,
        /// Audio format selector (default: "bestaudio")
        #[serde(default = "default_audio_format")]
        audio_format: String,
    },
}

impl TaskRequest {
    /// Wire name of the task type
    pub fn task_type(&self) -> &'static str {
        match self {
            TaskRequest::FetchVideo { .. } => "fetch_video",
            TaskRequest::FetchAudio { .. } => "fetch_audio",
            TaskRequest::FetchInfo { .. } => "fetch_info",
            TaskRequest::FetchLiveVideo { .. } => "fetch_live_video",
            TaskRequest::FetchLiveAudio { .. } => "fetch_live_audio",
        }
    }

    /// Permission a key needs to submit this task
    pub fn required_permission(&self) -> Permission {
        match self {
            TaskRequest::FetchVideo { .. } => Permission::GetVideo,
            TaskRequest::FetchAudio { .. } => Permission::GetAudio,
            TaskRequest::FetchInfo { .. } => Permission::GetInfo,
            TaskRequest::FetchLiveVideo { .. } => Permission::GetLiveVideo,
            TaskRequest::FetchLiveAudio { .. } => Permission::GetLiveAudio,
        }
    }

    /// Source locator
    pub fn url(&self) -> &str {
        match self {
            TaskRequest::FetchVideo { url, .. }
            | TaskRequest::FetchAudio { url, .. }
            | TaskRequest::FetchInfo { url }
            | TaskRequest::FetchLiveVideo { url, .. }
            | TaskRequest::FetchLiveAudio { url, .. } => url,
        }
    }
}

/// Task record, the single source of truth for a task's state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskRecord {
    /// Task id
    pub id: TaskId,
    /// Name of the key that submitted the task
    pub key_name: String,
    /// What to fetch
    pub request: TaskRequest,
    /// Network route override (proxy URL)
    #[serde(default)]
    pub proxy: Option<String>,
    /// Current status
    pub status: TaskStatus,
    /// Progress percentage (0.0 to 100.0), only meaningful while processing
    #[serde(default)]
    pub progress: Option<f32>,
    /// Result artifact path relative to the download root (`<task-id>/<file>`)
    #[serde(default)]
    pub file: Option<String>,
    /// Failure description
    #[serde(default)]
    pub error: Option<String>,
    /// When the task was admitted
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal state
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a record in the initial `waiting` state
    pub fn new(key_name: impl Into<String>, request: TaskRequest, proxy: Option<String>) -> Self {
        Self {
            id: TaskId::new(),
            key_name: key_name.into(),
            request,
            proxy,
            status: TaskStatus::Waiting,
            progress: None,
            file: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// One reservation against a key's memory quota
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MemorySample {
    /// When the reservation was made
    pub timestamp: DateTime<Utc>,
    /// Reserved bytes
    pub size: u64,
}

/// API key record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Unique key name
    pub name: String,
    /// Secret token presented in the `X-API-Key` header
    pub key: String,
    /// Granted permissions
    pub permissions: BTreeSet<Permission>,
    /// Rolling window of memory reservations
    #[serde(default)]
    pub memory_usage: Vec<MemorySample>,
}

impl KeyRecord {
    /// Whether the key holds `permission`
    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Public view of a key (never includes the token)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KeyInfo {
    /// Unique key name
    pub name: String,
    /// Granted permissions
    pub permissions: Vec<Permission>,
    /// Bytes currently reserved inside the memory window
    pub memory_in_use: u64,
}

/// Half-open time interval `[start, end)` in seconds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeRange {
    /// Inclusive start in seconds
    pub start: f64,
    /// Exclusive end in seconds
    pub end: f64,
}

/// Event emitted during a task's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task admitted in the waiting state
    Queued {
        /// Task id
        id: TaskId,
        /// Task type name
        task_type: String,
    },
    /// A worker picked the task up
    Started {
        /// Task id
        id: TaskId,
    },
    /// Progress update
    Progress {
        /// Task id
        id: TaskId,
        /// Percentage (0.0 to 100.0)
        percent: f32,
    },
    /// Task completed
    Completed {
        /// Task id
        id: TaskId,
        /// Result artifact path
        file: String,
    },
    /// Task failed
    Failed {
        /// Task id
        id: TaskId,
        /// Failure description
        error: String,
    },
    /// Task record and artifacts removed
    Removed {
        /// Task id
        id: TaskId,
    },
    /// The scheduler is shutting down
    Shutdown,
}
