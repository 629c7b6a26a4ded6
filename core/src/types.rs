//! Domain DTOs for the detection API.
//!
//! # Design
//! These are the canonical shapes callers receive. They mirror the backend's
//! schema but are defined independently of the mock-server crate; the
//! integration tests catch schema drift. Optional and count fields default so
//! a partially filled task record from an older backend still parses.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::http::HttpMethod;

/// Lifecycle of a detection task. Transitions happen server-side only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// A status string this client does not know yet.
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Other(s) => s,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => TaskStatus::Pending,
            "processing" => TaskStatus::Processing,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Other(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload for `create_detect_task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDetectTask {
    pub video_url: String,
}

/// Canonical result of task creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTask {
    pub task_id: String,
}

/// One row of the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskListEntry {
    #[serde(deserialize_with = "task_id")]
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evil_video_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub all_video_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<TaskListEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(deserialize_with = "task_id")]
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vd_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evil_video_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: String,
    pub status: TaskStatus,
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub evil_video_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_videos: u64,
    pub evil_videos: u64,
    pub normal_videos: u64,
}

/// Flattened detection report: the top-level `evil_video_ids` are also
/// merged into `task_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_info: TaskInfo,
    pub summary: ReportSummary,
    pub evil_video_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundVideo {
    pub vd_id: String,
    #[serde(default)]
    pub vd_title: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub likes: String,
    #[serde(default)]
    pub shares: String,
    #[serde(default)]
    pub collects: String,
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundVideos {
    pub task_id: String,
    pub round: u32,
    pub video_count: u64,
    pub videos: Vec<RoundVideo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub round: u32,
    pub video_count: u64,
    pub videos: Vec<RoundVideo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllRoundVideos {
    pub task_id: String,
    pub total_rounds: u64,
    pub rounds: Vec<Round>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub token: String,
    pub user: SessionUser,
}

/// Profile returned by `/api/user/info`. Only `role` is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub job: Option<String>,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub introduction: Option<String>,
    pub personal_website: Option<String>,
    pub job_name: Option<String>,
    pub organization_name: Option<String>,
    pub location_name: Option<String>,
    pub phone: Option<String>,
    pub registration_date: Option<String>,
    pub account_id: Option<u64>,
    pub certification: Option<u64>,
    pub role: String,
}

/// Menu routes are rendered by the UI as-is.
pub type MenuEntry = Value;

/// The request an `ApplicationResult` answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestConfig {
    pub method: HttpMethod,
    /// Endpoint path relative to the base URL.
    pub url: String,
    pub timeout: Duration,
}

/// Canonical envelope handed to callers. `data` always has the declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationResult<T> {
    pub data: T,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub config: RequestConfig,
}

/// Task ids arrive as strings or as numbers.
fn task_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("task_id must be a string or number, got {other}"))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
