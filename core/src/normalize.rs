//! Per-family response normalizers.
//!
//! # Design
//! Each family parses the accepted body into an explicit shape enum whose
//! variants are tried in declared order; the first structural match wins.
//! Order matters because some shapes are subsets of others (a bare object
//! carrying `task_id` would also satisfy a loose wrapped check), so `detect`
//! is the only place the order lives. Matching is structural; record decoding
//! happens after a variant is chosen, so a bad record never demotes a
//! recognized shape.
//!
//! Policy per family:
//! - creation, report, detail: no match is fatal (`ShapeMismatch` with the
//!   raw body, or `Rejected` when the body explains itself);
//! - list: no match degrades to an empty list.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;
use crate::interceptor::{application_code, SUCCESS_CODE};
use crate::types::{
    CreatedTask, ReportSummary, TaskDetail, TaskInfo, TaskList, TaskListEntry, TaskReport, TaskStatus,
};

pub const CREATE_FAMILY: &str = "task creation";
pub const LIST_FAMILY: &str = "task list";
pub const REPORT_FAMILY: &str = "task report";
pub const DETAIL_FAMILY: &str = "task detail";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateShape {
    /// `{code: 20000, data: {task_id, ..}}`
    Wrapped(CreatedTask),
    /// `{task_id, ..}`
    Bare(CreatedTask),
    /// Neither, but the body carries a `message`.
    Message(String),
    Unrecognized,
}

impl CreateShape {
    pub fn detect(body: &Value) -> Self {
        if is_success(body) {
            if let Some(task_id) = body.get("data").and_then(task_id_of) {
                return CreateShape::Wrapped(CreatedTask { task_id });
            }
        }
        if let Some(task_id) = task_id_of(body) {
            return CreateShape::Bare(CreatedTask { task_id });
        }
        match body.get("message").and_then(Value::as_str) {
            Some(message) if !message.is_empty() => CreateShape::Message(message.to_string()),
            _ => CreateShape::Unrecognized,
        }
    }
}

pub fn created_task(body: &Value) -> Result<CreatedTask, ApiError> {
    match CreateShape::detect(body) {
        CreateShape::Wrapped(task) | CreateShape::Bare(task) => Ok(task),
        CreateShape::Message(message) => Err(ApiError::Rejected(message)),
        CreateShape::Unrecognized => Err(mismatch(CREATE_FAMILY, body)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListShape {
    /// `{code: 20000, data: {tasks: [..]}}`
    Wrapped(Vec<TaskListEntry>),
    /// `[..]`
    BareArray(Vec<TaskListEntry>),
    /// `{tasks: [..]}`
    TasksField(Vec<TaskListEntry>),
    Unrecognized,
}

impl ListShape {
    pub fn detect(body: &Value) -> Self {
        if is_success(body) {
            if let Some(rows) = body.get("data").and_then(|d| d.get("tasks")).and_then(Value::as_array) {
                return ListShape::Wrapped(entries(rows));
            }
        }
        if let Some(rows) = body.as_array() {
            return ListShape::BareArray(entries(rows));
        }
        if let Some(rows) = body.get("tasks").and_then(Value::as_array) {
            return ListShape::TasksField(entries(rows));
        }
        ListShape::Unrecognized
    }
}

/// Never fails: listing is best-effort.
pub fn task_list(body: &Value) -> TaskList {
    match ListShape::detect(body) {
        ListShape::Wrapped(tasks) | ListShape::BareArray(tasks) | ListShape::TasksField(tasks) => {
            TaskList { tasks }
        }
        ListShape::Unrecognized => {
            warn!(body = %body, "task list response has an unexpected format, showing no tasks");
            TaskList::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTaskInfo {
    task_id: String,
    status: TaskStatus,
    created_at: String,
    #[serde(default)]
    completed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReport {
    task_info: RawTaskInfo,
    summary: ReportSummary,
    #[serde(default)]
    evil_video_ids: Option<Vec<String>>,
}

/// Only the standard envelope is accepted.
pub fn task_report(body: &Value) -> Result<TaskReport, ApiError> {
    let data = match body.get("data") {
        Some(data) if is_success(body) && truthy(data) => data,
        _ => return Err(mismatch(REPORT_FAMILY, body)),
    };
    let raw: RawReport =
        serde_json::from_value(data.clone()).map_err(|_| mismatch(REPORT_FAMILY, body))?;
    let evil_video_ids = raw.evil_video_ids.unwrap_or_default();

    Ok(TaskReport {
        task_info: TaskInfo {
            task_id: raw.task_info.task_id,
            status: raw.task_info.status,
            created_at: raw.task_info.created_at,
            completed_at: raw.task_info.completed_at,
            evil_video_ids: evil_video_ids.clone(),
        },
        summary: raw.summary,
        evil_video_ids,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailShape<'a> {
    /// `{code: 20000, data: {..}}` with truthy `data`.
    Wrapped(&'a Value),
    /// An object with at least `task_id` and `status`.
    Bare(&'a Value),
    Unrecognized,
}

impl<'a> DetailShape<'a> {
    pub fn detect(body: &'a Value) -> Self {
        if is_success(body) {
            if let Some(data) = body.get("data").filter(|d| truthy(d)) {
                return DetailShape::Wrapped(data);
            }
        }
        let duck_typed = body
            .as_object()
            .is_some_and(|o| o.contains_key("task_id") && o.contains_key("status"));
        if duck_typed {
            return DetailShape::Bare(body);
        }
        DetailShape::Unrecognized
    }
}

pub fn task_detail(body: &Value) -> Result<TaskDetail, ApiError> {
    match DetailShape::detect(body) {
        DetailShape::Wrapped(record) | DetailShape::Bare(record) => {
            decode(record).ok_or_else(|| mismatch(DETAIL_FAMILY, body))
        }
        DetailShape::Unrecognized => Err(mismatch(DETAIL_FAMILY, body)),
    }
}

/// Strict `{data: T}` unwrap for endpoints with a single known shape.
pub fn envelope_data<T: DeserializeOwned>(family: &'static str, body: &Value) -> Result<T, ApiError> {
    body.get("data")
        .and_then(decode)
        .ok_or_else(|| mismatch(family, body))
}

pub(crate) fn mismatch(family: &'static str, body: &Value) -> ApiError {
    ApiError::ShapeMismatch {
        family,
        body: body.to_string(),
    }
}

fn is_success(body: &Value) -> bool {
    application_code(body) == Some(SUCCESS_CODE)
}

fn decode<T: DeserializeOwned>(value: &Value) -> Option<T> {
    serde_json::from_value(value.clone()).ok()
}

/// Rows that fail to decode are dropped one by one.
fn entries(rows: &[Value]) -> Vec<TaskListEntry> {
    rows.iter()
        .filter_map(|row| match serde_json::from_value(row.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(row = %row, error = %e, "skipping malformed task list row");
                None
            }
        })
        .collect()
}

/// Non-empty string ids, and numeric ids rendered as strings.
fn task_id_of(value: &Value) -> Option<String> {
    match value.get("task_id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
