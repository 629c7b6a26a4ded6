//! Endpoint catalogue: paths, methods and call classes.

use crate::config::CallClass;
use crate::http::HttpMethod;

pub const CREATE_DETECT_TASK_PATH: &str = "/api/detect/create_detect_task";
pub const TASK_LIST_PATH: &str = "/api/detect/task_list";
pub const TASK_RESULT_PATH: &str = "/api/detect/get_task_result";
pub const TASK_DETAIL_PATH: &str = "/api/detect/get_task";
pub const ROUND_VIDEOS_PATH: &str = "/api/detect/get_round_videos";
pub const ALL_ROUND_VIDEOS_PATH: &str = "/api/detect/get_all_round_videos";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/user/logout";
pub const USER_INFO_PATH: &str = "/api/user/info";
pub const MENU_LIST_PATH: &str = "/api/user/menu";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    CreateDetectTask,
    TaskList,
    TaskResult { task_id: String },
    TaskDetail { task_id: String },
    RoundVideos { task_id: String, round: u32 },
    AllRoundVideos { task_id: String },
    Login,
    Logout,
    UserInfo,
    MenuList,
}

impl Endpoint {
    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::TaskList
            | Endpoint::TaskResult { .. }
            | Endpoint::TaskDetail { .. }
            | Endpoint::RoundVideos { .. }
            | Endpoint::AllRoundVideos { .. } => HttpMethod::Get,
            Endpoint::CreateDetectTask
            | Endpoint::Login
            | Endpoint::Logout
            | Endpoint::UserInfo
            | Endpoint::MenuList => HttpMethod::Post,
        }
    }

    /// Path relative to the base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::CreateDetectTask => CREATE_DETECT_TASK_PATH.to_string(),
            Endpoint::TaskList => TASK_LIST_PATH.to_string(),
            Endpoint::TaskResult { task_id } => format!("{TASK_RESULT_PATH}/{task_id}"),
            Endpoint::TaskDetail { task_id } => format!("{TASK_DETAIL_PATH}/{task_id}"),
            Endpoint::RoundVideos { task_id, round } => {
                format!("{ROUND_VIDEOS_PATH}/{task_id}/{round}")
            }
            Endpoint::AllRoundVideos { task_id } => format!("{ALL_ROUND_VIDEOS_PATH}/{task_id}"),
            Endpoint::Login => LOGIN_PATH.to_string(),
            Endpoint::Logout => LOGOUT_PATH.to_string(),
            Endpoint::UserInfo => USER_INFO_PATH.to_string(),
            Endpoint::MenuList => MENU_LIST_PATH.to_string(),
        }
    }

    pub fn call_class(&self) -> CallClass {
        match self {
            Endpoint::CreateDetectTask => CallClass::Submit,
            Endpoint::TaskResult { .. } | Endpoint::AllRoundVideos { .. } => CallClass::Report,
            Endpoint::TaskList | Endpoint::TaskDetail { .. } | Endpoint::RoundVideos { .. } => {
                CallClass::Lookup
            }
            Endpoint::Login | Endpoint::Logout | Endpoint::UserInfo | Endpoint::MenuList => {
                CallClass::Interactive
            }
        }
    }
}
