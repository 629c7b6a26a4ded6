use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub mod config;

pub use config::{MockUser, ServerConfig};

pub const SUCCESS_CODE: i64 = 20000;
pub const ILLEGAL_TOKEN_CODE: i64 = 50008;

const VIDEO_URL_MARKER: &str = "douyin.com/video/";
const DEMO_VIDEO_IDS: [&str; 2] = ["74761888447113491", "74761888447113492"];

#[derive(Clone, Debug, Serialize)]
pub struct RoundVideo {
    pub vd_id: String,
    pub vd_title: String,
    pub create_time: String,
    pub author: String,
    pub likes: String,
    pub shares: String,
    pub collects: String,
    pub img_url: String,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Round {
    pub round: u32,
    pub video_count: usize,
    pub videos: Vec<RoundVideo>,
}

#[derive(Clone, Debug)]
pub struct DemoTask {
    pub task_id: String,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub video_ids: Vec<String>,
    pub evil_video_ids: Vec<String>,
    pub rounds: Vec<Round>,
    seq: u64,
}

impl DemoTask {
    fn new(video_ids: Vec<String>, seq: u64) -> Self {
        // Odd trailing digit marks a video as evil; keeps responses reproducible.
        let evil_video_ids = video_ids
            .iter()
            .filter(|id| id.chars().last().and_then(|c| c.to_digit(10)).is_some_and(|d| d % 2 == 1))
            .cloned()
            .collect();
        Self {
            task_id: Uuid::new_v4().to_string(),
            status: "processing".to_string(),
            created_at: now(),
            completed_at: None,
            video_ids,
            evil_video_ids,
            rounds: Vec::new(),
            seq,
        }
    }

    fn complete(&mut self) {
        self.rounds = (1..=2).map(demo_round).collect();
        self.status = "completed".to_string();
        self.completed_at = Some(now());
    }

    fn list_entry(&self) -> Value {
        json!({
            "task_id": self.task_id,
            "status": self.status,
            "created_at": self.created_at,
            "completed_at": self.completed_at,
            "evil_video_count": self.evil_video_ids.len(),
            "all_video_count": self.video_ids.len(),
        })
    }
}

#[derive(Deserialize)]
pub struct CreateTaskInput {
    pub video_url: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub type Tasks = Arc<RwLock<HashMap<String, DemoTask>>>;

#[derive(Clone)]
pub struct AppState {
    pub tasks: Tasks,
    /// Issued token -> user id.
    pub sessions: Arc<RwLock<HashMap<String, u64>>>,
    pub config: Arc<ServerConfig>,
    seq: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let seq = Arc::new(AtomicU64::new(0));
        let mut tasks = HashMap::new();
        seed(&mut tasks, &seq);
        Self {
            tasks: Arc::new(RwLock::new(tasks)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
            seq,
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    async fn user_for(&self, headers: &HeaderMap) -> Option<&MockUser> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))?;
        let user_id = *self.sessions.read().await.get(token)?;
        self.config.users.iter().find(|u| u.id == user_id)
    }
}

/// Two completed demo tasks, as the backend starts with.
fn seed(tasks: &mut HashMap<String, DemoTask>, seq: &AtomicU64) {
    for video_id in DEMO_VIDEO_IDS {
        let mut task = DemoTask::new(vec![video_id.to_string()], seq.fetch_add(1, Ordering::Relaxed));
        task.complete();
        tasks.insert(task.task_id.clone(), task);
    }
    info!("seeded {} demo tasks", tasks.len());
}

type ApiResponse = (StatusCode, Json<Value>);

fn ok(data: Value) -> ApiResponse {
    (StatusCode::OK, Json(json!({"code": SUCCESS_CODE, "data": data})))
}

fn fail(status: StatusCode, message: &str) -> ApiResponse {
    (status, Json(json!({"code": status.as_u16(), "message": message})))
}

fn illegal_token() -> ApiResponse {
    (StatusCode::OK, Json(json!({"code": ILLEGAL_TOKEN_CODE, "msg": "illegal token"})))
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn demo_round(round: u32) -> Round {
    let videos: Vec<RoundVideo> = (1..=2)
        .map(|i| {
            let vid = format!("vid{round}{i:03}");
            RoundVideo {
                vd_title: format!("demo video {vid}"),
                create_time: now(),
                author: "demo author".to_string(),
                likes: (1000 * i).to_string(),
                shares: i.to_string(),
                collects: (500 * i).to_string(),
                img_url: format!("http://example.com/cover{vid}.jpg"),
                tags: vec![format!("tag{round}"), format!("tag{}", round + 5)],
                vd_id: vid,
            }
        })
        .collect();
    Round {
        round,
        video_count: videos.len(),
        videos,
    }
}

/// Every numeric id following a `douyin.com/video/` marker.
pub fn extract_video_ids(url: &str) -> Vec<String> {
    url.match_indices(VIDEO_URL_MARKER)
        .map(|(at, _)| {
            url[at + VIDEO_URL_MARKER.len()..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
        })
        .filter(|id| !id.is_empty())
        .collect()
}

pub fn app() -> Router {
    app_with(ServerConfig::default())
}

pub fn app_with(config: ServerConfig) -> Router {
    let state = AppState::new(config);
    Router::new()
        .route("/api/detect/create_detect_task", post(create_detect_task))
        .route("/api/detect/task_list", get(task_list))
        .route("/api/detect/get_task/{task_id}", get(get_task))
        .route("/api/detect/get_task_result/{task_id}", get(get_task_result))
        .route("/api/detect/get_round_videos/{task_id}/{round}", get(get_round_videos))
        .route("/api/detect/get_all_round_videos/{task_id}", get(get_all_round_videos))
        .route("/api/detect/clear_tasks", post(clear_tasks))
        .route("/api/auth/login", post(login))
        .route("/api/user/logout", post(logout))
        .route("/api/user/info", post(user_info))
        .route("/api/user/menu", post(menu_list))
        .with_state(state)
}

pub async fn run_with(listener: TcpListener, config: ServerConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

async fn create_detect_task(State(state): State<AppState>, body: Bytes) -> ApiResponse {
    let input: Option<CreateTaskInput> = serde_json::from_slice(&body).ok();
    let Some(video_url) = input.and_then(|i| i.video_url) else {
        return fail(StatusCode::BAD_REQUEST, "missing required parameter video_url");
    };
    info!("create task for {video_url}");

    let video_ids = extract_video_ids(&video_url);
    if video_ids.is_empty() {
        warn!("unsupported video link: {video_url}");
        return fail(StatusCode::BAD_REQUEST, "invalid video link");
    }

    let mut task = DemoTask::new(video_ids, state.next_seq());
    let task_id = task.task_id.clone();
    let delay = state.config.completion_delay;
    if delay.is_zero() {
        task.complete();
    }
    state.tasks.write().await.insert(task_id.clone(), task);

    if !delay.is_zero() {
        let tasks = state.tasks.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(task) = tasks.write().await.get_mut(&id) {
                task.complete();
                info!("task {id} completed");
            }
        });
    }

    (
        StatusCode::OK,
        Json(json!({"code": SUCCESS_CODE, "message": "task created", "data": {"task_id": task_id}})),
    )
}

async fn task_list(State(state): State<AppState>) -> ApiResponse {
    let tasks = state.tasks.read().await;
    let mut sorted: Vec<&DemoTask> = tasks.values().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.seq.cmp(&a.seq)));
    info!("returning {} tasks", sorted.len());
    ok(json!({"tasks": sorted.iter().map(|t| t.list_entry()).collect::<Vec<_>>()}))
}

async fn get_task(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResponse {
    let tasks = state.tasks.read().await;
    let Some(task) = tasks.get(&task_id) else {
        return fail(StatusCode::NOT_FOUND, "task not found");
    };
    ok(json!({
        "task_id": task.task_id,
        "vd_id": task.video_ids.first().cloned().unwrap_or_default(),
        "status": task.status,
        "created_at": task.created_at,
        "updated_at": task.completed_at.as_ref().unwrap_or(&task.created_at),
        "evil_video_ids": task.evil_video_ids,
    }))
}

async fn get_task_result(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResponse {
    let tasks = state.tasks.read().await;
    let Some(task) = tasks.get(&task_id) else {
        return fail(StatusCode::NOT_FOUND, "task not found");
    };
    if task.status != "completed" {
        return fail(StatusCode::BAD_REQUEST, "task not yet complete");
    }
    let total = task.video_ids.len();
    let evil = task.evil_video_ids.len();
    ok(json!({
        "task_info": {
            "task_id": task.task_id,
            "status": task.status,
            "created_at": task.created_at,
            "completed_at": task.completed_at,
            "evil_video_ids": task.evil_video_ids,
        },
        "summary": {
            "total_videos": total,
            "evil_videos": evil,
            "normal_videos": total - evil,
        },
        "evil_video_ids": task.evil_video_ids,
    }))
}

async fn get_round_videos(
    State(state): State<AppState>,
    Path((task_id, round)): Path<(String, u32)>,
) -> ApiResponse {
    let tasks = state.tasks.read().await;
    let Some(task) = tasks.get(&task_id) else {
        return fail(StatusCode::NOT_FOUND, "task not found");
    };
    let Some(found) = task.rounds.iter().find(|r| r.round == round) else {
        return fail(StatusCode::NOT_FOUND, &format!("round {round} not found"));
    };
    ok(json!({
        "task_id": task.task_id,
        "round": found.round,
        "video_count": found.video_count,
        "videos": found.videos,
    }))
}

async fn get_all_round_videos(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResponse {
    let tasks = state.tasks.read().await;
    let Some(task) = tasks.get(&task_id) else {
        return fail(StatusCode::NOT_FOUND, "task not found");
    };
    ok(json!({
        "task_id": task.task_id,
        "total_rounds": task.rounds.len(),
        "rounds": task.rounds,
    }))
}

async fn clear_tasks(State(state): State<AppState>) -> ApiResponse {
    let mut tasks = state.tasks.write().await;
    tasks.clear();
    seed(&mut tasks, &state.seq);
    (
        StatusCode::OK,
        Json(json!({"code": SUCCESS_CODE, "message": "all tasks cleared"})),
    )
}

async fn login(State(state): State<AppState>, body: Bytes) -> ApiResponse {
    let input: Option<LoginInput> = serde_json::from_slice(&body).ok();
    let Some(input) = input.filter(|i| !i.username.is_empty() && !i.password.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": 40000, "data": {"message": "username and password are required"}})),
        );
    };

    let user = state
        .config
        .users
        .iter()
        .find(|u| u.username == input.username && u.password == input.password);
    let Some(user) = user else {
        warn!("rejected login for {}", input.username);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 40001, "data": {"message": "incorrect username or password"}})),
        );
    };

    let token = format!("{}-token-{}", user.username, Uuid::new_v4().simple());
    state.sessions.write().await.insert(token.clone(), user.id);
    info!("user {} logged in", user.username);
    ok(json!({"token": token, "user": {"id": user.id, "username": user.username}}))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        state.sessions.write().await.remove(token);
    }
    ok(Value::Null)
}

async fn user_info(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let Some(user) = state.user_for(&headers).await else {
        return illegal_token();
    };
    ok(json!({
        "name": user.username,
        "avatar": "",
        "email": format!("{}@example.com", user.username),
        "accountId": user.id,
        "certification": 1,
        "role": "admin",
    }))
}

async fn menu_list(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    if state.user_for(&headers).await.is_none() {
        return illegal_token();
    }
    ok(json!([
        {
            "path": "/dashboard",
            "name": "dashboard",
            "meta": {"locale": "menu.dashboard", "requiresAuth": true, "icon": "icon-dashboard"},
            "children": [
                {"path": "workplace", "name": "Workplace", "meta": {"locale": "menu.dashboard.workplace", "requiresAuth": true}}
            ]
        }
    ]))
}
