//! Request builder and response parser for the detection API.
//!
//! # Design
//! `DetectClient` holds the configuration and an `Interceptor` (session
//! context plus UI port). Every operation is split into a `build_*` method
//! that produces an `HttpRequest` and a `parse_*` method that consumes the
//! transport outcome. The caller executes the round trip in between, so the
//! core stays deterministic and free of I/O.
//!
//! Parse pipeline: interceptor (failure + response phases), then the
//! lookup-specific failure mapping for reports and details, then the family
//! normalizer.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::endpoints::Endpoint;
use crate::error::{ApiError, Resource, NOT_YET_COMPLETE_MESSAGE};
use crate::http::{HttpRequest, HttpResponse, TransportError};
use crate::interceptor::{Accepted, Interceptor};
use crate::normalize;
use crate::port::{TracingPort, UiPort};
use crate::session::SessionContext;
use crate::types::{
    AllRoundVideos, ApplicationResult, CreateDetectTask, CreatedTask, LoginPayload, LoginRequest,
    MenuEntry, RequestConfig, RoundVideos, TaskDetail, TaskList, TaskReport, UserInfo,
};

/// What the host hands back after executing an `HttpRequest`.
pub type Outcome = Result<HttpResponse, TransportError>;

#[derive(Debug, Clone)]
pub struct DetectClient {
    config: ClientConfig,
    interceptor: Interceptor,
}

impl DetectClient {
    /// Client with default timeouts, an empty session and a logging port.
    pub fn new(base_url: &str) -> Self {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            interceptor: Interceptor::new(SessionContext::new(), Arc::new(TracingPort)),
        }
    }

    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.interceptor = Interceptor::new(session, self.port());
        self
    }

    pub fn with_port(mut self, port: Arc<dyn UiPort>) -> Self {
        self.interceptor = Interceptor::new(self.session().clone(), port);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionContext {
        self.interceptor.session()
    }

    // --- build ---

    pub fn build_create_detect_task(&self, input: &CreateDetectTask) -> Result<HttpRequest, ApiError> {
        self.build_json(&Endpoint::CreateDetectTask, input)
    }

    pub fn build_task_list(&self) -> HttpRequest {
        self.build(&Endpoint::TaskList, None)
    }

    pub fn build_task_report(&self, task_id: &str) -> HttpRequest {
        self.build(&Endpoint::TaskResult { task_id: task_id.to_string() }, None)
    }

    pub fn build_task_detail(&self, task_id: &str) -> HttpRequest {
        self.build(&Endpoint::TaskDetail { task_id: task_id.to_string() }, None)
    }

    pub fn build_round_videos(&self, task_id: &str, round: u32) -> HttpRequest {
        let endpoint = Endpoint::RoundVideos {
            task_id: task_id.to_string(),
            round,
        };
        self.build(&endpoint, None)
    }

    pub fn build_all_round_videos(&self, task_id: &str) -> HttpRequest {
        self.build(&Endpoint::AllRoundVideos { task_id: task_id.to_string() }, None)
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(&Endpoint::Login, input)
    }

    pub fn build_logout(&self) -> HttpRequest {
        self.build(&Endpoint::Logout, None)
    }

    pub fn build_user_info(&self) -> HttpRequest {
        self.build(&Endpoint::UserInfo, None)
    }

    pub fn build_menu_list(&self) -> HttpRequest {
        self.build(&Endpoint::MenuList, None)
    }

    // --- parse ---

    pub fn parse_create_detect_task(&self, outcome: Outcome) -> Result<ApplicationResult<CreatedTask>, ApiError> {
        let accepted = self.receive(&Endpoint::CreateDetectTask, outcome)?;
        let data = normalize::created_task(&accepted.body)?;
        Ok(self.result(&Endpoint::CreateDetectTask, accepted.response, data))
    }

    /// Shape mismatches degrade to an empty list; transport and application
    /// errors still fail.
    pub fn parse_task_list(&self, outcome: Outcome) -> Result<ApplicationResult<TaskList>, ApiError> {
        let accepted = self.receive(&Endpoint::TaskList, outcome)?;
        let data = normalize::task_list(&accepted.body);
        Ok(self.result(&Endpoint::TaskList, accepted.response, data))
    }

    pub fn parse_task_report(
        &self,
        task_id: &str,
        outcome: Outcome,
    ) -> Result<ApplicationResult<TaskReport>, ApiError> {
        let endpoint = Endpoint::TaskResult { task_id: task_id.to_string() };
        let accepted = self
            .receive(&endpoint, outcome)
            .map_err(|e| lookup_failure(Resource::TaskReport, task_id, e))?;
        let data = normalize::task_report(&accepted.body)?;
        Ok(self.result(&endpoint, accepted.response, data))
    }

    pub fn parse_task_detail(
        &self,
        task_id: &str,
        outcome: Outcome,
    ) -> Result<ApplicationResult<TaskDetail>, ApiError> {
        let endpoint = Endpoint::TaskDetail { task_id: task_id.to_string() };
        let accepted = self
            .receive(&endpoint, outcome)
            .map_err(|e| lookup_failure(Resource::Task, task_id, e))?;
        let data = normalize::task_detail(&accepted.body)?;
        Ok(self.result(&endpoint, accepted.response, data))
    }

    pub fn parse_round_videos(
        &self,
        task_id: &str,
        round: u32,
        outcome: Outcome,
    ) -> Result<ApplicationResult<RoundVideos>, ApiError> {
        let endpoint = Endpoint::RoundVideos {
            task_id: task_id.to_string(),
            round,
        };
        self.parse_envelope(&endpoint, "round videos", outcome)
    }

    pub fn parse_all_round_videos(
        &self,
        task_id: &str,
        outcome: Outcome,
    ) -> Result<ApplicationResult<AllRoundVideos>, ApiError> {
        let endpoint = Endpoint::AllRoundVideos { task_id: task_id.to_string() };
        self.parse_envelope(&endpoint, "all round videos", outcome)
    }

    /// Signs the session in on success.
    pub fn parse_login(&self, outcome: Outcome) -> Result<ApplicationResult<LoginPayload>, ApiError> {
        let result: ApplicationResult<LoginPayload> = self.parse_envelope(&Endpoint::Login, "login", outcome)?;
        self.session()
            .sign_in(result.data.token.clone(), Some(result.data.user.clone()));
        Ok(result)
    }

    /// Signs the session out on success.
    pub fn parse_logout(&self, outcome: Outcome) -> Result<ApplicationResult<()>, ApiError> {
        let accepted = self.receive(&Endpoint::Logout, outcome)?;
        self.session().sign_out();
        Ok(self.result(&Endpoint::Logout, accepted.response, ()))
    }

    pub fn parse_user_info(&self, outcome: Outcome) -> Result<ApplicationResult<UserInfo>, ApiError> {
        self.parse_envelope(&Endpoint::UserInfo, "user info", outcome)
    }

    pub fn parse_menu_list(&self, outcome: Outcome) -> Result<ApplicationResult<Vec<MenuEntry>>, ApiError> {
        self.parse_envelope(&Endpoint::MenuList, "menu list", outcome)
    }

    // --- internals ---

    fn port(&self) -> Arc<dyn UiPort> {
        self.interceptor.port()
    }

    fn request_config(&self, endpoint: &Endpoint) -> RequestConfig {
        RequestConfig {
            method: endpoint.method(),
            url: endpoint.path(),
            timeout: self.config.timeouts.for_class(endpoint.call_class()),
        }
    }

    fn build(&self, endpoint: &Endpoint, body: Option<String>) -> HttpRequest {
        let config = self.request_config(endpoint);
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        let request = HttpRequest {
            method: config.method,
            path: format!("{}{}", self.config.base_url, config.url),
            headers,
            body,
            timeout: config.timeout,
        };
        debug!(method = config.method.as_str(), path = %request.path, "built request");
        self.interceptor.on_request(request)
    }

    fn build_json<T: Serialize>(&self, endpoint: &Endpoint, input: &T) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(self.build(endpoint, Some(body)))
    }

    fn receive(&self, endpoint: &Endpoint, outcome: Outcome) -> Result<Accepted, ApiError> {
        self.interceptor.intercept(&self.request_config(endpoint), outcome)
    }

    fn parse_envelope<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        family: &'static str,
        outcome: Outcome,
    ) -> Result<ApplicationResult<T>, ApiError> {
        let accepted = self.receive(endpoint, outcome)?;
        let data = normalize::envelope_data(family, &accepted.body)?;
        Ok(self.result(endpoint, accepted.response, data))
    }

    fn result<T>(&self, endpoint: &Endpoint, response: HttpResponse, data: T) -> ApplicationResult<T> {
        ApplicationResult {
            data,
            status: response.status,
            headers: response.header_map(),
            status_text: response.status_text,
            config: self.request_config(endpoint),
        }
    }
}

/// Report/detail lookups: friendlier errors for the transport cases callers
/// branch on. Application errors pass through untouched.
fn lookup_failure(resource: Resource, task_id: &str, err: ApiError) -> ApiError {
    match err {
        ApiError::HttpError { status: 404, .. } => ApiError::NotFound {
            resource,
            task_id: task_id.to_string(),
        },
        ApiError::HttpError { status: 400, body } if resource == Resource::TaskReport => {
            ApiError::NotYetComplete(body_message(&body).unwrap_or_else(|| NOT_YET_COMPLETE_MESSAGE.to_string()))
        }
        ApiError::Transport(_) => ApiError::NetworkUnreachable,
        other => other,
    }
}

fn body_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::error::ErrorClassification;
    use crate::http::HttpMethod;
    use crate::port::recording::RecordingPort;
    use crate::types::{SessionUser, TaskStatus};

    fn client() -> DetectClient {
        DetectClient::new("http://localhost:5000")
    }

    fn ok(body: serde_json::Value) -> Outcome {
        Ok(HttpResponse::new(200, body.to_string()))
    }

    fn status(code: u16, body: &str) -> Outcome {
        Ok(HttpResponse::new(code, body))
    }

    fn unreachable() -> Outcome {
        Err(TransportError::NoResponse { reason: "connection refused".to_string() })
    }

    #[test]
    fn build_create_detect_task_produces_correct_request() {
        let input = CreateDetectTask {
            video_url: "https://www.douyin.com/video/7476188844711349561".to_string(),
        };
        let req = client().build_create_detect_task(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:5000/api/detect/create_detect_task");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.timeout, Duration::from_secs(30));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["video_url"], input.video_url);
    }

    #[test]
    fn build_without_session_has_no_authorization() {
        let req = client().build_task_list();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:5000/api/detect/task_list");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn build_with_session_attaches_bearer() {
        let client = client().with_session(SessionContext::with_token("admin-token"));
        for req in [client.build_task_list(), client.build_user_info(), client.build_task_report("T1")] {
            assert_eq!(req.header("authorization"), Some("Bearer admin-token"), "{}", req.path);
        }
    }

    #[test]
    fn build_lookup_paths() {
        let c = client();
        assert_eq!(c.build_task_report("T1").path, "http://localhost:5000/api/detect/get_task_result/T1");
        assert_eq!(c.build_task_detail("T1").path, "http://localhost:5000/api/detect/get_task/T1");
        assert_eq!(c.build_round_videos("T1", 2).path, "http://localhost:5000/api/detect/get_round_videos/T1/2");
        assert_eq!(c.build_all_round_videos("T1").path, "http://localhost:5000/api/detect/get_all_round_videos/T1");
        assert_eq!(c.build_menu_list().method, HttpMethod::Post);
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let req = DetectClient::new("http://localhost:5000/").build_logout();
        assert_eq!(req.path, "http://localhost:5000/api/user/logout");
    }

    #[test]
    fn parse_create_returns_application_result() {
        let result = client()
            .parse_create_detect_task(ok(json!({"code": 20000, "data": {"task_id": "T1"}})))
            .unwrap();
        assert_eq!(result.data.task_id, "T1");
        assert_eq!(result.status, 200);
        assert_eq!(result.status_text, "OK");
        assert_eq!(result.config.url, "/api/detect/create_detect_task");
        assert_eq!(result.config.method, HttpMethod::Post);
    }

    #[test]
    fn parse_create_bare_shape() {
        let result = client().parse_create_detect_task(ok(json!({"task_id": "T1"}))).unwrap();
        assert_eq!(result.data, CreatedTask { task_id: "T1".to_string() });
    }

    #[test]
    fn parse_create_server_error_propagates() {
        let err = client()
            .parse_create_detect_task(status(400, r#"{"code":400,"message":"invalid video link"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 400, .. }));
    }

    #[test]
    fn parse_task_list_unknown_shape_is_empty() {
        let result = client().parse_task_list(ok(json!({"code": 20000, "data": null}))).unwrap();
        assert!(result.data.tasks.is_empty());
    }

    #[test]
    fn parse_task_list_application_error_still_fails() {
        let port = Arc::new(RecordingPort::default());
        let client = client().with_port(port.clone());
        let err = client.parse_task_list(ok(json!({"code": 500, "message": "db down"}))).unwrap_err();
        assert_eq!(err.classification(), ErrorClassification::GenericApplicationError);
        assert_eq!(port.errors(), vec!["db down".to_string()]);
    }

    #[test]
    fn parse_task_report_scenario() {
        let body = json!({
            "code": 20000,
            "data": {
                "task_info": {"task_id": "T1", "status": "completed", "created_at": "t0", "completed_at": "t1"},
                "summary": {"total_videos": 10, "evil_videos": 2, "normal_videos": 8},
                "evil_video_ids": ["v1", "v2"]
            }
        });
        let report = client().parse_task_report("T1", ok(body)).unwrap().data;
        assert_eq!(report.task_info.evil_video_ids, vec!["v1".to_string(), "v2".to_string()]);
        assert_eq!(report.summary.evil_videos, 2);
        assert_eq!(report.task_info.status, TaskStatus::Completed);
    }

    #[test]
    fn parse_task_report_404_names_task() {
        let err = client()
            .parse_task_report("T404", status(404, r#"{"code":404,"message":"task not found"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { resource: Resource::TaskReport, .. }));
        assert!(err.to_string().contains("T404"));
    }

    #[test]
    fn parse_task_report_400_uses_body_message() {
        let err = client()
            .parse_task_report("T1", status(400, r#"{"code":400,"message":"still running"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::NotYetComplete(ref m) if m == "still running"));
        assert_eq!(err.classification(), ErrorClassification::BadRequest);
    }

    #[test]
    fn parse_task_report_400_without_message_uses_default() {
        let err = client().parse_task_report("T1", status(400, "")).unwrap_err();
        assert_eq!(err.to_string(), NOT_YET_COMPLETE_MESSAGE);
    }

    #[test]
    fn parse_task_report_unreachable() {
        let err = client().parse_task_report("T1", unreachable()).unwrap_err();
        assert!(matches!(err, ApiError::NetworkUnreachable));
        let timed_out = Err(TransportError::TimedOut { after: Duration::from_secs(30) });
        let err = client().parse_task_report("T1", timed_out).unwrap_err();
        assert!(matches!(err, ApiError::NetworkUnreachable));
    }

    #[test]
    fn parse_task_report_bare_body_fails() {
        let body = json!({"task_info": {}, "summary": {}, "evil_video_ids": []});
        let err = client().parse_task_report("T1", ok(body)).unwrap_err();
        assert_eq!(err.classification(), ErrorClassification::Unrecognized);
    }

    #[test]
    fn parse_task_detail_404_and_unreachable() {
        let err = client().parse_task_detail("T9", status(404, "")).unwrap_err();
        assert_eq!(err.to_string(), "task not found for id T9");
        let err = client().parse_task_detail("T9", unreachable()).unwrap_err();
        assert!(matches!(err, ApiError::NetworkUnreachable));
    }

    #[test]
    fn parse_task_detail_400_is_not_remapped() {
        let err = client().parse_task_detail("T9", status(400, "{}")).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 400, .. }));
    }

    #[test]
    fn parse_task_detail_bare() {
        let result = client()
            .parse_task_detail("T1", ok(json!({"task_id": "T1", "status": "processing"})))
            .unwrap();
        assert_eq!(result.data.status, TaskStatus::Processing);
    }

    #[test]
    fn parse_login_signs_session_in() {
        let c = client();
        let body = json!({"code": 20000, "data": {"token": "admin-token-123456", "user": {"id": 1, "username": "admin"}}});
        let result = c.parse_login(ok(body)).unwrap();
        assert_eq!(result.data.token, "admin-token-123456");
        assert_eq!(c.session().token().as_deref(), Some("admin-token-123456"));
        assert_eq!(c.session().user(), Some(SessionUser { id: 1, username: "admin".to_string() }));

        let req = c.build_menu_list();
        assert_eq!(req.header("authorization"), Some("Bearer admin-token-123456"));
    }

    #[test]
    fn parse_login_401_is_credential_mismatch() {
        let port = Arc::new(RecordingPort::default());
        let c = client().with_port(port.clone());
        let err = c
            .parse_login(status(401, r#"{"code":40001,"data":{"message":"wrong"}}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::CredentialMismatch));
        assert!(!c.session().is_signed_in());
        assert!(port.errors().is_empty());
    }

    #[test]
    fn parse_logout_clears_session() {
        let c = client().with_session(SessionContext::with_token("tok"));
        c.parse_logout(ok(json!({"code": 20000, "data": null}))).unwrap();
        assert!(!c.session().is_signed_in());
    }

    #[test]
    fn parse_user_info_session_code_does_not_prompt() {
        let port = Arc::new(RecordingPort::confirming());
        let c = client()
            .with_session(SessionContext::with_token("stale"))
            .with_port(port.clone());
        let err = c.parse_user_info(ok(json!({"code": 50008, "msg": "illegal token"}))).unwrap_err();
        assert_eq!(err.classification(), ErrorClassification::SessionInvalid);
        assert_eq!(port.prompt_count(), 0);
        assert!(c.session().is_signed_in());
    }

    #[test]
    fn parse_menu_list_session_code_forces_logout() {
        let port = Arc::new(RecordingPort::confirming());
        let c = client()
            .with_session(SessionContext::with_token("stale"))
            .with_port(port.clone());
        let err = c.parse_menu_list(ok(json!({"code": 50014, "msg": "token expired"}))).unwrap_err();
        assert_eq!(err.to_string(), "token expired");
        assert_eq!(port.prompt_count(), 1);
        assert_eq!(port.reload_count(), 1);
        assert!(!c.session().is_signed_in());
    }

    #[test]
    fn parse_round_videos_unwraps_envelope() {
        let body = json!({"code": 20000, "data": {"task_id": "T1", "round": 1, "video_count": 1,
            "videos": [{"vd_id": "vid1001", "vd_title": "t", "create_time": "c", "author": "a",
                        "likes": "1", "shares": "2", "collects": "3", "img_url": "u", "tags": ["x"]}]}});
        let result = client().parse_round_videos("T1", 1, ok(body)).unwrap();
        assert_eq!(result.data.videos[0].vd_id, "vid1001");
        assert_eq!(result.config.url, "/api/detect/get_round_videos/T1/1");
    }

    #[test]
    fn parse_all_round_videos_shape_mismatch() {
        let err = client()
            .parse_all_round_videos("T1", ok(json!({"code": 20000})))
            .unwrap_err();
        assert!(matches!(err, ApiError::ShapeMismatch { .. }));
    }

    #[test]
    fn result_headers_are_lowercased() {
        let response = HttpResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("X-Request-Id".to_string(), "r1".to_string())],
            body: json!({"task_id": "T1"}).to_string(),
        };
        let result = client().parse_create_detect_task(Ok(response)).unwrap();
        assert_eq!(result.headers.get("x-request-id").map(String::as_str), Some("r1"));
    }
}
