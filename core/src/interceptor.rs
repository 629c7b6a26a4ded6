//! Request/response interceptor wrapping every call uniformly.
//!
//! # Design
//! Three phases, all independent of the endpoint family:
//! - request: attach `Authorization: Bearer <token>` when the session has one;
//! - transport failure: non-2xx or no response, mapped without UI effects;
//! - response: check the application code embedded in the body and, on
//!   failure, notify the UI and drive the forced-logout flow through `UiPort`.
//!
//! A body without any application code (bare arrays, bare objects) is passed
//! through; judging its shape is the normalizer's job. A `code` that is
//! present but not an integer is a failure.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::endpoints::{LOGIN_PATH, USER_INFO_PATH};
use crate::error::{ApiError, SessionCode};
use crate::http::{HttpRequest, HttpResponse, TransportError};
use crate::port::{LogoutPrompt, UiPort};
use crate::session::SessionContext;
use crate::types::RequestConfig;

/// Application code meaning "no error".
pub const SUCCESS_CODE: i64 = 20000;

/// Reported for a `code` field that is present but not an integer.
pub const MALFORMED_CODE: i64 = -1;

pub const DEFAULT_ERROR_MESSAGE: &str = "Error";

/// A response that passed every interceptor phase.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub response: HttpResponse,
    pub body: Value,
}

#[derive(Clone)]
pub struct Interceptor {
    session: SessionContext,
    port: Arc<dyn UiPort>,
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Interceptor {
    pub fn new(session: SessionContext, port: Arc<dyn UiPort>) -> Self {
        Self { session, port }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn port(&self) -> Arc<dyn UiPort> {
        Arc::clone(&self.port)
    }

    pub fn on_request(&self, request: HttpRequest) -> HttpRequest {
        attach_credentials(request, self.session.token().as_deref())
    }

    /// Run the failure and response phases over one transport outcome.
    pub fn intercept(
        &self,
        config: &RequestConfig,
        outcome: Result<HttpResponse, TransportError>,
    ) -> Result<Accepted, ApiError> {
        let response = match outcome {
            Ok(response) if response.is_success() => response,
            Ok(response) => return Err(self.on_status_failure(config, response)),
            Err(e) => return Err(ApiError::Transport(e)),
        };
        let body = self.on_response(config, &response)?;
        Ok(Accepted { response, body })
    }

    /// Non-2xx response. Login 401 becomes the fixed credential message;
    /// everything else is propagated as-is.
    pub fn on_status_failure(&self, config: &RequestConfig, response: HttpResponse) -> ApiError {
        if config.url.contains(LOGIN_PATH) && response.status == 401 {
            debug!("login rejected with 401");
            return ApiError::CredentialMismatch;
        }
        ApiError::HttpError {
            status: response.status,
            body: response.body,
        }
    }

    /// 2xx response. Returns the parsed body unchanged on success.
    pub fn on_response(&self, config: &RequestConfig, response: &HttpResponse) -> Result<Value, ApiError> {
        let body = parse_body(&response.body);
        let code = match application_code(&body) {
            None | Some(SUCCESS_CODE) => return Ok(body),
            Some(code) => code,
        };

        let message = error_message(&body);
        if !config.url.contains(LOGIN_PATH) {
            self.port.show_error(&message);
        }

        match SessionCode::from_code(code) {
            Some(session_code) => {
                if config.url != USER_INFO_PATH {
                    self.force_logout(session_code);
                }
                Err(ApiError::SessionInvalidated {
                    code: session_code,
                    message,
                })
            }
            None => Err(ApiError::Application { code, message }),
        }
    }

    fn force_logout(&self, code: SessionCode) {
        warn!(code = code.code(), "session invalidated by backend");
        let Some(_prompt) = self.session.begin_logout_prompt() else {
            debug!("logout prompt already visible");
            return;
        };
        if self.port.confirm_logout(&LogoutPrompt::default()) {
            self.session.sign_out();
            self.port.reload();
        }
    }
}

/// Request phase as a pure function.
pub fn attach_credentials(mut request: HttpRequest, token: Option<&str>) -> HttpRequest {
    if let Some(token) = token {
        request
            .headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case("authorization"));
        request
            .headers
            .push(("authorization".to_string(), format!("Bearer {token}")));
    }
    request
}

/// Empty bodies become `Null`; non-JSON bodies are kept as a string value.
pub(crate) fn parse_body(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// `None` only when the body has no `code` field at all.
pub(crate) fn application_code(body: &Value) -> Option<i64> {
    let code = body.get("code")?;
    let integral = code
        .as_i64()
        .or_else(|| code.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64));
    Some(integral.unwrap_or(MALFORMED_CODE))
}

/// `data.message`, then `message`/`msg`, then the default.
pub(crate) fn error_message(body: &Value) -> String {
    if let Some(message) = body.get("data").and_then(|d| d.get("message")).and_then(text) {
        return message;
    }
    ["message", "msg"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(text))
        .find(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
