//! Synchronous API client core for the video detection service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses transport outcomes without touching
//! the network (host-does-IO pattern). Between the raw transport and the
//! caller sit two layers: a universal interceptor (credentials, application
//! status codes, forced logout) and per-family normalizers that coerce the
//! backend's several response shapes into one canonical `ApplicationResult`.
//!
//! # Design
//! - `DetectClient` holds configuration plus an `Interceptor`; session state
//!   is an explicit `SessionContext` handle, never a global.
//! - UI side effects (error notices, logout confirmation, reload) go through
//!   the `UiPort` trait so the classifier stays headless and testable.
//! - Shape detection is an explicit enum per family, tried in declared order.
//! - Every request carries a per-call-class timeout budget.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod normalize;
pub mod port;
pub mod session;
pub mod types;

pub use client::{DetectClient, Outcome};
pub use config::{CallClass, ClientConfig, TimeoutBudget};
pub use endpoints::Endpoint;
pub use error::{
    ApiError, ErrorClassification, Resource, SessionCode, CREDENTIAL_MISMATCH_MESSAGE,
    NOT_YET_COMPLETE_MESSAGE,
};
pub use http::{HttpMethod, HttpRequest, HttpResponse, TransportError};
pub use interceptor::{Interceptor, SUCCESS_CODE};
pub use port::{LogoutPrompt, TracingPort, UiPort};
pub use session::{Session, SessionContext};
pub use types::{
    AllRoundVideos, ApplicationResult, CreateDetectTask, CreatedTask, LoginPayload, LoginRequest,
    MenuEntry, ReportSummary, RequestConfig, Round, RoundVideo, RoundVideos, SessionUser, TaskDetail,
    TaskInfo, TaskList, TaskListEntry, TaskReport, TaskStatus, UserInfo,
};
