//! Explicit session context shared between the client and the interceptor.
//!
//! # Design
//! The session is created on login and cleared on logout. It is passed into
//! `DetectClient` rather than living in a process-wide global; clones share
//! the same state. The context also owns the "logout prompt visible" flag so
//! concurrent failing calls raise at most one prompt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::types::SessionUser;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<SessionUser>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Session>>,
    prompt_visible: Arc<AtomicBool>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context restored from a persisted token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let ctx = Self::new();
        ctx.write(|s| s.token = Some(token.into()));
        ctx
    }

    pub fn token(&self) -> Option<String> {
        self.read(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.read(|s| s.user.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.read(|s| s.token.is_some())
    }

    pub fn snapshot(&self) -> Session {
        self.read(Session::clone)
    }

    pub fn sign_in(&self, token: String, user: Option<SessionUser>) {
        debug!(user = ?user.as_ref().map(|u| &u.username), "session signed in");
        self.write(|s| {
            s.token = Some(token);
            s.user = user;
        });
    }

    pub fn sign_out(&self) {
        debug!("session signed out");
        self.write(|s| *s = Session::default());
    }

    /// Claim the logout prompt. Returns `None` while another prompt is open.
    pub fn begin_logout_prompt(&self) -> Option<PromptGuard> {
        self.prompt_visible
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PromptGuard {
                flag: Arc::clone(&self.prompt_visible),
            })
    }

    pub fn logout_prompt_visible(&self) -> bool {
        self.prompt_visible.load(Ordering::Acquire)
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut Session)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

/// Releases the logout prompt flag on drop.
#[derive(Debug)]
pub struct PromptGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for PromptGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_then_out() {
        let ctx = SessionContext::new();
        assert!(!ctx.is_signed_in());

        ctx.sign_in(
            "tok".to_string(),
            Some(SessionUser { id: 1, username: "admin".to_string() }),
        );
        assert_eq!(ctx.token().as_deref(), Some("tok"));
        assert_eq!(ctx.user().map(|u| u.username), Some("admin".to_string()));

        ctx.sign_out();
        assert_eq!(ctx.snapshot(), Session::default());
    }

    #[test]
    fn clones_share_state() {
        let ctx = SessionContext::with_token("persisted");
        let other = ctx.clone();
        other.sign_out();
        assert!(ctx.token().is_none());
    }

    #[test]
    fn only_one_prompt_at_a_time() {
        let ctx = SessionContext::new();
        let guard = ctx.begin_logout_prompt().expect("first prompt");
        assert!(ctx.logout_prompt_visible());
        assert!(ctx.begin_logout_prompt().is_none());

        drop(guard);
        assert!(!ctx.logout_prompt_visible());
        assert!(ctx.begin_logout_prompt().is_some());
    }
}
