//! UI event port used by the interceptor for user-facing side effects.
//!
//! The interceptor never renders anything itself. It reports errors and asks
//! for logout confirmation through `UiPort`; the front end decides how.

use std::time::Duration;

use tracing::warn;

/// How long an error notice stays on screen.
pub const ERROR_NOTICE_DURATION: Duration = Duration::from_secs(5);

/// Content of the forced-logout confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutPrompt {
    pub title: &'static str,
    pub content: &'static str,
    pub ok_text: &'static str,
}

impl Default for LogoutPrompt {
    fn default() -> Self {
        Self {
            title: "Confirm logout",
            content: "You have been logged out, you can cancel to stay on this page, or log in again",
            ok_text: "Re-Login",
        }
    }
}

pub trait UiPort: Send + Sync {
    /// Show a global error notice.
    fn show_error(&self, message: &str);

    /// Ask the user to confirm the forced logout. `true` means confirmed.
    fn confirm_logout(&self, prompt: &LogoutPrompt) -> bool;

    /// Reload the application after the session has been torn down.
    fn reload(&self);
}

/// Headless port: logs every event and never confirms a logout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPort;

impl UiPort for TracingPort {
    fn show_error(&self, message: &str) {
        warn!(duration = ?ERROR_NOTICE_DURATION, "{message}");
    }

    fn confirm_logout(&self, prompt: &LogoutPrompt) -> bool {
        warn!(title = prompt.title, "logout confirmation requested, declining");
        false
    }

    fn reload(&self) {}
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Records every port call; `confirm` decides the prompt answer.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingPort {
        pub confirm: bool,
        pub errors: Mutex<Vec<String>>,
        pub prompts: Mutex<Vec<LogoutPrompt>>,
        pub reloads: Mutex<usize>,
    }

    impl RecordingPort {
        pub fn confirming() -> Self {
            Self { confirm: true, ..Self::default() }
        }

        pub fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }

        pub fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn reload_count(&self) -> usize {
            *self.reloads.lock().unwrap()
        }
    }

    impl UiPort for RecordingPort {
        fn show_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn confirm_logout(&self, prompt: &LogoutPrompt) -> bool {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.confirm
        }

        fn reload(&self) {
            *self.reloads.lock().unwrap() += 1;
        }
    }
}
