//! User-facing notifications.
//!
//! Hosts route these to toasts or dialogs; the core only reports.

use crate::storage::BoxFuture;
use std::time::Duration;

/// How long a toast stays up when no timer is given.
pub const DEFAULT_NOTIFY_TIMER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotifyIcon {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOptions {
    pub icon: NotifyIcon,
    /// `None` keeps the message up until dismissed.
    pub timer: Option<Duration>,
}

impl Default for NotifyOptions {
    fn default() -> Self {
        Self {
            icon: NotifyIcon::Info,
            timer: Some(DEFAULT_NOTIFY_TIMER),
        }
    }
}

impl NotifyOptions {
    pub fn with_icon(icon: NotifyIcon) -> Self {
        Self {
            icon,
            ..Self::default()
        }
    }
}

/// Notification boundary.
pub trait Notifier {
    /// Show a transient message.
    fn notify(&self, message: &str, options: NotifyOptions);

    /// Ask the user a yes/no question.
    fn confirm(&self, message: &str) -> BoxFuture<'_, bool>;
}

/// Notifier that writes to the `log` facade and auto-confirms with a fixed
/// answer. Used headless and in tests.
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier {
    answer: bool,
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self { answer: true }
    }
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose confirmations always return `answer`.
    pub fn answering(answer: bool) -> Self {
        Self { answer }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, options: NotifyOptions) {
        match options.icon {
            NotifyIcon::Error => log::error!("{message}"),
            NotifyIcon::Warning => log::warn!("{message}"),
            NotifyIcon::Info | NotifyIcon::Success => log::info!("{message}"),
        }
    }

    fn confirm(&self, message: &str) -> BoxFuture<'_, bool> {
        log::info!("Confirm: {message} -> {}", self.answer);
        let answer = self.answer;
        Box::pin(async move { answer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_on;

    #[test]
    fn test_default_options() {
        let options = NotifyOptions::default();
        assert_eq!(options.icon, NotifyIcon::Info);
        assert_eq!(options.timer, Some(DEFAULT_NOTIFY_TIMER));
        assert_eq!(NotifyOptions::with_icon(NotifyIcon::Error).icon, NotifyIcon::Error);
    }

    #[test]
    fn test_log_notifier_confirms_with_fixed_answer() {
        let _ = env_logger::builder().is_test(true).try_init();
        let yes = LogNotifier::new();
        let no = LogNotifier::answering(false);
        yes.notify("saved", NotifyOptions::with_icon(NotifyIcon::Success));
        assert!(block_on(yes.confirm("overwrite?")));
        assert!(!block_on(no.confirm("overwrite?")));
    }
}
