//! Platform notification dispatch

use tokio::process::Command;
use tracing::{info, warn};

/// Notification urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    fn urgency(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "critical",
        }
    }
}

/// Fire-and-forget notifications. Delivery is not guaranteed.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, priority: Priority);
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str, priority: Priority) {
        info!("Notification [{}]: {} - {}", priority.urgency(), title, message);
    }
}

/// Desktop notifications through `notify-send`
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str, priority: Priority) {
        let title = title.to_string();
        let message = message.to_string();
        tokio::spawn(async move {
            if let Err(e) = send_desktop_notification(&title, &message, priority).await {
                warn!("Desktop notification failed: {}", e);
                LogNotifier.notify(&title, &message, priority);
            }
        });
    }
}

/// Run `notify-send` for a single notification
pub async fn send_desktop_notification(
    title: &str,
    message: &str,
    priority: Priority,
) -> Result<(), String> {
    let output = Command::new("notify-send")
        .args(["--app-name", "Y-Traction", "--urgency", priority.urgency(), title, message])
        .output()
        .await
        .map_err(|e| format!("Failed to execute notify-send: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("notify-send failed: {}", stderr));
    }

    Ok(())
}

/// Check whether desktop notifications can be sent on this system
pub async fn check_notify_send_available() -> Result<(), String> {
    Command::new("notify-send")
        .arg("--version")
        .output()
        .await
        .map_err(|_| "notify-send is not available; falling back to log notifications".to_string())?;

    info!("notify-send is available");
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{Notifier, Priority};

    /// Notifier that records everything it is asked to show
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String, Priority)>>,
    }

    impl RecordingNotifier {
        pub fn titles(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
        }

        pub fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, m, _)| m.clone()).collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, message: &str, priority: Priority) {
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string(), priority));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_maps_to_urgency() {
        assert_eq!(Priority::Low.urgency(), "low");
        assert_eq!(Priority::Normal.urgency(), "normal");
        assert_eq!(Priority::High.urgency(), "critical");
    }

    #[test]
    fn recording_notifier_keeps_order() {
        let notifier = testing::RecordingNotifier::default();
        notifier.notify("a", "1", Priority::High);
        notifier.notify("b", "2", Priority::Low);
        assert_eq!(notifier.titles(), vec!["a", "b"]);
        assert_eq!(notifier.messages(), vec!["1", "2"]);
    }
}
