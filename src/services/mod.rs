//! External collaborator services
//! 
//! This module contains the notification and alert-overlay dispatchers the
//! timer core raises events through.

pub mod notifications;
pub mod alerts;

// Re-export main types
pub use notifications::{
    check_notify_send_available, DesktopNotifier, LogNotifier, Notifier, Priority,
};
pub use alerts::{Alert, AlertError, AlertSurface, BroadcastAlerts};
