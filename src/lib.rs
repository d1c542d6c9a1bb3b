//! Y-Traction - focus/rest timer service
//! 
//! This library provides the Pomodoro state machine, its persistence to a
//! key-value store, the background watchdog that notices expiry while no UI
//! surface is attached, the message bridge between the two, and the website
//! blocklist.

pub mod config;
pub mod clock;
pub mod state;
pub mod store;
pub mod bridge;
pub mod blocklist;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::{AppState, Foreground, TimerSettings, TimerState};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
