//! State management module
//! 
//! This module contains the timer record, its state machine, the foreground
//! controller that owns it, and the shared application state for the API.

pub mod timer_state;
pub mod machine;
pub mod foreground;
pub mod app_state;

// Re-export main types
pub use timer_state::{TimerMode, TimerSettings, TimerState, TimerStatus};
pub use machine::TimerEvent;
pub use foreground::{Foreground, ForegroundError};
pub use app_state::AppState;
