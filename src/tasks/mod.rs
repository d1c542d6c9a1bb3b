//! Background tasks module
//! 
//! This module contains the foreground countdown ticker and the background
//! supervisor that watches for expiry while no surface is attached.

pub mod ticker;
pub mod watchdog;

// Re-export main functions
pub use ticker::{spawn_ticker, TickerHandle, TICK_PERIOD};
pub use watchdog::{background_supervisor_task, Supervisor};
