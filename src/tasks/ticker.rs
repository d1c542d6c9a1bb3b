//! Foreground countdown ticker

use std::{sync::Weak, time::Duration};
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tracing::{debug, error, info};

use crate::state::Foreground;

/// Countdown period while a phase is running
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Handle to a running ticker. Dropping it stops the ticker too.
#[derive(Debug)]
pub struct TickerHandle {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TickerHandle {
    /// Ask the ticker to stop after its current tick
    pub fn stop(self) {
        let _ = self.cancel.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the 1-second countdown loop for a foreground controller
pub fn spawn_ticker(foreground: Weak<Foreground>) -> TickerHandle {
    let (cancel, cancelled) = oneshot::channel();
    let task = tokio::spawn(ticker_task(foreground, TICK_PERIOD, cancelled));
    TickerHandle { cancel, task }
}

async fn ticker_task(
    foreground: Weak<Foreground>,
    period: Duration,
    mut cancelled: oneshot::Receiver<()>,
) {
    debug!("Ticker started");
    let mut interval = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;

            _ = &mut cancelled => {
                debug!("Ticker cancelled");
                break;
            }

            _ = interval.tick() => {
                let Some(foreground) = foreground.upgrade() else {
                    debug!("Foreground gone, ticker exiting");
                    break;
                };

                match foreground.tick().await {
                    Ok(Some(event)) => info!("Phase ended: {:?}", event),
                    Ok(None) => {}
                    Err(e) => {
                        error!("Tick failed: {}", e);
                        break;
                    }
                }

                if !foreground.is_running() {
                    debug!("Timer no longer running, ticker exiting");
                    break;
                }
            }
        }
    }
}
