//! Background supervisor: bridge message handling and the expiry watchdog

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    bridge::{BridgeReceiver, Message, Response},
    clock::Clock,
    services::{Alert, AlertSurface, Notifier, Priority},
    state::TimerMode,
    store::{timer as timer_store, Store},
};

/// Long-lived context that keeps an eye on the timer while no foreground
/// surface is attached.
///
/// It never rewrites `timerState`; expiry only raises a notification and an
/// alert and stops watching that deadline. The foreground reconciles the
/// rest when it next attaches. While a surface is attached the foreground
/// completes phases itself, so polling stands down.
pub struct Supervisor {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    alerts: Arc<dyn AlertSurface>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    /// Deadline currently being watched
    watching: Option<i64>,
    surface_attached: bool,
}

impl Supervisor {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        alerts: Arc<dyn AlertSurface>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            alerts,
            clock,
            poll_interval,
            watching: None,
            surface_attached: false,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watching.is_some()
    }

    pub fn watching(&self) -> Option<i64> {
        self.watching
    }

    pub fn is_surface_attached(&self) -> bool {
        self.surface_attached
    }

    /// Poll only for a watched deadline nobody else is ticking towards
    fn should_poll(&self) -> bool {
        self.is_watching() && !self.surface_attached
    }

    /// Install hook: drop any run state left over from a previous session
    pub async fn on_install(&mut self) {
        self.watching = None;
        match timer_store::clear_timer_state(self.store.as_ref()).await {
            Ok(()) => info!("Purged stale timer state on install"),
            Err(e) => warn!("Failed to purge stale timer state: {}", e),
        }
    }

    /// Pick up a deadline persisted before this supervisor started
    pub async fn resume_watch(&mut self) {
        if let Some(state) = timer_store::load_timer_state(self.store.as_ref()).await {
            if state.is_running {
                self.watching = state.end_time;
                info!("Resuming watch of persisted deadline {:?}", self.watching);
            }
        }
    }

    /// Handle one bridge payload; every payload gets a response
    pub async fn handle_message(&mut self, payload: serde_json::Value) -> Response {
        let message = match Message::decode(payload) {
            Ok(message) => message,
            Err(rejection) => {
                warn!("Rejected bridge message: {:?}", rejection);
                return rejection.into();
            }
        };
        debug!("Supervisor received {}", message.kind());

        match message {
            Message::StartTimer { end_time } => {
                self.watching = Some(end_time);
                info!("Watching deadline {}", end_time);
                Response::ok("Timer started")
            }
            Message::ClearTimer {} => {
                self.watching = None;
                Response::ok("Timer cleared")
            }
            Message::TimerComplete { mode, cycle } => match mode {
                TimerMode::Focus => self.raise_alert(Alert::FocusComplete { cycle }),
                TimerMode::Rest => Response::ok("Rest complete"),
            },
            Message::AllCyclesComplete { total_cycles } => {
                self.watching = None;
                self.raise_alert(Alert::AllCyclesComplete { total_cycles })
            }
            Message::SurfaceOpened {} => {
                self.surface_attached = true;
                Response::ok("Surface attached")
            }
            Message::SurfaceClosed {} => {
                self.surface_attached = false;
                Response::ok("Surface detached")
            }
        }
    }

    /// One watchdog poll. Returns the deadline that fired, if any.
    pub async fn check_timer(&mut self) -> Option<i64> {
        if !self.should_poll() {
            return None;
        }

        let Some(state) = timer_store::load_timer_state(self.store.as_ref()).await else {
            debug!("No persisted timer, nothing to watch");
            self.watching = None;
            return None;
        };

        if !state.is_running {
            debug!("Persisted timer not running, nothing to watch");
            self.watching = None;
            return None;
        }

        let now = self.clock.now_ms();
        if !state.is_expired_at(now) {
            if state.end_time != self.watching {
                self.watching = state.end_time;
            }
            return None;
        }

        let fired = state.end_time;
        info!("Watchdog saw deadline {:?} pass", fired);
        let alert = Alert::TimeUp;
        self.notifier
            .notify(alert.title(), &alert.message(), Priority::High);
        self.raise_alert(alert);
        self.watching = None;
        fired
    }

    fn raise_alert(&self, alert: Alert) -> Response {
        match self.alerts.show_alert(alert) {
            Ok(()) => Response::ok("Alert shown"),
            Err(e) => {
                warn!("Alert not shown: {}", e);
                Response::ok("No alert target")
            }
        }
    }
}

/// Background supervisor loop: answers bridge messages and polls the store
/// while a deadline is being watched
pub async fn background_supervisor_task(mut supervisor: Supervisor, mut inbox: BridgeReceiver) {
    info!(
        "Starting background supervisor (poll every {}s)",
        supervisor.poll_interval.as_secs()
    );
    supervisor.resume_watch().await;

    let mut poll = interval(supervisor.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            envelope = inbox.recv() => {
                let Some(envelope) = envelope else {
                    info!("Bridge closed, background supervisor exiting");
                    break;
                };
                let response = supervisor.handle_message(envelope.payload.clone()).await;
                envelope.respond(response);
            }

            _ = poll.tick(), if supervisor.should_poll() => {
                supervisor.check_timer().await;
            }
        }
    }
}
