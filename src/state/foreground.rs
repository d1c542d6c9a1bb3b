//! Foreground controller: the owner of the live timer
//!
//! A controller exists only while a UI surface is attached. It loads the
//! persisted state on attach, drives the one-second countdown, and writes
//! back every change that affects resumability. It is the only writer of
//! `timerState`; the background supervisor only reads it.

use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use super::{TimerEvent, TimerMode, TimerSettings, TimerState};
use crate::{
    bridge::{BridgeSender, Message},
    clock::Clock,
    services::{Alert, Notifier, Priority},
    store::{timer as timer_store, Store},
    tasks::ticker::{spawn_ticker, TickerHandle},
};

#[derive(Debug, Error)]
pub enum ForegroundError {
    #[error("timer state lock poisoned")]
    Poisoned,
}

/// Everything a controller talks to outside itself
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn Store>,
    pub bridge: BridgeSender,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

pub struct Foreground {
    deps: Collaborators,
    /// Held for the whole of each operation, awaits included, so a tick
    /// already dispatching cannot interleave with pause or reset
    op_lock: AsyncMutex<()>,
    timer: Mutex<TimerState>,
    ticker: Mutex<Option<TickerHandle>>,
    update_tx: watch::Sender<TimerState>,
}

impl Foreground {
    /// Attach a surface: load settings and run state, reconcile any gap
    /// since the last surface closed, and resume ticking or complete the
    /// phase that expired in the meantime.
    pub async fn attach(deps: Collaborators) -> Result<Arc<Self>, ForegroundError> {
        let settings = timer_store::load_settings(deps.store.as_ref()).await;
        let state = match timer_store::load_timer_state(deps.store.as_ref()).await {
            Some(state) => {
                info!(
                    "Restored timer state: {:?}, {}s left, cycle {}/{}",
                    state.status(),
                    state.time_left,
                    state.current_cycle,
                    state.total_cycles
                );
                state
            }
            None => TimerState::new(&settings),
        };

        let (update_tx, _) = watch::channel(state.clone());
        let foreground = Arc::new(Self {
            deps,
            op_lock: AsyncMutex::new(()),
            timer: Mutex::new(state),
            ticker: Mutex::new(None),
            update_tx,
        });

        foreground.deps.bridge.send(&Message::SurfaceOpened {}).await;

        let now = foreground.deps.clock.now_ms();
        let (expired, running) = foreground.with_timer(|timer| {
            (timer.reconcile(now), timer.is_running)
        })?;

        if expired {
            info!("Phase expired while detached, completing it now");
            foreground.handle_timer_complete().await?;
        }
        if foreground.is_running() {
            foreground.start_ticker();
        } else if running {
            debug!("Timer finished during reconciliation");
        }

        Ok(foreground)
    }

    /// Stop ticking when the surface goes away. Persisted state is left as
    /// is so the next attach can reconcile from `endTime`.
    pub fn detach(&self) {
        self.stop_ticker();
        self.deps.bridge.post(&Message::SurfaceClosed {});
        info!("Foreground detached");
    }

    /// Current snapshot of the timer
    pub fn state(&self) -> Result<TimerState, ForegroundError> {
        self.with_timer(|timer| timer.clone())
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().map(|t| t.is_running).unwrap_or(false)
    }

    /// Watch every change to the timer, tick by tick
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.update_tx.subscribe()
    }

    pub fn has_active_ticker(&self) -> bool {
        self.ticker
            .lock()
            .map(|t| t.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Start from idle or resume from pause
    pub async fn start_timer(self: &Arc<Self>) -> Result<TimerState, ForegroundError> {
        let _op = self.op_lock.lock().await;
        let now = self.deps.clock.now_ms();
        let (started, snapshot) = self.with_timer(|timer| (timer.start(now), timer.clone()))?;
        if !started {
            debug!("Start requested while already running");
            return Ok(snapshot);
        }

        info!(
            "Timer started: {} phase, {}s left, cycle {}/{}",
            snapshot.mode.label(),
            snapshot.time_left,
            snapshot.current_cycle,
            snapshot.total_cycles
        );
        self.persist(&snapshot).await;
        self.announce_phase(&snapshot).await;
        self.start_ticker();
        Ok(snapshot)
    }

    /// Freeze the countdown
    pub async fn pause_timer(&self) -> Result<TimerState, ForegroundError> {
        let _op = self.op_lock.lock().await;
        self.stop_ticker();
        let (paused, snapshot) = self.with_timer(|timer| (timer.pause(), timer.clone()))?;
        if !paused {
            return Ok(snapshot);
        }

        info!("Timer paused with {}s left", snapshot.time_left);
        self.persist(&snapshot).await;
        self.deps.bridge.send(&Message::ClearTimer {}).await;
        Ok(snapshot)
    }

    /// Back to idle; clears persisted run state and tells the background to
    /// stop watching. Safe to call repeatedly.
    pub async fn reset_timer(&self) -> Result<TimerState, ForegroundError> {
        let _op = self.op_lock.lock().await;
        self.stop_ticker();
        let snapshot = self.with_timer(|timer| {
            timer.reset();
            timer.clone()
        })?;

        info!("Timer reset");
        if let Err(e) = timer_store::clear_timer_state(self.deps.store.as_ref()).await {
            warn!("Failed to clear persisted timer state: {}", e);
        }
        self.deps.bridge.send(&Message::ClearTimer {}).await;
        Ok(snapshot)
    }

    /// Save new settings and apply them to the live timer
    pub async fn update_settings(
        &self,
        settings: TimerSettings,
    ) -> Result<TimerState, ForegroundError> {
        let _op = self.op_lock.lock().await;
        if let Err(e) = timer_store::save_settings(self.deps.store.as_ref(), &settings).await {
            warn!("Failed to save timer settings: {}", e);
        }

        let snapshot = self.with_timer(|timer| {
            timer.apply_settings(&settings);
            timer.clone()
        })?;
        info!(
            "Settings updated: focus={}m, rest={}m, cycles={}",
            settings.focus_minutes, settings.rest_minutes, settings.total_cycles
        );

        if !snapshot.is_idle() {
            self.persist(&snapshot).await;
        }
        Ok(snapshot)
    }

    /// Advance the countdown by one second
    pub async fn tick(&self) -> Result<Option<TimerEvent>, ForegroundError> {
        let _op = self.op_lock.lock().await;
        let now = self.deps.clock.now_ms();
        let (event, snapshot) = self.with_timer(|timer| (timer.tick(now), timer.clone()))?;

        match event {
            Some(event) => {
                self.dispatch(event, &snapshot).await;
                Ok(Some(event))
            }
            None => {
                debug!("Tick: {}s left", snapshot.time_left);
                Ok(None)
            }
        }
    }

    /// End the current phase now and move to the next one
    pub async fn handle_timer_complete(&self) -> Result<Option<TimerEvent>, ForegroundError> {
        let _op = self.op_lock.lock().await;
        let now = self.deps.clock.now_ms();
        let outcome = self.with_timer(|timer| {
            if timer.is_running {
                Some((timer.complete_phase(now), timer.clone()))
            } else {
                None
            }
        })?;

        match outcome {
            Some((event, snapshot)) => {
                self.dispatch(event, &snapshot).await;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    /// Side effects of a phase transition: notifications, persistence, and a
    /// push to the background so it can watch the new deadline
    async fn dispatch(&self, event: TimerEvent, snapshot: &TimerState) {
        info!("Timer transition: {:?}", event);
        if let Some(alert) = alert_for(event) {
            self.deps
                .notifier
                .notify(alert.title(), &alert.message(), Priority::High);
        }

        match event {
            TimerEvent::FocusComplete { cycle } => {
                self.deps.bridge.post(&Message::TimerComplete {
                    mode: TimerMode::Focus,
                    cycle,
                });
                self.persist(snapshot).await;
                self.announce_phase(snapshot).await;
            }
            TimerEvent::RestComplete { .. } => {
                self.persist(snapshot).await;
                self.announce_phase(snapshot).await;
            }
            TimerEvent::AllCyclesComplete { total_cycles } => {
                self.stop_ticker();
                self.deps
                    .bridge
                    .post(&Message::AllCyclesComplete { total_cycles });
                if let Err(e) = timer_store::clear_timer_state(self.deps.store.as_ref()).await {
                    warn!("Failed to clear persisted timer state: {}", e);
                }
                self.deps.bridge.send(&Message::ClearTimer {}).await;
            }
        }
    }

    async fn announce_phase(&self, snapshot: &TimerState) {
        if let Some(end_time) = snapshot.end_time {
            self.deps.bridge.send(&Message::StartTimer { end_time }).await;
        }
    }

    async fn persist(&self, snapshot: &TimerState) {
        if let Err(e) = timer_store::save_timer_state(self.deps.store.as_ref(), snapshot).await {
            warn!("Failed to persist timer state: {}", e);
        }
    }

    fn start_ticker(self: &Arc<Self>) {
        let handle = spawn_ticker(Arc::downgrade(self));
        if let Ok(mut ticker) = self.ticker.lock() {
            if let Some(previous) = ticker.replace(handle) {
                previous.stop();
            }
        }
    }

    fn stop_ticker(&self) {
        if let Some(handle) = self.ticker.lock().ok().and_then(|mut t| t.take()) {
            handle.stop();
            debug!("Ticker stopped");
        }
    }

    /// Mutate the timer under its lock and publish the result
    fn with_timer<T, F>(&self, f: F) -> Result<T, ForegroundError>
    where
        F: FnOnce(&mut TimerState) -> T,
    {
        let mut timer = self.timer.lock().map_err(|_| ForegroundError::Poisoned)?;
        let result = f(&mut timer);
        self.update_tx.send_replace(timer.clone());
        Ok(result)
    }
}

impl Drop for Foreground {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

fn alert_for(event: TimerEvent) -> Option<Alert> {
    match event {
        TimerEvent::FocusComplete { cycle } => Some(Alert::FocusComplete { cycle }),
        TimerEvent::RestComplete { .. } => None,
        TimerEvent::AllCyclesComplete { total_cycles } => {
            Some(Alert::AllCyclesComplete { total_cycles })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bridge::{self, BridgeReceiver, Response},
        clock::ManualClock,
        services::notifications::testing::RecordingNotifier,
        state::TimerStatus,
        store::MemoryStore,
    };
    use serde_json::{json, Value};
    use std::time::Duration;

    const T0: i64 = 1_700_000_000_000;

    struct Harness {
        deps: Collaborators,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
        inbox: Arc<Mutex<Vec<Value>>>,
    }

    /// Collaborators with a background stand-in that acknowledges and
    /// records every message
    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        let notifier = Arc::new(RecordingNotifier::default());
        let (tx, rx) = bridge::channel(64);
        let inbox = Arc::new(Mutex::new(Vec::new()));
        tokio::spawn(record_messages(rx, Arc::clone(&inbox)));

        Harness {
            deps: Collaborators {
                store: store.clone(),
                bridge: tx,
                notifier: notifier.clone(),
                clock: clock.clone(),
            },
            store,
            clock,
            notifier,
            inbox,
        }
    }

    async fn record_messages(mut rx: BridgeReceiver, inbox: Arc<Mutex<Vec<Value>>>) {
        while let Some(envelope) = rx.recv().await {
            inbox.lock().unwrap().push(envelope.payload.clone());
            envelope.respond(Response::ok("ok"));
        }
    }

    fn kinds(inbox: &Mutex<Vec<Value>>) -> Vec<String> {
        inbox
            .lock()
            .unwrap()
            .iter()
            .map(|m| m["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    async fn tick_n(foreground: &Foreground, clock: &ManualClock, n: u64) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        for _ in 0..n {
            clock.advance_secs(1);
            if let Some(event) = foreground.tick().await.unwrap() {
                events.push(event);
            }
        }
        events
    }

    #[tokio::test]
    async fn fresh_attach_uses_stored_settings() {
        let h = harness();
        timer_store::save_settings(h.store.as_ref(), &TimerSettings::new(50, 10, 2))
            .await
            .unwrap();

        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        let state = fg.state().unwrap();
        assert_eq!(state.status(), TimerStatus::Idle);
        assert_eq!(state.time_left, 3000);
        assert_eq!(state.total_cycles, 2);
    }

    #[tokio::test]
    async fn start_persists_and_announces_deadline() {
        let h = harness();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();

        let state = fg.start_timer().await.unwrap();
        assert_eq!(state.end_time, Some(T0 + 1_500_000));
        assert!(fg.has_active_ticker());

        let stored = timer_store::load_timer_state(h.store.as_ref()).await.unwrap();
        assert!(stored.is_running);
        assert_eq!(stored.end_time, Some(T0 + 1_500_000));

        let inbox = h.inbox.lock().unwrap().clone();
        assert_eq!(
            inbox,
            vec![
                json!({"type": "surfaceOpened"}),
                json!({"type": "startTimer", "endTime": T0 + 1_500_000}),
            ]
        );
    }

    #[tokio::test]
    async fn focus_completion_notifies_and_starts_rest() {
        let h = harness();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        fg.start_timer().await.unwrap();
        fg.detach();

        let events = tick_n(&fg, &h.clock, 1500).await;
        assert_eq!(events, vec![TimerEvent::FocusComplete { cycle: 1 }]);

        let state = fg.state().unwrap();
        assert_eq!(state.status(), TimerStatus::Running(TimerMode::Rest));
        assert_eq!(state.time_left, 300);
        assert_eq!(h.notifier.titles(), vec!["Focus complete!"]);
        assert_eq!(
            kinds(&h.inbox),
            vec!["surfaceOpened", "startTimer", "surfaceClosed", "timerComplete", "startTimer"]
        );

        let stored = timer_store::load_timer_state(h.store.as_ref()).await.unwrap();
        assert_eq!(stored.mode, TimerMode::Rest);
        assert_eq!(stored.end_time, Some(T0 + 1_800_000));
    }

    #[tokio::test]
    async fn rest_completion_is_silent_and_last_one_finishes() {
        let h = harness();
        timer_store::save_settings(h.store.as_ref(), &TimerSettings::new(1, 1, 2))
            .await
            .unwrap();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        fg.start_timer().await.unwrap();
        fg.detach();

        let events = tick_n(&fg, &h.clock, 240).await;
        assert_eq!(
            events,
            vec![
                TimerEvent::FocusComplete { cycle: 1 },
                TimerEvent::RestComplete { next_cycle: 2 },
                TimerEvent::FocusComplete { cycle: 2 },
                TimerEvent::AllCyclesComplete { total_cycles: 2 },
            ]
        );
        assert_eq!(
            h.notifier.titles(),
            vec!["Focus complete!", "Focus complete!", "All cycles complete!"]
        );

        let state = fg.state().unwrap();
        assert_eq!(state.status(), TimerStatus::Idle);
        assert_eq!(state.current_cycle, 1);
        assert!(timer_store::load_timer_state(h.store.as_ref()).await.is_none());
        assert_eq!(kinds(&h.inbox).last().map(String::as_str), Some("clearTimer"));
        assert!(kinds(&h.inbox).contains(&"allCyclesComplete".to_string()));
    }

    #[tokio::test]
    async fn pause_and_resume_keep_remaining_time() {
        let h = harness();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        fg.start_timer().await.unwrap();
        fg.detach();
        tick_n(&fg, &h.clock, 1400).await;

        let paused = fg.pause_timer().await.unwrap();
        assert_eq!(paused.time_left, 100);
        assert_eq!(paused.end_time, None);
        assert!(!fg.has_active_ticker());

        h.clock.advance_secs(600);
        let resumed = fg.start_timer().await.unwrap();
        assert_eq!(resumed.end_time, Some(h.clock.now_ms() + 100_000));
        fg.detach();

        tick_n(&fg, &h.clock, 1).await;
        assert_eq!(fg.state().unwrap().time_left, 99);
    }

    #[tokio::test]
    async fn reset_twice_matches_reset_once() {
        let h = harness();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        fg.start_timer().await.unwrap();
        tick_n(&fg, &h.clock, 10).await;

        let once = fg.reset_timer().await.unwrap();
        let twice = fg.reset_timer().await.unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.status(), TimerStatus::Idle);
        assert_eq!(twice.mode, TimerMode::Focus);
        assert_eq!(twice.current_cycle, 1);
        assert!(!fg.has_active_ticker());
        assert!(timer_store::load_timer_state(h.store.as_ref()).await.is_none());
    }

    #[tokio::test]
    async fn reopen_after_gap_reconciles_from_deadline() {
        let h = harness();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        fg.start_timer().await.unwrap();
        fg.detach();
        drop(fg);

        h.clock.advance_secs(600);
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        let state = fg.state().unwrap();
        assert_eq!(state.status(), TimerStatus::Running(TimerMode::Focus));
        assert_eq!(state.time_left, 900);
        assert!(fg.has_active_ticker());
    }

    #[tokio::test]
    async fn reopen_past_deadline_completes_immediately() {
        let h = harness();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        fg.start_timer().await.unwrap();
        fg.detach();
        drop(fg);

        h.clock.advance_secs(1500 + 10);
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        let state = fg.state().unwrap();
        assert_eq!(state.status(), TimerStatus::Running(TimerMode::Rest));
        assert_eq!(state.time_left, 300);
        assert_eq!(h.notifier.titles(), vec!["Focus complete!"]);
    }

    #[tokio::test]
    async fn paused_state_survives_reopen() {
        let h = harness();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        fg.start_timer().await.unwrap();
        fg.detach();
        tick_n(&fg, &h.clock, 5).await;
        fg.pause_timer().await.unwrap();
        drop(fg);

        h.clock.advance_secs(3600);
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        let state = fg.state().unwrap();
        assert_eq!(state.status(), TimerStatus::Paused(TimerMode::Focus));
        assert_eq!(state.time_left, 1495);
        assert!(!fg.has_active_ticker());
    }

    #[tokio::test]
    async fn works_without_a_background_listener() {
        let h = harness();
        let (tx, rx) = bridge::channel(1);
        drop(rx);
        let deps = Collaborators {
            bridge: tx,
            ..h.deps.clone()
        };

        let fg = Foreground::attach(deps).await.unwrap();
        fg.start_timer().await.unwrap();
        fg.pause_timer().await.unwrap();
        fg.reset_timer().await.unwrap();
        assert_eq!(fg.state().unwrap().status(), TimerStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_counts_down_once_per_second() {
        let h = harness();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        fg.start_timer().await.unwrap();
        let mut updates = fg.subscribe();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(fg.state().unwrap().time_left, 1497);
        assert!(updates.has_changed().unwrap());

        fg.pause_timer().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fg.state().unwrap().time_left, 1497);
    }

    /// Run a 1/1/2 timer up to the last second of its first focus phase
    async fn one_second_before_rest(h: &Harness) -> Arc<Foreground> {
        timer_store::save_settings(h.store.as_ref(), &TimerSettings::new(1, 1, 2))
            .await
            .unwrap();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();
        fg.start_timer().await.unwrap();
        fg.detach();
        tick_n(&fg, &h.clock, 59).await;
        assert_eq!(fg.state().unwrap().time_left, 1);
        fg
    }

    #[tokio::test]
    async fn reset_during_phase_transition_stays_reset() {
        let h = harness();
        let fg = one_second_before_rest(&h).await;

        let (ticked, reset) = tokio::join!(fg.tick(), async {
            tokio::task::yield_now().await;
            fg.reset_timer().await
        });
        assert_eq!(ticked.unwrap(), Some(TimerEvent::FocusComplete { cycle: 1 }));
        assert_eq!(reset.unwrap().status(), TimerStatus::Idle);

        assert_eq!(fg.state().unwrap().status(), TimerStatus::Idle);
        assert!(timer_store::load_timer_state(h.store.as_ref()).await.is_none());
        assert_eq!(kinds(&h.inbox).last().map(String::as_str), Some("clearTimer"));
    }

    #[tokio::test]
    async fn pause_during_phase_transition_persists_paused_rest() {
        let h = harness();
        let fg = one_second_before_rest(&h).await;

        let (ticked, paused) = tokio::join!(fg.tick(), async {
            tokio::task::yield_now().await;
            fg.pause_timer().await
        });
        assert_eq!(ticked.unwrap(), Some(TimerEvent::FocusComplete { cycle: 1 }));
        assert_eq!(paused.unwrap().status(), TimerStatus::Paused(TimerMode::Rest));

        let stored = timer_store::load_timer_state(h.store.as_ref()).await.unwrap();
        assert_eq!(stored.status(), TimerStatus::Paused(TimerMode::Rest));
        assert_eq!(stored.end_time, None);
        assert_eq!(kinds(&h.inbox).last().map(String::as_str), Some("clearTimer"));
        assert!(!fg.has_active_ticker());
    }

    #[tokio::test]
    async fn racing_ticks_complete_a_phase_once() {
        let h = harness();
        let fg = one_second_before_rest(&h).await;

        let (first, second) = tokio::join!(fg.tick(), fg.tick());
        let events: Vec<_> = [first.unwrap(), second.unwrap()].into_iter().flatten().collect();
        assert_eq!(events, vec![TimerEvent::FocusComplete { cycle: 1 }]);
        assert_eq!(fg.state().unwrap().time_left, 59);
        assert_eq!(h.notifier.titles(), vec!["Focus complete!"]);
    }

    #[tokio::test]
    async fn settings_update_reseeds_idle_timer() {
        let h = harness();
        let fg = Foreground::attach(h.deps.clone()).await.unwrap();

        let state = fg.update_settings(TimerSettings::new(45, 15, 3)).await.unwrap();
        assert_eq!(state.time_left, 45 * 60);
        assert_eq!(
            timer_store::load_settings(h.store.as_ref()).await,
            TimerSettings::new(45, 15, 3)
        );
        assert!(timer_store::load_timer_state(h.store.as_ref()).await.is_none());
    }
}
