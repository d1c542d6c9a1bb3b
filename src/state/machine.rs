//! Focus/rest state machine transitions
//!
//! All transitions take the current wall-clock time explicitly so they stay
//! deterministic and testable without a runtime.

use serde::{Deserialize, Serialize};

use super::{TimerMode, TimerSettings, TimerState};

/// Observable outcome of a phase ending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TimerEvent {
    /// A focus phase finished; rest has begun for the same cycle
    FocusComplete { cycle: u32 },
    /// A rest phase finished; the next focus phase has begun
    RestComplete { next_cycle: u32 },
    /// The last rest phase finished; the timer is idle again
    AllCyclesComplete { total_cycles: u32 },
}

impl TimerEvent {
    /// Rest boundaries are silent; only focus and final completion notify.
    pub fn is_notifiable(&self) -> bool {
        !matches!(self, TimerEvent::RestComplete { .. })
    }
}

impl TimerState {
    /// Start from idle, or resume from pause. No-op while already running.
    pub fn start(&mut self, now_ms: i64) -> bool {
        if self.is_running {
            return false;
        }

        if !self.is_paused {
            self.mode = TimerMode::Focus;
            self.total_time = self.phase_seconds(TimerMode::Focus);
            self.time_left = self.total_time;
        }

        self.is_running = true;
        self.is_paused = false;
        self.end_time = Some(deadline(now_ms, self.time_left));
        true
    }

    /// Suspend the countdown, freezing `time_left`
    pub fn pause(&mut self) -> bool {
        if !self.is_running {
            return false;
        }

        self.is_running = false;
        self.is_paused = true;
        self.end_time = None;
        true
    }

    /// Return to idle: focus mode, cycle one, full focus time
    pub fn reset(&mut self) {
        self.is_running = false;
        self.is_paused = false;
        self.mode = TimerMode::Focus;
        self.current_cycle = 1;
        self.total_time = self.phase_seconds(TimerMode::Focus);
        self.time_left = self.total_time;
        self.end_time = None;
    }

    /// Adopt new settings. The running phase keeps its length; an idle timer
    /// is reseeded immediately.
    pub fn apply_settings(&mut self, settings: &TimerSettings) {
        self.focus_minutes = settings.focus_minutes;
        self.rest_minutes = settings.rest_minutes;
        self.total_cycles = settings.total_cycles;

        if self.is_idle() {
            self.reset();
        } else {
            self.current_cycle = self.current_cycle.min(self.total_cycles);
        }
    }

    /// One-second countdown step. Returns the phase outcome when the
    /// countdown reaches zero.
    pub fn tick(&mut self, now_ms: i64) -> Option<TimerEvent> {
        if !self.is_running {
            return None;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            Some(self.complete_phase(now_ms))
        } else {
            None
        }
    }

    /// Recompute `time_left` from the persisted deadline after a gap in
    /// ticking. Returns true when the deadline has already passed.
    pub fn reconcile(&mut self, now_ms: i64) -> bool {
        if !self.is_running {
            return false;
        }

        if let Some(remaining) = self.remaining_at(now_ms) {
            self.time_left = remaining.min(self.total_time);
        }
        self.time_left == 0
    }

    /// End the current phase and begin the next one
    pub fn complete_phase(&mut self, now_ms: i64) -> TimerEvent {
        match self.mode {
            TimerMode::Focus => {
                let cycle = self.current_cycle;
                self.begin_phase(TimerMode::Rest, now_ms);
                TimerEvent::FocusComplete { cycle }
            }
            TimerMode::Rest if self.current_cycle < self.total_cycles => {
                self.current_cycle += 1;
                self.begin_phase(TimerMode::Focus, now_ms);
                TimerEvent::RestComplete {
                    next_cycle: self.current_cycle,
                }
            }
            TimerMode::Rest => {
                let total_cycles = self.total_cycles;
                self.reset();
                TimerEvent::AllCyclesComplete { total_cycles }
            }
        }
    }

    fn begin_phase(&mut self, mode: TimerMode, now_ms: i64) {
        self.mode = mode;
        self.total_time = self.phase_seconds(mode);
        self.time_left = self.total_time;
        self.is_running = true;
        self.is_paused = false;
        self.end_time = Some(deadline(now_ms, self.time_left));
    }
}

fn deadline(now_ms: i64, seconds: u64) -> i64 {
    now_ms.saturating_add(seconds as i64 * 1000)
}
