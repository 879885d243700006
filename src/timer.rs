//! Pomodoro focus timer.
//!
//! A two-phase countdown. `running` is orthogonal to the phase: pausing keeps
//! the phase and the remaining seconds. Every mutation is written through to
//! the `pomodoro_*` keys of the store.

use crate::model::PlannerError;
use crate::store::{self, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DURATION_KEY: &str = "pomodoro_duration";
pub const BREAK_KEY: &str = "pomodoro_break";
pub const SECONDS_KEY: &str = "pomodoro_seconds";
pub const RUNNING_KEY: &str = "pomodoro_running";
pub const MODE_KEY: &str = "pomodoro_mode";

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Work,
    Break,
}

impl TimerMode {
    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Work => "Work sprint",
            TimerMode::Break => "Break",
        }
    }

    fn other(self) -> Self {
        match self {
            TimerMode::Work => TimerMode::Break,
            TimerMode::Break => TimerMode::Work,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer is paused; nothing changed.
    Idle,
    Counted,
    PhaseChanged(TimerMode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    work_minutes: u32,
    break_minutes: u32,
    seconds: i64,
    running: bool,
    mode: TimerMode,
}

impl FocusTimer {
    pub fn new(work_minutes: u32, break_minutes: u32) -> Self {
        FocusTimer {
            work_minutes: work_minutes.max(1),
            break_minutes: break_minutes.max(1),
            seconds: i64::from(work_minutes.max(1)) * 60,
            running: false,
            mode: TimerMode::Work,
        }
    }

    /// Restores every `pomodoro_*` key, using the given lengths for whatever
    /// is missing. A stored `running = true` resumes from the stored seconds.
    /// Stored seconds outside `-1..=length` are pulled back into that range.
    pub fn load<S: KeyValueStore + ?Sized>(
        store: &S,
        default_work: u32,
        default_break: u32,
    ) -> Self {
        let work_minutes = store::read(store, DURATION_KEY, default_work).max(1);
        let break_minutes = store::read(store, BREAK_KEY, default_break).max(1);
        let running = store::read(store, RUNNING_KEY, false);
        let mode = store::read(store, MODE_KEY, TimerMode::Work);
        let mut timer = FocusTimer {
            work_minutes,
            break_minutes,
            seconds: 0,
            running,
            mode,
        };
        let length = timer.length_of(mode);
        timer.seconds = store::read(store, SECONDS_KEY, length).clamp(-1, length);
        timer
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &S) {
        store::write(store, DURATION_KEY, &self.work_minutes);
        store::write(store, BREAK_KEY, &self.break_minutes);
        store::write(store, SECONDS_KEY, &self.seconds);
        store::write(store, RUNNING_KEY, &self.running);
        store::write(store, MODE_KEY, &self.mode);
    }

    pub fn work_minutes(&self) -> u32 {
        self.work_minutes
    }

    pub fn break_minutes(&self) -> u32 {
        self.break_minutes
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn length_of(&self, mode: TimerMode) -> i64 {
        let minutes = match mode {
            TimerMode::Work => self.work_minutes,
            TimerMode::Break => self.break_minutes,
        };
        i64::from(minutes) * 60
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) -> bool {
        self.running = !self.running;
        self.running
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.seconds = self.length_of(self.mode);
    }

    /// One second of countdown.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        self.seconds -= 1;
        if self.seconds >= 0 {
            return TickOutcome::Counted;
        }
        self.mode = self.mode.other();
        self.seconds = self.length_of(self.mode);
        TickOutcome::PhaseChanged(self.mode)
    }

    pub fn set_work_minutes(&mut self, minutes: i64) -> Result<(), PlannerError> {
        self.work_minutes = positive_minutes(minutes)?;
        if self.mode == TimerMode::Work {
            self.seconds = self.length_of(TimerMode::Work);
        }
        Ok(())
    }

    pub fn set_break_minutes(&mut self, minutes: i64) -> Result<(), PlannerError> {
        self.break_minutes = positive_minutes(minutes)?;
        if self.mode == TimerMode::Break {
            self.seconds = self.length_of(TimerMode::Break);
        }
        Ok(())
    }

    /// `MM:SS`, never negative.
    pub fn display(&self) -> String {
        let clamped = self.seconds.max(0);
        format!("{:02}:{:02}", clamped / 60, clamped % 60)
    }

    /// Fraction of the current phase already elapsed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let total = self.length_of(self.mode) as f64;
        if total <= 0.0 {
            return 0.0;
        }
        (1.0 - self.seconds.max(0) as f64 / total).clamp(0.0, 1.0)
    }
}

impl Default for FocusTimer {
    fn default() -> Self {
        FocusTimer::new(DEFAULT_WORK_MINUTES, DEFAULT_BREAK_MINUTES)
    }
}

fn positive_minutes(minutes: i64) -> Result<u32, PlannerError> {
    if minutes <= 0 {
        return Err(PlannerError::InvalidLength(minutes));
    }
    u32::try_from(minutes).map_err(|_| PlannerError::InvalidLength(minutes))
}

/// Interval handle for a running timer.
///
/// Holding a `Ticker` is what keeps the countdown moving: the owner polls
/// `due` from its event loop and drops the handle when the timer stops.
/// Only whole seconds are reported; the fractional remainder carries over.
#[derive(Debug)]
pub struct Ticker {
    next: Instant,
}

impl Ticker {
    pub fn start(now: Instant) -> Self {
        Ticker { next: now + TICK }
    }

    /// Number of one-second ticks that elapsed up to `now`.
    pub fn due(&mut self, now: Instant) -> u32 {
        let mut count = 0;
        while now >= self.next {
            self.next += TICK;
            count += 1;
        }
        count
    }

    pub fn until_next(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }
}
