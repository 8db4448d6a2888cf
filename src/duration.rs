//! Active read-time tracking
//!
//! Accumulates the wall-clock time a page was the visible, foregrounded tab.
//! Time is kept internally in full-precision seconds so many pause/resume
//! cycles cannot drift, and is floored only at read or report time.

use chrono::{DateTime, Utc};

/// Final fact reported when a duration activation terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFinish {
    pub article_id: String,
    pub duration_seconds: u64,
}

/// Callback invoked at most once, on teardown, when read time was accumulated.
pub type FinishCallback = Box<dyn FnMut(ReadFinish)>;

/// Duration accumulator state.
///
/// The interval start timestamp exists exactly when the state is `Active`, so
/// "running iff a start time is set" holds by construction. `Terminated` is
/// absorbing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveInterval {
    Idle,
    Active {
        started_at: DateTime<Utc>,
        accumulated_sec: f64,
    },
    Paused {
        accumulated_sec: f64,
    },
    Terminated {
        total_sec: f64,
    },
}

impl ActiveInterval {
    /// Begin measuring at `now`. Only an `Idle` accumulator starts.
    pub fn start(self, now: DateTime<Utc>) -> Self {
        match self {
            ActiveInterval::Idle => ActiveInterval::Active {
                started_at: now,
                accumulated_sec: 0.0,
            },
            other => other,
        }
    }

    /// Page became hidden: bank the running interval.
    pub fn pause(self, now: DateTime<Utc>) -> Self {
        match self {
            ActiveInterval::Active {
                started_at,
                accumulated_sec,
            } => ActiveInterval::Paused {
                accumulated_sec: accumulated_sec + elapsed_sec(started_at, now),
            },
            other => other,
        }
    }

    /// Page became visible again: open a fresh interval.
    pub fn resume(self, now: DateTime<Utc>) -> Self {
        match self {
            ActiveInterval::Paused { accumulated_sec } => ActiveInterval::Active {
                started_at: now,
                accumulated_sec,
            },
            other => other,
        }
    }

    /// Final transition; closes any running interval.
    pub fn terminate(self, now: DateTime<Utc>) -> Self {
        match self {
            ActiveInterval::Idle => ActiveInterval::Terminated { total_sec: 0.0 },
            ActiveInterval::Active {
                started_at,
                accumulated_sec,
            } => ActiveInterval::Terminated {
                total_sec: accumulated_sec + elapsed_sec(started_at, now),
            },
            ActiveInterval::Paused { accumulated_sec } => ActiveInterval::Terminated {
                total_sec: accumulated_sec,
            },
            terminated @ ActiveInterval::Terminated { .. } => terminated,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ActiveInterval::Active { .. })
    }

    /// Accumulated seconds including the currently running interval, if any.
    pub fn total_at(&self, now: DateTime<Utc>) -> f64 {
        match *self {
            ActiveInterval::Idle => 0.0,
            ActiveInterval::Active {
                started_at,
                accumulated_sec,
            } => accumulated_sec + elapsed_sec(started_at, now),
            ActiveInterval::Paused { accumulated_sec } => accumulated_sec,
            ActiveInterval::Terminated { total_sec } => total_sec,
        }
    }
}

fn elapsed_sec(started_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - started_at).num_milliseconds() as f64 / 1000.0).max(0.0)
}

/// Render whole seconds as a compact human-readable duration.
///
/// `45` → `"45s"`, `90` → `"1m 30s"`, `120` → `"2m"`.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    let minutes = seconds / 60;
    let remainder = seconds % 60;
    if remainder == 0 {
        format!("{}m", minutes)
    } else {
        format!("{}m {}s", minutes, remainder)
    }
}

/// Read duration tracker entry point.
pub struct ReadDurationTracker;

impl ReadDurationTracker {
    /// Start measuring active read time for `article_id` at `now`.
    ///
    /// With no article identifier (or an empty one) the handle stays idle for
    /// its whole lifetime and never reports anything; that is a valid, silent
    /// outcome, not an error.
    pub fn activate(
        article_id: Option<&str>,
        now: DateTime<Utc>,
        on_finish: impl FnMut(ReadFinish) + 'static,
    ) -> ReadDurationHandle {
        let article_id = article_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let state = if article_id.is_some() {
            ActiveInterval::Idle.start(now)
        } else {
            ActiveInterval::Idle
        };

        ReadDurationHandle {
            article_id,
            state,
            display_seconds: 0,
            on_finish: Box::new(on_finish),
        }
    }
}

/// Live read-time measurement for one activation.
pub struct ReadDurationHandle {
    article_id: Option<String>,
    state: ActiveInterval,
    display_seconds: u64,
    on_finish: FinishCallback,
}

impl ReadDurationHandle {
    /// Page visibility change notification from the platform.
    pub fn visibility_changed(&mut self, hidden: bool, now: DateTime<Utc>) {
        self.state = if hidden {
            self.state.pause(now)
        } else {
            self.state.resume(now)
        };
        self.refresh_display(now);
    }

    /// One-second display timer tick; refreshes [`duration_seconds`](Self::duration_seconds).
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.refresh_display(now);
    }

    /// Whole seconds of active read time, as of the last tick or transition.
    pub fn duration_seconds(&self) -> u64 {
        self.display_seconds
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Live duration readout, e.g. `"1m 30s"`.
    pub fn formatted(&self) -> String {
        format_duration(self.display_seconds)
    }

    /// Terminate the accumulator and report the final duration.
    ///
    /// The finish callback fires iff the floored final duration is greater
    /// than zero; the returned record mirrors what the callback received.
    pub fn deactivate(mut self, now: DateTime<Utc>) -> Option<ReadFinish> {
        self.state = self.state.terminate(now);
        let total = self.state.total_at(now).floor() as u64;
        self.display_seconds = total;

        let article_id = self.article_id.clone()?;
        if total == 0 {
            return None;
        }
        let finish = ReadFinish {
            article_id,
            duration_seconds: total,
        };
        (self.on_finish)(finish.clone());
        Some(finish)
    }

    fn refresh_display(&mut self, now: DateTime<Utc>) {
        self.display_seconds = self.state.total_at(now).floor() as u64;
    }
}
