//! Frame-driven timers
//!
//! Single-shot and repeating timers checked once per frame against the
//! frame timestamp. A repeating timer that fell behind fires once for every
//! interval it missed, in due-time order.

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Synthetic loading-progress increment
    ProgressTick,
    /// Minimum loading time is over and assets are in
    LoadingComplete,
    /// Loading overlay has finished fading out
    OverlayHidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    kind: TimerKind,
    due: f64,
    interval: Option<f64>,
}

#[derive(Debug, Default)]
pub struct Timers {
    timers: Vec<Timer>,
    next_id: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: TimerKind, due: f64, interval: Option<f64>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer { id, kind, due, interval });
        id
    }

    /// Fire once at `at`
    pub fn schedule_once(&mut self, kind: TimerKind, at: f64) -> TimerId {
        self.push(kind, at, None)
    }

    /// Fire every `interval` seconds, starting one interval after `now`.
    /// A non-positive interval fires once.
    pub fn schedule_every(&mut self, kind: TimerKind, now: f64, interval: f64) -> TimerId {
        let interval = (interval > 0.0).then_some(interval);
        self.push(kind, now + interval.unwrap_or(0.0), interval)
    }

    /// Returns false if the timer already fired or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Collect every firing due at or before `now`
    pub fn due(&mut self, now: f64) -> Vec<TimerKind> {
        let mut fired: Vec<(f64, TimerKind)> = Vec::new();
        self.timers.retain_mut(|t| {
            while t.due <= now {
                fired.push((t.due, t.kind));
                match t.interval {
                    Some(interval) => t.due += interval,
                    None => return false,
                }
            }
            true
        });
        fired.sort_by(|a, b| a.0.total_cmp(&b.0));
        fired.into_iter().map(|(_, kind)| kind).collect()
    }
}

#[cfg(test)]
impl Timers {
    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
