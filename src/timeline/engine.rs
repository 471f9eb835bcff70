//! Time-sorted schedule of tweens and zero-duration cues.
//!
//! A [`Timeline`] knows nothing about what its entries do. Advancing it returns
//! the entries that fired, in start-time order, and the owner applies them.
//! Entries scheduled at the same instant fire in insertion order.
//!
//! Time is in seconds.

#![allow(missing_docs)]

use std::time::Duration;

use crate::timeline::easing::Easing;

/// One entry that fired during an advance.
#[derive(Debug, Clone, PartialEq)]
pub enum Fired<C, T> {
    Cue(C),
    /// Current tween value; `finished` is set on the sample that reaches `to`.
    Tween { target: T, value: f64, finished: bool },
}

/// Result of [`Timeline::advance`].
#[derive(Debug, Clone, PartialEq)]
pub struct Advance<C, T> {
    pub fired: Vec<Fired<C, T>>,
    /// Every entry has now run to completion.
    pub completed: bool,
    /// Portion of the step past the end of the timeline (zero unless `completed`).
    pub leftover: Duration,
}

/// Read-only view of a pending entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scheduled<'a, C, T> {
    Cue { at: f64, cue: &'a C },
    Tween {
        at: f64,
        target: T,
        from: f64,
        to: f64,
        duration: f64,
        easing: Easing,
    },
}

impl<C, T> Scheduled<'_, C, T> {
    #[must_use]
    pub fn at(&self) -> f64 {
        match self {
            Self::Cue { at, .. } | Self::Tween { at, .. } => *at,
        }
    }
}

#[derive(Debug, Clone)]
enum Action<C, T> {
    Call(Option<C>),
    Tween {
        target: T,
        from: f64,
        to: f64,
        duration: f64,
        easing: Easing,
    },
}

#[derive(Debug, Clone)]
struct Entry<C, T> {
    at: f64,
    action: Action<C, T>,
    done: bool,
}

impl<C, T> Entry<C, T> {
    fn end(&self) -> f64 {
        match &self.action {
            Action::Call(_) => self.at,
            Action::Tween { duration, .. } => self.at + duration,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Timeline<C, T> {
    entries: Vec<Entry<C, T>>,
    elapsed: f64,
    killed: bool,
}

impl<C, T> Default for Timeline<C, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            elapsed: 0.0,
            killed: false,
        }
    }
}

fn sanitize_time(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

impl<C, T: Copy> Timeline<C, T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, entry: Entry<C, T>) {
        if self.killed {
            return;
        }
        let index = self.entries.partition_point(|e| e.at <= entry.at);
        self.entries.insert(index, entry);
    }

    /// Schedule a zero-duration cue at `at` seconds.
    pub fn call(&mut self, at: f64, cue: C) {
        self.insert(Entry {
            at: sanitize_time(at),
            action: Action::Call(Some(cue)),
            done: false,
        });
    }

    /// Schedule a tween of `target` from `from` to `to` over `duration` seconds.
    pub fn tween(&mut self, at: f64, target: T, from: f64, to: f64, duration: f64, easing: Easing) {
        self.insert(Entry {
            at: sanitize_time(at),
            action: Action::Tween {
                target,
                from,
                to,
                duration: sanitize_time(duration),
                easing,
            },
            done: false,
        });
    }

    /// End time of the last entry.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.entries.iter().map(Entry::end).fold(0.0, f64::max)
    }

    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Not killed and at least one entry still pending.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.killed && self.entries.iter().any(|e| !e.done)
    }

    #[must_use]
    pub fn is_killed(&self) -> bool {
        self.killed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending entries in firing order.
    pub fn pending(&self) -> impl Iterator<Item = Scheduled<'_, C, T>> + '_ {
        self.entries
            .iter()
            .filter(|e| !e.done)
            .filter_map(|e| match &e.action {
                Action::Call(cue) => cue.as_ref().map(|cue| Scheduled::Cue { at: e.at, cue }),
                Action::Tween {
                    target,
                    from,
                    to,
                    duration,
                    easing,
                } => Some(Scheduled::Tween {
                    at: e.at,
                    target: *target,
                    from: *from,
                    to: *to,
                    duration: *duration,
                    easing: *easing,
                }),
            })
    }

    /// Move the playhead forward by `dt`.
    pub fn advance(&mut self, dt: Duration) -> Advance<C, T> {
        if !self.is_active() {
            return Advance {
                fired: Vec::new(),
                completed: !self.killed,
                leftover: dt,
            };
        }
        self.elapsed += dt.as_secs_f64();
        let fired = self.collect(self.elapsed);
        let completed = !self.is_active();
        let leftover = if completed {
            Duration::try_from_secs_f64((self.elapsed - self.duration()).max(0.0))
                .unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        Advance {
            fired,
            completed,
            leftover,
        }
    }

    /// Fire everything still pending at its final state and jump to the end.
    pub fn force_complete(&mut self) -> Vec<Fired<C, T>> {
        if !self.is_active() {
            return Vec::new();
        }
        let fired = self.collect(f64::INFINITY);
        self.elapsed = self.elapsed.max(self.duration());
        fired
    }

    /// Drop every unfired entry without running it. Returns how many were
    /// discarded. A killed timeline ignores later scheduling and advances.
    pub fn kill(&mut self) -> usize {
        let discarded = self.entries.iter().filter(|e| !e.done).count();
        self.entries.clear();
        self.killed = true;
        discarded
    }

    fn collect(&mut self, now: f64) -> Vec<Fired<C, T>> {
        let mut fired = Vec::new();
        for entry in &mut self.entries {
            if entry.at > now {
                break;
            }
            if entry.done {
                continue;
            }
            match &mut entry.action {
                Action::Call(cue) => {
                    if let Some(cue) = cue.take() {
                        fired.push(Fired::Cue(cue));
                    }
                    entry.done = true;
                }
                Action::Tween {
                    target,
                    from,
                    to,
                    duration,
                    easing,
                } => {
                    let progress = if *duration > 0.0 {
                        ((now - entry.at) / *duration).min(1.0)
                    } else {
                        1.0
                    };
                    let finished = progress >= 1.0;
                    let value = *from + (*to - *from) * easing.apply(progress);
                    fired.push(Fired::Tween {
                        target: *target,
                        value,
                        finished,
                    });
                    entry.done = finished;
                }
            }
        }
        fired
    }
}
