//! Progress sources and aggregation
//!
//! A long transfer is often tracked by signals that measure different
//! things: a time-based estimate before any byte arrives, and a byte
//! counter once the copy runs. [`AggregateProgress`] blends named sources
//! into one completion fraction for consumers.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Units each source contributes under [`Strategy::Normalize`]
const NORMALIZED_UNITS: u64 = 1000;

/// Point-in-time snapshot of a progress source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub current: u64,
    pub size: u64,
    pub complete: bool,
}

impl Progress {
    /// Completion in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.complete {
            return 1.0;
        }
        if self.size == 0 {
            return 0.0;
        }
        (self.current as f64 / self.size as f64).min(1.0)
    }
}

/// Anything that can report its progress
pub trait Monitorable: Send + Sync + fmt::Debug {
    fn progress(&self) -> Progress;
}

/// Progress estimated from elapsed time against an expected duration.
///
/// Never reports completion on its own; [`TimedProgress::set_completed`]
/// retires the estimate once a real measurement takes over.
#[derive(Debug)]
pub struct TimedProgress {
    started: Instant,
    expected: Duration,
    completed: AtomicBool,
}

impl TimedProgress {
    pub fn new(expected: Duration) -> Self {
        Self {
            started: Instant::now(),
            expected,
            completed: AtomicBool::new(false),
        }
    }

    pub fn expected(&self) -> Duration {
        self.expected
    }

    pub fn set_completed(&self) {
        self.completed.store(true, Ordering::Release);
    }
}

impl Monitorable for TimedProgress {
    fn progress(&self) -> Progress {
        let size = (self.expected.as_millis() as u64).max(1);
        if self.completed.load(Ordering::Acquire) {
            return Progress {
                current: size,
                size,
                complete: true,
            };
        }
        // hold back the last unit so the estimate alone never reads as done
        let elapsed = self.started.elapsed().as_millis() as u64;
        Progress {
            current: elapsed.min(size - 1),
            size,
            complete: false,
        }
    }
}

/// Progress measured in bytes against an expected total
#[derive(Debug)]
pub struct SizedProgress {
    size: u64,
    current: AtomicU64,
    completed: AtomicBool,
}

impl SizedProgress {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            current: AtomicU64::new(0),
            completed: AtomicBool::new(false),
        }
    }

    /// Record `n` more bytes
    pub fn add(&self, n: u64) {
        self.current.fetch_add(n, Ordering::AcqRel);
    }

    pub fn set_completed(&self) {
        self.completed.store(true, Ordering::Release);
    }
}

impl Monitorable for SizedProgress {
    fn progress(&self) -> Progress {
        Progress {
            current: self.current.load(Ordering::Acquire),
            size: self.size,
            complete: self.completed.load(Ordering::Acquire),
        }
    }
}

/// How an aggregate combines its sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Scale each source to the same range before summing, so sources
    /// measured in different units weigh equally
    #[default]
    Normalize,
    /// Sum raw counters; only meaningful when every source uses one unit
    Sum,
}

/// Named progress sources blended into a single signal
#[derive(Debug, Default)]
pub struct AggregateProgress {
    sources: Vec<(String, Arc<dyn Monitorable>)>,
    strategy: Strategy,
}

impl AggregateProgress {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            sources: Vec::new(),
            strategy,
        }
    }

    /// Add a named source
    pub fn with_source(mut self, name: impl Into<String>, source: Arc<dyn Monitorable>) -> Self {
        self.sources.push((name.into(), source));
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Snapshot of one named source
    pub fn source(&self, name: &str) -> Option<Progress> {
        self.sources
            .iter()
            .find(|(source_name, _)| source_name == name)
            .map(|(_, source)| source.progress())
    }

    /// Blended completion in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        self.progress().fraction()
    }
}

impl Monitorable for AggregateProgress {
    fn progress(&self) -> Progress {
        if self.sources.is_empty() {
            return Progress::default();
        }

        let snapshots: Vec<Progress> = self.sources.iter().map(|(_, s)| s.progress()).collect();
        let complete = snapshots.iter().all(|p| p.complete);

        match self.strategy {
            Strategy::Normalize => Progress {
                current: snapshots
                    .iter()
                    .map(|p| (p.fraction() * NORMALIZED_UNITS as f64) as u64)
                    .sum(),
                size: NORMALIZED_UNITS * snapshots.len() as u64,
                complete,
            },
            Strategy::Sum => Progress {
                current: snapshots.iter().map(|p| p.current).sum(),
                size: snapshots.iter().map(|p| p.size).sum(),
                complete,
            },
        }
    }
}
