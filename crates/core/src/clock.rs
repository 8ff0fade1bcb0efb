//! Monotonic millisecond clock
//!
//! Version snapshots must carry strictly increasing timestamps, even when two
//! writes land in the same wall-clock millisecond. `Clock::now` therefore
//! returns `max(wall, last + 1)`.
//!
//! A manual clock starts at a fixed instant and only moves when read (one
//! tick per call) or explicitly advanced. Tests use it to place writes at
//! known points in time.

use crate::types::Millis;
use std::sync::atomic::{AtomicI64, Ordering};

/// Strictly increasing millisecond clock
#[derive(Debug)]
pub struct Clock {
    source: Source,
    last: AtomicI64,
}

#[derive(Debug)]
enum Source {
    System,
    Manual(AtomicI64),
}

impl Clock {
    /// Clock backed by the system wall clock
    pub fn system() -> Self {
        Clock {
            source: Source::System,
            last: AtomicI64::new(i64::MIN),
        }
    }

    /// Clock starting at `start` that advances only when read or advanced
    pub fn manual(start: Millis) -> Self {
        Clock {
            source: Source::Manual(AtomicI64::new(start)),
            last: AtomicI64::new(i64::MIN),
        }
    }

    /// Next timestamp, strictly greater than every previous one
    pub fn now(&self) -> Millis {
        let wall = self.wall();
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(wall.max(last.saturating_add(1)))
            })
            // The closure always returns Some
            .unwrap_or_else(|v| v);
        wall.max(prev.saturating_add(1))
    }

    /// Current time without advancing: the later of the wall clock and the
    /// last timestamp handed out
    pub fn peek(&self) -> Millis {
        self.wall().max(self.last.load(Ordering::Acquire))
    }

    /// Move a manual clock forward by `ms` milliseconds
    ///
    /// No-op on a system clock.
    pub fn advance(&self, ms: Millis) {
        if let Source::Manual(base) = &self.source {
            base.fetch_add(ms, Ordering::AcqRel);
        }
    }

    /// True for manual clocks
    pub fn is_manual(&self) -> bool {
        matches!(self.source, Source::Manual(_))
    }

    fn wall(&self) -> Millis {
        match &self.source {
            Source::System => chrono::Utc::now().timestamp_millis(),
            Source::Manual(base) => base.load(Ordering::Acquire),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_strictly_increasing() {
        let clock = Clock::system();
        let mut prev = clock.now();
        for _ in 0..10_000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_manual_ticks_and_advance() {
        let clock = Clock::manual(1_000);
        assert_eq!(clock.now(), 1_000);
        assert_eq!(clock.now(), 1_001);
        clock.advance(100);
        assert_eq!(clock.now(), 1_100);
        assert_eq!(clock.peek(), 1_100);
        assert!(clock.is_manual());
    }

    #[test]
    fn test_concurrent_readers_never_collide() {
        let clock = Arc::new(Clock::manual(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                thread::spawn(move || (0..500).map(|_| clock.now()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<Millis> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
