//! Bounded, time-pruned price history.
//!
//! One `PriceWindow` tracks one side of a binary pair. Points are appended
//! in time order and everything older than the window is pruned on each
//! insert, so the buffer stays small (window / poll interval entries).
//!
//! Historical lookups are approximate by design: discrete polling makes
//! "the price exactly N seconds ago" unrealistic, so `price_ago` returns
//! the nearest retained point within a fixed 1-second tolerance.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

/// Maximum time distance, in seconds, for a historical lookup to count as
/// a valid answer.
pub const LOOKUP_TOLERANCE_SECS: i64 = 1;

/// A price observed at a specific instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Trailing price record for one side of a pair.
///
/// Interior mutability: `add` and `price_ago` take `&self` and serialize on
/// a per-instance lock, so a background poller can append while the
/// evaluator reads. The UP and DOWN windows are independent instances and
/// never block each other.
pub struct PriceWindow {
    points: RwLock<VecDeque<PricePoint>>,
    window: Duration,
}

impl PriceWindow {
    /// Creates an empty window retaining `window` of trailing history.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            points: RwLock::new(VecDeque::new()),
            window,
        }
    }

    /// Appends a price observed at `now` and prunes points older than the
    /// window. Callers are trusted to supply non-decreasing timestamps;
    /// the newly added point is always retained.
    pub fn add(&self, price: Decimal, now: DateTime<Utc>) {
        let mut points = self.points.write();
        points.push_back(PricePoint {
            price,
            timestamp: now,
        });

        let cutoff = now - self.window;
        while points.len() > 1 {
            match points.front() {
                Some(front) if front.timestamp <= cutoff => {
                    points.pop_front();
                }
                _ => break,
            }
        }
    }

    /// Returns the price of the retained point closest to `now - lookback`,
    /// or `None` when the history is empty or the closest point is more
    /// than the tolerance away (a gap in the data).
    ///
    /// Exact ties go to the earlier point.
    #[must_use]
    pub fn price_ago(&self, lookback: Duration, now: DateTime<Utc>) -> Option<Decimal> {
        let points = self.points.read();
        let target = now - lookback;

        let mut best: Option<(Duration, Decimal)> = None;
        for point in points.iter() {
            let diff = (point.timestamp - target).abs();
            match best {
                Some((min_diff, _)) if diff >= min_diff => {}
                _ => best = Some((diff, point.price)),
            }
        }

        match best {
            Some((min_diff, price)) if min_diff <= Duration::seconds(LOOKUP_TOLERANCE_SECS) => {
                Some(price)
            }
            _ => None,
        }
    }

    /// Returns the most recently added price.
    #[must_use]
    pub fn latest(&self) -> Option<Decimal> {
        self.points.read().back().map(|p| p.price)
    }

    /// Returns the number of retained points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    /// Returns true if no points are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }
}
