//! Deterministic simulated venue.
//!
//! Drives the engine in tests and in the `simulate` command: the clock only
//! moves when told to, prices are set explicitly, and orders fill
//! immediately at the requested price. Order failures can be injected to
//! exercise the engine's failed-tick path.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::error::VenueError;
use crate::types::{OrderFill, Side, Ticker};
use crate::venue::Venue;

struct SimState {
    time: DateTime<Utc>,
    price_up: Decimal,
    price_down: Decimal,
    failures_remaining: u32,
}

/// Simulated market venue with a manually advanced clock.
pub struct SimVenue {
    inner: Mutex<SimState>,
}

impl SimVenue {
    /// Creates a venue at the current wall-clock time with both sides at 0.50.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Creates a venue with an explicit starting instant.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(SimState {
                time: start,
                price_up: dec!(0.50),
                price_down: dec!(0.50),
                failures_remaining: 0,
            }),
        }
    }

    /// Sets both side prices.
    pub fn set_prices(&self, up: Decimal, down: Decimal) {
        let mut state = self.inner.lock();
        state.price_up = up;
        state.price_down = down;
    }

    /// Advances the simulated clock.
    pub fn advance(&self, by: Duration) {
        let mut state = self.inner.lock();
        state.time += by;
    }

    /// Makes the next `count` order placements fail with a network error.
    pub fn fail_next_orders(&self, count: u32) {
        self.inner.lock().failures_remaining = count;
    }

    /// Nudges the UP price by a random amount within +/- 1%, keeping the
    /// pair sum near 1.0 with a small spread.
    pub fn random_walk(&self) {
        let step: f64 = (rand::random::<f64>() - 0.5) * 0.02;
        let delta = Decimal::try_from(step).unwrap_or_default();

        let mut state = self.inner.lock();
        let up = (state.price_up + delta)
            .clamp(dec!(0.01), dec!(0.99));
        state.price_up = up;
        state.price_down = Decimal::ONE - up - dec!(0.01);
    }
}

impl Default for SimVenue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Venue for SimVenue {
    async fn get_ticker(&self, market_id: &str) -> Result<Ticker, VenueError> {
        let state = self.inner.lock();
        Ok(Ticker {
            market_id: market_id.to_string(),
            price_up: state.price_up,
            price_down: state.price_down,
            timestamp: state.time,
        })
    }

    async fn place_order(
        &self,
        market_id: &str,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> Result<OrderFill, VenueError> {
        if size <= Decimal::ZERO {
            return Err(VenueError::InvalidOrder(format!(
                "size must be positive, got {size}"
            )));
        }

        let mut state = self.inner.lock();
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(VenueError::Network("injected order failure".to_string()));
        }

        // Immediate fill at the requested price.
        Ok(OrderFill {
            order_id: Uuid::new_v4().to_string(),
            market_id: market_id.to_string(),
            side,
            price,
            size,
            timestamp: state.time,
        })
    }

    fn current_time(&self) -> DateTime<Utc> {
        self.inner.lock().time
    }
}
