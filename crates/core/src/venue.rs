//! The venue capability trait.
//!
//! Everything the strategy needs from the outside world is behind this
//! trait: a price snapshot, a best-effort buy, and a venue-consistent
//! clock. The clock lives here so the same engine code runs against the
//! live exchange or a deterministic simulated venue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::VenueError;
use crate::types::{OrderFill, Side, Ticker};

/// Abstract market venue: price data, order execution, and time.
#[async_trait]
pub trait Venue: Send + Sync {
    /// Returns the latest best-ask prices for both sides of the pair.
    async fn get_ticker(&self, market_id: &str) -> Result<Ticker, VenueError>;

    /// Submits a best-effort buy. The returned fill price is authoritative
    /// and may differ from the requested price.
    async fn place_order(
        &self,
        market_id: &str,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> Result<OrderFill, VenueError>;

    /// Returns the venue-consistent current time.
    fn current_time(&self) -> DateTime<Utc>;
}
