//! Shared market types for the UP/DOWN pair arbitrage bot.
//!
//! A market here is a complementary binary pair: an UP token and a DOWN
//! token whose prices should sum to roughly $1.00. Settlement pays exactly
//! $1.00 to one matched pair of shares.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome side of a binary market pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Betting on the UP outcome.
    Up,
    /// Betting on the DOWN outcome.
    Down,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Returns the display string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Best-ask snapshot of both sides of a market pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    /// Identifier of the instrument pair.
    pub market_id: String,

    /// Best ask for the UP token.
    pub price_up: Decimal,

    /// Best ask for the DOWN token.
    pub price_down: Decimal,

    /// Venue timestamp of the snapshot.
    pub timestamp: DateTime<Utc>,
}

impl Ticker {
    /// Returns the price of the requested side.
    #[must_use]
    pub fn price(&self, side: Side) -> Decimal {
        match side {
            Side::Up => self.price_up,
            Side::Down => self.price_down,
        }
    }
}

/// An acknowledged buy fill returned by a venue.
///
/// `price` is the price the venue actually filled at, which may differ from
/// the price requested. It is the authoritative entry price for a leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFill {
    /// Venue-assigned order identifier.
    pub order_id: String,

    /// Identifier of the instrument pair.
    pub market_id: String,

    /// Side that was bought.
    pub side: Side,

    /// Actual fill price.
    pub price: Decimal,

    /// Filled size in shares.
    pub size: Decimal,

    /// Venue timestamp of the fill.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Up.opposite(), Side::Down);
        assert_eq!(Side::Down.opposite(), Side::Up);
    }

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Up.to_string(), "UP");
        assert_eq!(Side::Down.to_string(), "DOWN");
    }

    #[test]
    fn test_ticker_price_by_side() {
        let ticker = Ticker {
            market_id: "btc-updown".to_string(),
            price_up: dec!(0.52),
            price_down: dec!(0.49),
            timestamp: Utc::now(),
        };
        assert_eq!(ticker.price(Side::Up), dec!(0.52));
        assert_eq!(ticker.price(Side::Down), dec!(0.49));
    }
}
