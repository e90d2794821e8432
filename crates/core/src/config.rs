//! Application and strategy configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::VenueError;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Strategy parameters.
    pub strategy: StrategyConfig,

    /// Polymarket venue settings.
    pub polymarket: PolymarketSection,
}

/// Parameters of the two-leg dump/hedge strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Identifier of the instrument pair to trade.
    pub market_id: String,

    /// Position size per leg, in shares.
    pub shares: Decimal,

    /// Hedge threshold: leg 2 fires when entry price plus the opposite
    /// side's current ask is at or below this sum.
    pub sum_target: Decimal,

    /// Dump trigger: minimum fractional drop over the lookback
    /// (0.15 = 15%).
    pub move_pct: Decimal,

    /// Opportunity window for leg 1 entry, measured from round start.
    #[serde(with = "humantime_serde")]
    pub window_duration: Duration,

    /// Interval between driver ticks.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            market_id: String::new(),
            shares: dec!(20),
            sum_target: dec!(0.95),
            move_pct: dec!(0.15),
            window_duration: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl StrategyConfig {
    /// Validates strategy parameters.
    ///
    /// # Errors
    ///
    /// Returns `VenueError::Configuration` when a parameter cannot produce
    /// a sane cycle: non-positive sizes or thresholds, a hedge target
    /// outside (0, 1], or zero durations.
    pub fn validate(&self) -> Result<(), VenueError> {
        if self.shares <= Decimal::ZERO {
            return Err(VenueError::Configuration(format!(
                "shares must be positive, got {}",
                self.shares
            )));
        }
        if self.move_pct <= Decimal::ZERO {
            return Err(VenueError::Configuration(format!(
                "move_pct must be positive, got {}",
                self.move_pct
            )));
        }
        if self.sum_target <= Decimal::ZERO || self.sum_target > Decimal::ONE {
            return Err(VenueError::Configuration(format!(
                "sum_target must be in (0, 1], got {}",
                self.sum_target
            )));
        }
        if self.window_duration.is_zero() {
            return Err(VenueError::Configuration(
                "window_duration must be non-zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(VenueError::Configuration(
                "poll_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Polymarket CLOB connection settings.
///
/// Credentials (API key, secret, passphrase, signing key) come from
/// environment variables, never from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolymarketSection {
    /// CLOB REST base URL.
    pub base_url: String,

    /// ERC-1155 token ID of the UP outcome.
    pub up_token_id: String,

    /// ERC-1155 token ID of the DOWN outcome.
    pub down_token_id: String,

    /// Address holding the funds (proxy or EOA).
    pub funder_address: String,

    /// Chain ID (137 = Polygon mainnet).
    pub chain_id: u64,

    /// Requests per minute limit for the REST client.
    pub requests_per_minute: u32,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PolymarketSection {
    fn default() -> Self {
        Self {
            base_url: "https://clob.polymarket.com".to_string(),
            up_token_id: String::new(),
            down_token_id: String::new(),
            funder_address: String::new(),
            chain_id: 137,
            requests_per_minute: 60,
            timeout_secs: 10,
        }
    }
}
