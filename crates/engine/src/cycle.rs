//! Cycle state machine: dump entry, hedge wait, completion.
//!
//! One cycle buys the dislocated side cheaply (leg 1), then waits for the
//! opposite side to get cheap enough that both legs together cost less
//! than the $1.00 settlement payout (leg 2). The engine is driven by a
//! single logical sequence of `tick` calls; ticks must not run
//! concurrently because the transitions are not idempotent.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use updown_arb_core::{Side, StrategyConfig, Ticker, Venue, VenueError};
use updown_arb_market::PriceWindow;

/// Lookback used for dump detection, in seconds.
const DUMP_LOOKBACK_SECS: i64 = 3;

/// Errors from the cycle engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Strategy parameters rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A venue call failed; the tick produced no state transition and it
    /// is safe to tick again.
    #[error(transparent)]
    Venue(#[from] VenueError),
}

/// Where the engine is in the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No position held; monitoring for a dump on either side.
    Watching,
    /// One leg filled; waiting for the hedge condition.
    Leg1Bought {
        /// Side bought in leg 1.
        side: Side,
        /// Actual fill price of leg 1.
        entry_price: Decimal,
    },
    /// Both legs filled. No further action until `reset`.
    Done,
}

/// A state transition produced by one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    /// Leg 1 filled after a dump was detected.
    Leg1Entered {
        side: Side,
        entry_price: Decimal,
        /// Fractional drop over the lookback that triggered entry.
        drop: Decimal,
    },
    /// Leg 2 filled; the cycle is complete.
    Completed(CycleReport),
}

/// Realized economics of a completed cycle.
///
/// Settlement pays exactly $1.00 per matched pair of complementary shares,
/// so profit per share is `1.0 - total_cost`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub leg1_side: Side,
    pub leg1_price: Decimal,
    pub leg2_price: Decimal,
    pub total_cost: Decimal,
    pub profit_per_share: Decimal,
    pub roi_pct: Decimal,
}

impl CycleReport {
    fn new(leg1_side: Side, leg1_price: Decimal, leg2_price: Decimal) -> Self {
        let total_cost = leg1_price + leg2_price;
        let profit_per_share = Decimal::ONE - total_cost;
        let roi_pct = if total_cost > Decimal::ZERO {
            profit_per_share / total_cost * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        Self {
            leg1_side,
            leg1_price,
            leg2_price,
            total_cost,
            profit_per_share,
            roi_pct,
        }
    }
}

/// The cycle state machine.
///
/// The two price histories are long-lived siblings passed in at
/// construction: `reset` starts a new round without clearing them, so
/// price continuity carries across rounds and stale data ages out of the
/// windows naturally.
pub struct CycleEngine {
    config: StrategyConfig,
    venue: Arc<dyn Venue>,
    up_history: Arc<PriceWindow>,
    down_history: Arc<PriceWindow>,
    state: CycleState,
    round_start: DateTime<Utc>,
    window_duration: Duration,
}

impl std::fmt::Debug for CycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleEngine").finish_non_exhaustive()
    }
}

impl CycleEngine {
    /// Creates an engine in `Watching` with the round starting now
    /// (venue time).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfig` when the strategy parameters
    /// fail validation.
    pub fn new(
        config: StrategyConfig,
        venue: Arc<dyn Venue>,
        up_history: Arc<PriceWindow>,
        down_history: Arc<PriceWindow>,
    ) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        let window_duration = Duration::from_std(config.window_duration)
            .map_err(|e| EngineError::InvalidConfig(format!("window_duration: {e}")))?;

        let round_start = venue.current_time();
        Ok(Self {
            config,
            venue,
            up_history,
            down_history,
            state: CycleState::Watching,
            round_start,
            window_duration,
        })
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Returns the instant the current round began.
    #[must_use]
    pub fn round_start(&self) -> DateTime<Utc> {
        self.round_start
    }

    /// Starts a new round: back to `Watching`, round clock re-stamped from
    /// the venue. Callable from any state. The price histories are kept.
    pub fn reset(&mut self) {
        info!("resetting cycle for a new round");
        self.state = CycleState::Watching;
        self.round_start = self.venue.current_time();
    }

    /// Runs one tick: fetch the ticker, record both prices, evaluate the
    /// current state.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Venue` when a venue call fails. The tick then
    /// produced no state transition and the same condition is free to
    /// re-trigger on a later tick.
    pub async fn tick(&mut self) -> Result<Option<CycleEvent>, EngineError> {
        let now = self.venue.current_time();
        let ticker = self.venue.get_ticker(&self.config.market_id).await?;

        self.up_history.add(ticker.price_up, now);
        self.down_history.add(ticker.price_down, now);

        match self.state {
            CycleState::Watching => self.evaluate_leg1(&ticker, now).await,
            CycleState::Leg1Bought { side, entry_price } => {
                self.evaluate_leg2(&ticker, side, entry_price).await
            }
            CycleState::Done => Ok(None),
        }
    }

    /// Leg-1 evaluation: inside the opportunity window, look for a sharp
    /// drop over the lookback on either side. UP is checked before DOWN;
    /// if both qualify on the same tick, UP wins.
    async fn evaluate_leg1(
        &mut self,
        ticker: &Ticker,
        now: DateTime<Utc>,
    ) -> Result<Option<CycleEvent>, EngineError> {
        let elapsed = now - self.round_start;
        if elapsed > self.window_duration {
            debug!(
                elapsed_secs = elapsed.num_seconds(),
                window_secs = self.window_duration.num_seconds(),
                "entry window closed, holding in Watching"
            );
            return Ok(None);
        }

        for side in [Side::Up, Side::Down] {
            let current = ticker.price(side);
            let Some(past) = self
                .history(side)
                .price_ago(Duration::seconds(DUMP_LOOKBACK_SECS), now)
            else {
                // Insufficient evidence on this side; not an error.
                continue;
            };
            if past <= Decimal::ZERO {
                continue;
            }

            let drop = (past - current) / past;
            if drop >= self.config.move_pct {
                info!(
                    side = %side,
                    past = %past,
                    current = %current,
                    drop_pct = %(drop * Decimal::ONE_HUNDRED),
                    "dump detected, executing leg 1"
                );
                return self.enter_leg1(side, current, drop).await.map(Some);
            }
        }

        Ok(None)
    }

    async fn enter_leg1(
        &mut self,
        side: Side,
        price: Decimal,
        drop: Decimal,
    ) -> Result<CycleEvent, EngineError> {
        let fill = self
            .venue
            .place_order(&self.config.market_id, side, self.config.shares, price)
            .await
            .inspect_err(|e| warn!(side = %side, error = %e, "leg 1 order failed"))?;

        // The venue's fill price is the authoritative entry price.
        self.state = CycleState::Leg1Bought {
            side,
            entry_price: fill.price,
        };
        info!(
            side = %side,
            entry_price = %fill.price,
            sum_target = %self.config.sum_target,
            "leg 1 filled, waiting for hedge"
        );

        Ok(CycleEvent::Leg1Entered {
            side,
            entry_price: fill.price,
            drop,
        })
    }

    /// Leg-2 evaluation: hedge when entry plus the opposite side's current
    /// ask is at or below the target sum. Waits indefinitely otherwise.
    async fn evaluate_leg2(
        &mut self,
        ticker: &Ticker,
        leg1_side: Side,
        entry_price: Decimal,
    ) -> Result<Option<CycleEvent>, EngineError> {
        let opposite = leg1_side.opposite();
        let opposite_price = ticker.price(opposite);
        let sum = entry_price + opposite_price;

        if sum > self.config.sum_target {
            return Ok(None);
        }

        info!(
            entry = %entry_price,
            opposite = %opposite_price,
            sum = %sum,
            target = %self.config.sum_target,
            "hedge condition met, executing leg 2"
        );

        let fill = self
            .venue
            .place_order(
                &self.config.market_id,
                opposite,
                self.config.shares,
                opposite_price,
            )
            .await
            .inspect_err(|e| warn!(side = %opposite, error = %e, "leg 2 order failed"))?;

        self.state = CycleState::Done;
        let report = CycleReport::new(leg1_side, entry_price, fill.price);
        info!(
            total_cost = %report.total_cost,
            profit_per_share = %report.profit_per_share,
            roi_pct = %report.roi_pct,
            "cycle complete"
        );

        Ok(Some(CycleEvent::Completed(report)))
    }

    fn history(&self, side: Side) -> &PriceWindow {
        match side {
            Side::Up => &self.up_history,
            Side::Down => &self.down_history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration as StdDuration;
    use updown_arb_core::SimVenue;

    fn config() -> StrategyConfig {
        StrategyConfig {
            market_id: "sim-market".to_string(),
            shares: dec!(20),
            sum_target: dec!(0.95),
            move_pct: dec!(0.15),
            window_duration: StdDuration::from_secs(120),
            poll_interval: StdDuration::from_secs(1),
        }
    }

    fn engine_with(cfg: StrategyConfig) -> (CycleEngine, Arc<SimVenue>) {
        let venue = Arc::new(SimVenue::new());
        let up = Arc::new(PriceWindow::new(Duration::seconds(5)));
        let down = Arc::new(PriceWindow::new(Duration::seconds(5)));
        let engine = CycleEngine::new(cfg, venue.clone(), up, down).unwrap();
        (engine, venue)
    }

    /// Primes both histories at 0.50/0.50: one tick now, one 3s later.
    async fn prime(engine: &mut CycleEngine, venue: &SimVenue) {
        venue.set_prices(dec!(0.50), dec!(0.50));
        engine.tick().await.unwrap();
        venue.advance(Duration::seconds(3));
        engine.tick().await.unwrap();
    }

    #[tokio::test]
    async fn test_dump_on_up_enters_leg1() {
        let (mut engine, venue) = engine_with(config());
        prime(&mut engine, &venue).await;

        // 0.50 -> 0.30 in one second: 40% drop over the 3s lookback.
        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.30), dec!(0.55));
        let event = engine.tick().await.unwrap();

        assert_eq!(
            engine.state(),
            CycleState::Leg1Bought {
                side: Side::Up,
                entry_price: dec!(0.30)
            }
        );
        match event {
            Some(CycleEvent::Leg1Entered {
                side, entry_price, ..
            }) => {
                assert_eq!(side, Side::Up);
                assert_eq!(entry_price, dec!(0.30));
            }
            other => panic!("expected Leg1Entered, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_up_wins_when_both_sides_dump() {
        let (mut engine, venue) = engine_with(config());
        prime(&mut engine, &venue).await;

        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.30), dec!(0.30));
        engine.tick().await.unwrap();

        assert!(matches!(
            engine.state(),
            CycleState::Leg1Bought { side: Side::Up, .. }
        ));
    }

    #[tokio::test]
    async fn test_first_tick_has_no_lookback_and_stays_watching() {
        let (mut engine, venue) = engine_with(config());

        // Only sample is the tick's own append, 3s from the lookback
        // target: insufficient evidence, not an error.
        venue.set_prices(dec!(0.30), dec!(0.55));
        let event = engine.tick().await.unwrap();

        assert_eq!(event, None);
        assert_eq!(engine.state(), CycleState::Watching);
    }

    #[tokio::test]
    async fn test_hedge_completes_cycle_with_reported_economics() {
        let (mut engine, venue) = engine_with(config());
        prime(&mut engine, &venue).await;

        // Leg 1 at 0.40 (20% drop); DOWN too expensive to hedge yet.
        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.40), dec!(0.75));
        engine.tick().await.unwrap();
        assert!(matches!(engine.state(), CycleState::Leg1Bought { .. }));

        // DOWN falls to 0.55: 0.40 + 0.55 = 0.95 <= 0.95.
        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.40), dec!(0.55));
        let event = engine.tick().await.unwrap();

        assert_eq!(engine.state(), CycleState::Done);
        match event {
            Some(CycleEvent::Completed(report)) => {
                assert_eq!(report.leg1_side, Side::Up);
                assert_eq!(report.total_cost, dec!(0.95));
                assert_eq!(report.profit_per_share, dec!(0.05));
                assert_eq!(report.roi_pct.round_dp(2), dec!(5.26));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hedge_waits_indefinitely_above_target() {
        let (mut engine, venue) = engine_with(config());
        prime(&mut engine, &venue).await;

        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.40), dec!(0.75));
        engine.tick().await.unwrap();

        // Sum stays above target for many ticks; no timeout.
        for _ in 0..30 {
            venue.advance(Duration::seconds(1));
            let event = engine.tick().await.unwrap();
            assert_eq!(event, None);
        }
        assert!(matches!(engine.state(), CycleState::Leg1Bought { .. }));
    }

    #[tokio::test]
    async fn test_expired_window_blocks_entry() {
        let mut cfg = config();
        cfg.window_duration = StdDuration::from_secs(2);
        let (mut engine, venue) = engine_with(cfg);
        prime(&mut engine, &venue).await;

        // elapsed is now past the 2s window; a qualifying dump is ignored.
        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.30), dec!(0.55));
        let event = engine.tick().await.unwrap();

        assert_eq!(event, None);
        assert_eq!(engine.state(), CycleState::Watching);
    }

    #[tokio::test]
    async fn test_failed_leg1_order_leaves_state_and_retriggers() {
        let (mut engine, venue) = engine_with(config());
        prime(&mut engine, &venue).await;

        venue.fail_next_orders(1);
        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.30), dec!(0.55));

        let err = engine.tick().await.unwrap_err();
        assert!(matches!(err, EngineError::Venue(_)));
        assert_eq!(engine.state(), CycleState::Watching);

        // Same condition re-triggers once the venue recovers.
        venue.advance(Duration::seconds(1));
        engine.tick().await.unwrap();
        assert!(matches!(
            engine.state(),
            CycleState::Leg1Bought { side: Side::Up, .. }
        ));
    }

    #[tokio::test]
    async fn test_failed_leg2_order_keeps_waiting() {
        let (mut engine, venue) = engine_with(config());
        prime(&mut engine, &venue).await;

        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.40), dec!(0.75));
        engine.tick().await.unwrap();

        venue.fail_next_orders(1);
        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.40), dec!(0.55));
        let err = engine.tick().await.unwrap_err();
        assert!(matches!(err, EngineError::Venue(_)));
        assert!(matches!(engine.state(), CycleState::Leg1Bought { .. }));

        // Hedge condition is re-evaluated on the next tick.
        venue.advance(Duration::seconds(1));
        let event = engine.tick().await.unwrap();
        assert!(matches!(event, Some(CycleEvent::Completed(_))));
        assert_eq!(engine.state(), CycleState::Done);
    }

    #[tokio::test]
    async fn test_done_ticks_are_noops_until_reset() {
        let (mut engine, venue) = engine_with(config());
        prime(&mut engine, &venue).await;

        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.40), dec!(0.55));
        engine.tick().await.unwrap();
        engine.tick().await.unwrap();
        assert_eq!(engine.state(), CycleState::Done);

        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.10), dec!(0.10));
        let event = engine.tick().await.unwrap();
        assert_eq!(event, None);
        assert_eq!(engine.state(), CycleState::Done);
    }

    #[tokio::test]
    async fn test_reset_from_any_state_restarts_round() {
        let (mut engine, venue) = engine_with(config());
        prime(&mut engine, &venue).await;

        // From Leg1Bought.
        venue.advance(Duration::seconds(1));
        venue.set_prices(dec!(0.30), dec!(0.75));
        engine.tick().await.unwrap();
        assert!(matches!(engine.state(), CycleState::Leg1Bought { .. }));

        venue.advance(Duration::seconds(7));
        engine.reset();
        assert_eq!(engine.state(), CycleState::Watching);
        assert_eq!(engine.round_start(), venue.current_time());

        // From Watching (idempotent).
        engine.reset();
        assert_eq!(engine.state(), CycleState::Watching);
    }

    #[tokio::test]
    async fn test_histories_survive_reset() {
        let venue = Arc::new(SimVenue::new());
        let up = Arc::new(PriceWindow::new(Duration::seconds(5)));
        let down = Arc::new(PriceWindow::new(Duration::seconds(5)));
        let mut engine =
            CycleEngine::new(config(), venue.clone(), up.clone(), down.clone()).unwrap();

        prime(&mut engine, &venue).await;
        let retained = up.len();
        assert!(retained > 0);

        engine.reset();
        assert_eq!(up.len(), retained);
        assert_eq!(down.len(), retained);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_construction() {
        let cfg = StrategyConfig {
            shares: dec!(0),
            ..config()
        };
        let venue = Arc::new(SimVenue::new());
        let up = Arc::new(PriceWindow::new(Duration::seconds(5)));
        let down = Arc::new(PriceWindow::new(Duration::seconds(5)));
        let err = CycleEngine::new(cfg, venue, up, down).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }
}
