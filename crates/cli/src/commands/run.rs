//! Live polling loop against Polymarket.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use updown_arb_core::ConfigLoader;
use updown_arb_engine::{CycleEngine, CycleEvent, CycleState};
use updown_arb_polymarket::{PolymarketClientConfig, PolymarketVenue};

use super::price_window;

/// Runs the bot until interrupted, or until `rounds` rounds complete.
///
/// A round ends when the cycle reaches `Done`, or when `round_duration`
/// elapses first (the pair re-strikes on a fixed cadence, so a cycle that
/// never fires must not watch a dead market forever). Either way the
/// engine is reset and the price histories carry over.
pub async fn execute(
    config_path: &str,
    rounds: Option<u32>,
    round_duration: Option<Duration>,
) -> Result<()> {
    let config = ConfigLoader::load(config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;
    config.strategy.validate()?;

    let venue_config = PolymarketClientConfig::from_section(&config.polymarket);
    let venue = Arc::new(
        PolymarketVenue::new(venue_config).context("failed to build Polymarket venue")?,
    );

    let up_history = price_window();
    let down_history = price_window();
    let mut engine = CycleEngine::new(
        config.strategy.clone(),
        venue,
        up_history,
        down_history,
    )?;

    let round_duration = round_duration
        .map(chrono::Duration::from_std)
        .transpose()
        .context("round duration out of range")?;

    info!(
        market = %config.strategy.market_id,
        shares = %config.strategy.shares,
        sum_target = %config.strategy.sum_target,
        move_pct = %config.strategy.move_pct,
        "starting live loop"
    );

    let mut interval = tokio::time::interval(config.strategy.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut completed_rounds = 0u32;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
            _ = interval.tick() => {}
        }

        match engine.tick().await {
            Ok(Some(CycleEvent::Leg1Entered {
                side,
                entry_price,
                drop,
            })) => {
                info!(%side, %entry_price, %drop, "leg 1 entered");
            }
            Ok(Some(CycleEvent::Completed(report))) => {
                info!(
                    leg1_side = %report.leg1_side,
                    leg1 = %report.leg1_price,
                    leg2 = %report.leg2_price,
                    total_cost = %report.total_cost,
                    profit_per_share = %report.profit_per_share,
                    roi_pct = %report.roi_pct,
                    "cycle complete"
                );
            }
            Ok(None) => {}
            // Venue failures are never fatal: the tick produced no state
            // change and the next one retries from scratch.
            Err(e) => error!("tick failed: {e}"),
        }

        let round_over = match (engine.state(), round_duration) {
            (CycleState::Done, _) => true,
            (_, Some(max)) => {
                let expired = chrono::Utc::now() - engine.round_start() >= max;
                if expired {
                    warn!("round elapsed without completing, rotating");
                }
                expired
            }
            _ => false,
        };

        if round_over {
            completed_rounds += 1;
            if let Some(max_rounds) = rounds {
                if completed_rounds >= max_rounds {
                    info!(completed_rounds, "round limit reached");
                    break;
                }
            }
            engine.reset();
        }
    }

    Ok(())
}
