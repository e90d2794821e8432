//! Scripted dump-and-hedge scenario against the simulated venue.
//!
//! Two rounds are played out on a manually advanced clock. Round one is
//! the canonical shape: a sudden UP crash, then the hedge waiting out a
//! slow DOWN drift. Round two exercises `reset` and a DOWN-side dump with
//! an immediately affordable hedge.

use std::sync::Arc;

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use updown_arb_core::{SimVenue, StrategyConfig};
use updown_arb_engine::{CycleEngine, CycleEvent, CycleReport};

use super::price_window;

pub async fn execute() -> Result<()> {
    let venue = Arc::new(SimVenue::new());
    let config = StrategyConfig {
        market_id: "btc-updown-15m".to_string(),
        ..StrategyConfig::default()
    };

    let mut engine = CycleEngine::new(
        config,
        venue.clone(),
        price_window(),
        price_window(),
    )?;

    info!("=== round 1: UP crash, hedge after DOWN drifts down ===");

    // Prime a few seconds of steady 0.50/0.50 history.
    for _ in 0..4 {
        step(&venue, &mut engine).await?;
    }

    // UP collapses 40% in one tick while DOWN jumps the other way.
    venue.set_prices(dec!(0.30), dec!(0.75));
    let entered = step(&venue, &mut engine).await?;
    if !matches!(entered, Some(CycleEvent::Leg1Entered { .. })) {
        bail!("expected leg 1 entry on the crash tick");
    }

    // Hedge is too expensive at 0.30 + 0.75; DOWN drifts down until the
    // pair sum reaches the target.
    let mut report = None;
    for down in [dec!(0.73), dec!(0.71), dec!(0.69), dec!(0.67), dec!(0.65)] {
        venue.set_prices(dec!(0.30), down);
        if let Some(CycleEvent::Completed(r)) = step(&venue, &mut engine).await? {
            report = Some(r);
            break;
        }
    }
    let Some(report) = report else {
        bail!("round 1 never hedged");
    };
    print_report(1, &report);

    info!("=== round 2: DOWN dump with an immediately affordable hedge ===");
    engine.reset();
    // Let the previous round's prices age out of the windows.
    venue.advance(chrono::Duration::seconds(6));

    venue.set_prices(dec!(0.55), dec!(0.48));
    for _ in 0..4 {
        step(&venue, &mut engine).await?;
    }

    venue.set_prices(dec!(0.58), dec!(0.35));
    let entered = step(&venue, &mut engine).await?;
    if !matches!(entered, Some(CycleEvent::Leg1Entered { .. })) {
        bail!("expected leg 1 entry on the DOWN dump");
    }

    // 0.35 + 0.58 is already at or under the target.
    match step(&venue, &mut engine).await? {
        Some(CycleEvent::Completed(report)) => print_report(2, &report),
        _ => bail!("round 2 hedge should fill on the next tick"),
    }

    Ok(())
}

/// Runs one engine tick, reports the event, and advances the clock by one
/// poll interval.
async fn step(
    venue: &Arc<SimVenue>,
    engine: &mut CycleEngine,
) -> Result<Option<CycleEvent>> {
    let event = engine.tick().await?;
    match &event {
        Some(CycleEvent::Leg1Entered {
            side,
            entry_price,
            drop,
        }) => {
            let drop_pct = *drop * Decimal::ONE_HUNDRED;
            info!(%side, %entry_price, %drop_pct, "leg 1 entered");
        }
        Some(CycleEvent::Completed(_)) | None => {}
    }
    venue.advance(chrono::Duration::seconds(1));
    Ok(event)
}

fn print_report(round: u32, report: &CycleReport) {
    println!(
        "round {round}: bought {} at {} + {} at {} | total {} | profit/share {} | ROI {}%",
        report.leg1_side,
        report.leg1_price,
        report.leg1_side.opposite(),
        report.leg2_price,
        report.total_cost,
        report.profit_per_share,
        report.roi_pct.round_dp(2),
    );
}
