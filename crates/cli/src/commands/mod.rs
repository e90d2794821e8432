pub mod run;
pub mod simulate;

/// History span for the per-side price windows, in seconds. Long enough
/// for the 3-second dump lookback plus lookup tolerance, short enough
/// that stale prices age out quickly.
pub const PRICE_WINDOW_SECS: i64 = 5;

/// Builds one side's price window at the standard span.
pub fn price_window() -> std::sync::Arc<updown_arb_market::PriceWindow> {
    std::sync::Arc::new(updown_arb_market::PriceWindow::new(
        chrono::Duration::seconds(PRICE_WINDOW_SECS),
    ))
}
