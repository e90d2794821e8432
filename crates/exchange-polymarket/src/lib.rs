//! Polymarket CLOB venue adapter.
//!
//! Implements the core `Venue` trait against the Polymarket CLOB REST API:
//! best-ask tickers assembled from both side order books, and BUY orders
//! built, EIP-712 signed, and submitted with L2 HMAC request
//! authentication.

pub mod auth;
pub mod client;
pub mod signing;

pub use auth::PolymarketCredentials;
pub use client::{PolymarketClientConfig, PolymarketVenue};
pub use signing::OrderSigner;
