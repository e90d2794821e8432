pub mod config;
pub mod config_loader;
pub mod error;
pub mod sim;
pub mod types;
pub mod venue;

pub use config::{AppConfig, PolymarketSection, StrategyConfig};
pub use config_loader::ConfigLoader;
pub use error::VenueError;
pub use sim::SimVenue;
pub use types::{OrderFill, Side, Ticker};
pub use venue::Venue;
