pub mod window;

pub use window::{PricePoint, PriceWindow, LOOKUP_TOLERANCE_SECS};
