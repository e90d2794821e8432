pub mod cycle;

pub use cycle::{CycleEngine, CycleEvent, CycleReport, CycleState, EngineError};
