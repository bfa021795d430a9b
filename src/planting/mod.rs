pub mod advisor;
pub mod models;

pub use advisor::{evaluate, PlantingWindowAdvisor, INSUFFICIENT_DATA_REASON};
pub use models::{PlantingThresholds, PlantingWindow};
