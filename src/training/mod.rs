//! Training and evaluation

pub mod metrics;
pub mod trainer;

pub use metrics::Metric;
pub use trainer::{SplitScore, TrainConfig, TrainReport, Trainer};
