//! Type definitions module
//!
//! Values exchanged between pipeline stages and scored answers.

pub mod value;
pub mod answer;

// Re-export commonly used types
pub use value::Value;
pub use answer::ScoredAnswer;
