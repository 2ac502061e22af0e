//! Cosine similarity and the zero-norm policy

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How to score a query or stored vector whose norm is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Similarity is 0 against everything
    #[default]
    Zero,
    /// A zero-norm query fails with `InvalidArgument`
    Reject,
}

impl FromStr for DegeneratePolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zero" => Ok(DegeneratePolicy::Zero),
            "reject" => Ok(DegeneratePolicy::Reject),
            other => Err(PipelineError::InvalidArgument(format!(
                "unknown degenerate policy '{}' (expected 'zero' or 'reject')",
                other
            ))),
        }
    }
}

/// Euclidean norm, accumulated in f64
pub fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}

/// Dot product, accumulated in f64
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

/// Cosine similarity from precomputed norms; 0 when either norm is 0
pub fn cosine_with_norms(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
}

/// `a·b / (‖a‖·‖b‖)`, 0 when either norm is 0, clamped to [-1, 1]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, norm(a), b, norm(b))
}
