//! Evaluation metrics

use crate::errors::{PipelineError, Result};
use std::fmt;
use std::str::FromStr;

/// Supported evaluation metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Share of examples whose top-1 label equals the target
    Accuracy,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
        }
    }

    /// Score predictions against targets
    pub fn compute(&self, predictions: &[Option<String>], targets: &[String]) -> Result<f64> {
        if predictions.len() != targets.len() {
            return Err(PipelineError::DimensionMismatch(format!(
                "{} predictions for {} targets",
                predictions.len(),
                targets.len()
            )));
        }
        if targets.is_empty() {
            return Ok(0.0);
        }
        match self {
            Metric::Accuracy => {
                let hits = predictions
                    .iter()
                    .zip(targets)
                    .filter(|(predicted, target)| predicted.as_deref() == Some(target.as_str()))
                    .count();
                Ok(hits as f64 / targets.len() as f64)
            }
        }
    }
}

impl FromStr for Metric {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accuracy" | "simple_accuracy" => Ok(Metric::Accuracy),
            other => Err(PipelineError::InvalidArgument(format!(
                "unknown metric '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        let predictions = vec![Some("9am".to_string()), Some("June 5".to_string()), None];
        let targets = vec!["9am".to_string(), "June 6".to_string(), "Lot B".to_string()];
        let score = Metric::Accuracy.compute(&predictions, &targets).unwrap();
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            Metric::Accuracy.compute(&[None], &[]),
            Err(PipelineError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!("accuracy".parse::<Metric>().unwrap(), Metric::Accuracy);
        assert!(matches!(
            "f1".parse::<Metric>(),
            Err(PipelineError::InvalidArgument(_))
        ));
    }
}
