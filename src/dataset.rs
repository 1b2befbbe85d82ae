//! Training data: a variable-major feature matrix and a target vector.

use crate::error::DataError;

/// Immutable training data shared by every tree evolved against it.
///
/// `features[i][j]` is the value of variable `x[i]` in sample `j`, so each
/// row is the full batch for one variable. Evaluation works a row at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl Dataset {
    /// Build a dataset from variable-major rows and targets.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no variables or samples, if any row's
    /// length differs from the target length, or if any value is not finite.
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self, DataError> {
        if features.is_empty() {
            return Err(DataError::NoVariables);
        }
        if targets.is_empty() {
            return Err(DataError::NoSamples);
        }
        for (index, row) in features.iter().enumerate() {
            if row.len() != targets.len() {
                return Err(DataError::RaggedFeature {
                    index,
                    len: row.len(),
                    expected: targets.len(),
                });
            }
        }
        let all_finite = features
            .iter()
            .flatten()
            .chain(&targets)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(DataError::NonFinite);
        }

        Ok(Self { features, targets })
    }

    /// Build a dataset from sample-major rows (one `Vec` of inputs per sample).
    ///
    /// # Errors
    ///
    /// Same conditions as [`Dataset::new`], plus [`DataError::RaggedSample`]
    /// for a sample whose width differs from the first sample's.
    pub fn from_samples(samples: &[Vec<f64>], targets: Vec<f64>) -> Result<Self, DataError> {
        let width = samples.first().map_or(0, Vec::len);
        let mut features = vec![Vec::with_capacity(samples.len()); width];
        for (index, sample) in samples.iter().enumerate() {
            if sample.len() != width {
                return Err(DataError::RaggedSample {
                    index,
                    len: sample.len(),
                    expected: width,
                });
            }
            for (row, &value) in features.iter_mut().zip(sample) {
                row.push(value);
            }
        }
        Self::new(features, targets)
    }

    /// Number of input variables.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.features.len()
    }

    /// Number of samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.targets.len()
    }

    /// All samples of variable `index`, if it exists.
    #[must_use]
    pub fn feature(&self, index: usize) -> Option<&[f64]> {
        self.features.get(index).map(Vec::as_slice)
    }

    /// The target vector.
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Mean squared error of `predictions` against the targets.
    ///
    /// Returns `None` if the lengths differ.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean_squared_error(&self, predictions: &[f64]) -> Option<f64> {
        if predictions.len() != self.targets.len() {
            return None;
        }
        let sum: f64 = self
            .targets
            .iter()
            .zip(predictions)
            .map(|(y, p)| (y - p) * (y - p))
            .sum();
        Some(sum / self.targets.len() as f64)
    }
}
