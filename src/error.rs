//! Error types for expression evaluation and engine construction.

use thiserror::Error;

/// Failure while evaluating an expression over a dataset.
///
/// Fitness evaluation never surfaces these: they are absorbed into the
/// infinite fitness sentinel. They are returned from [`crate::Node::evaluate`]
/// and [`crate::Tree::predict`] for callers that want the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A variable leaf refers to a feature row the dataset does not have.
    #[error("variable x[{index}] is out of range for {count} variables")]
    UnknownVariable {
        /// The offending variable index.
        index: usize,
        /// Number of variables in the dataset.
        count: usize,
    },
    /// Operand vectors disagree on sample count.
    #[error("operand shape mismatch: {left} vs {right} samples")]
    ShapeMismatch {
        /// Length of the left operand.
        left: usize,
        /// Length of the right operand.
        right: usize,
    },
    /// The output contains NaN or an infinity.
    #[error("expression produced a non-finite value")]
    NonFinite,
    /// The tree has not been populated.
    #[error("tree has no root")]
    EmptyTree,
}

/// A node graph that cannot belong to a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructureError {
    /// The graph is deeper than the tree allows.
    #[error("depth {depth} exceeds max_depth {max_depth}")]
    DepthExceeded {
        /// Depth of the rejected graph.
        depth: usize,
        /// The tree's limit.
        max_depth: usize,
    },
    /// A variable leaf refers past the dataset's variables.
    #[error("variable x[{index}] is out of range for {count} variables")]
    UnknownVariable {
        /// The offending variable index.
        index: usize,
        /// Number of variables in the dataset.
        count: usize,
    },
}

/// Invalid engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A probability lies outside `[0, 1]`.
    #[error("{name} must be within [0, 1], got {value}")]
    Probability {
        /// Name of the configuration field.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The retry budget is zero.
    #[error("tree_attempts must be at least 1")]
    NoAttempts,
    /// An operator list is empty.
    #[error("the {0} operator set is empty")]
    EmptyOperators(&'static str),
    /// Two operators share a name.
    #[error("duplicate operator name `{0}`")]
    DuplicateOperator(String),
    /// The constant palette is empty.
    #[error("the constant palette is empty")]
    EmptyPalette,
    /// The constant palette holds a NaN or infinity.
    #[error("palette constant {0} is not finite")]
    NonFiniteConstant(f64),
    /// Malformed JSON configuration.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DataError {
    /// The feature matrix has no rows.
    #[error("dataset has no variables")]
    NoVariables,
    /// The target vector is empty.
    #[error("dataset has no samples")]
    NoSamples,
    /// A feature row does not match the target length.
    #[error("variable x[{index}] has {len} samples, expected {expected}")]
    RaggedFeature {
        /// Variable index of the ragged row.
        index: usize,
        /// Its length.
        len: usize,
        /// The target length.
        expected: usize,
    },
    /// A sample row given to `Dataset::from_samples` has the wrong width.
    #[error("sample {index} has {len} inputs, expected {expected}")]
    RaggedSample {
        /// Position of the sample.
        index: usize,
        /// Its number of inputs.
        len: usize,
        /// Width of the first sample.
        expected: usize,
    },
    /// A feature or target value is NaN or infinite.
    #[error("dataset contains a non-finite value")]
    NonFinite,
}

/// Result type for expression evaluation.
pub type EvalResult<T> = Result<T, EvalError>;
