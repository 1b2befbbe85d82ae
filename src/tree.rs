//! Expression trees bound to a training set.
//!
//! A [`Tree`] owns its root [`Node`] and caches the root's fitness: the mean
//! squared error of its predictions against the dataset targets, or
//! [`INVALID_FITNESS`] when the expression cannot be scored. Every operation
//! that changes the root recomputes the fitness before returning.
//!
//! Random generation and scoring live here; the mutation and recombination
//! operators are implemented on [`Tree`] in the `mutation` and `crossover`
//! submodules.

mod crossover;
mod mutation;

pub use mutation::Mutation;

use crate::dataset::Dataset;
use crate::error::{ConfigError, EvalError, EvalResult, StructureError};
use crate::node::{Node, NodePath};
use crate::operators::Primitives;
use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Fitness of a tree whose expression could not be scored.
pub const INVALID_FITNESS: f64 = f64::INFINITY;

/// Shape limits and operator probabilities for a tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Deepest allowed node depth (root = 0).
    pub max_depth: usize,
    /// Retry budget for validity-seeking mutation and recombination.
    pub tree_attempts: usize,
    /// Chance that a position above `max_depth` becomes an operator.
    pub branch_probability: f64,
    /// Chance that a generated operator is binary rather than unary.
    pub binary_probability: f64,
    /// Chance that a generated leaf is a variable rather than a constant.
    pub variable_probability: f64,
    /// Chance that [`Tree::mutate`] picks subtree mutation.
    pub subtree_mutation_rate: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            tree_attempts: 10,
            branch_probability: 0.7,
            binary_probability: 0.5,
            variable_probability: 0.5,
            subtree_mutation_rate: 0.6,
        }
    }
}

impl TreeConfig {
    /// Check that every probability is in `[0, 1]` and the retry budget is non-zero.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        let probabilities = [
            ("branch_probability", self.branch_probability),
            ("binary_probability", self.binary_probability),
            ("variable_probability", self.variable_probability),
            ("subtree_mutation_rate", self.subtree_mutation_rate),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        Ok(())
    }

    /// Parse a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the config is invalid.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// An expression tree evolving against a shared dataset.
#[derive(Debug, Clone)]
pub struct Tree {
    root: Option<Node>,
    fitness: f64,
    config: TreeConfig,
    primitives: Arc<Primitives>,
    dataset: Arc<Dataset>,
}

impl Tree {
    /// Create an empty tree. Call [`Tree::populate`] or [`Tree::set_root`] next.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`TreeConfig::validate`].
    pub fn new(
        primitives: Arc<Primitives>,
        dataset: Arc<Dataset>,
        config: TreeConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            root: None,
            fitness: INVALID_FITNESS,
            config,
            primitives,
            dataset,
        })
    }

    /// Replace the root with a random tree and score it.
    pub fn populate<R: Rng>(&mut self, rng: &mut R) -> f64 {
        self.root = Some(self.generate_random(rng, 0, self.config.max_depth));
        self.compute_fitness()
    }

    /// Generate a random subtree whose nodes sit at depths `current_depth..=max_depth`.
    ///
    /// At `max_depth` a leaf is forced. Above it, an operator is chosen with
    /// `branch_probability` and a leaf otherwise, so trees may stop early.
    pub fn generate_random<R: Rng>(
        &self,
        rng: &mut R,
        current_depth: usize,
        max_depth: usize,
    ) -> Node {
        if current_depth >= max_depth || !rng.gen_bool(self.config.branch_probability) {
            return self.random_leaf(rng);
        }

        let operators = &self.primitives.operators;
        if rng.gen_bool(self.config.binary_probability) {
            let op = operators.random_binary(rng);
            let left = self.generate_random(rng, current_depth + 1, max_depth);
            let right = self.generate_random(rng, current_depth + 1, max_depth);
            Node::binary(op, left, right)
        } else {
            let op = operators.random_unary(rng);
            Node::unary(op, self.generate_random(rng, current_depth + 1, max_depth))
        }
    }

    fn random_leaf<R: Rng>(&self, rng: &mut R) -> Node {
        if rng.gen_bool(self.config.variable_probability) {
            Node::Variable(rng.gen_range(0..self.dataset.variable_count()))
        } else {
            Node::Constant(self.primitives.constants.sample(rng))
        }
    }

    /// Install a hand-built root and score it.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the tree untouched, if `root` is deeper than
    /// `max_depth` or references a variable the dataset does not have.
    pub fn set_root(&mut self, root: Node) -> Result<f64, StructureError> {
        let depth = root.height() - 1;
        if depth > self.config.max_depth {
            return Err(StructureError::DepthExceeded {
                depth,
                max_depth: self.config.max_depth,
            });
        }
        let count = self.dataset.variable_count();
        if let Some(index) = root.max_variable().filter(|&index| index >= count) {
            return Err(StructureError::UnknownVariable { index, count });
        }

        self.root = Some(root);
        Ok(self.compute_fitness())
    }

    /// Score the current root against the training set and cache the result.
    ///
    /// Any evaluation failure yields [`INVALID_FITNESS`] instead of an error.
    pub fn compute_fitness(&mut self) -> f64 {
        self.compute_fitness_with_predictions();
        self.fitness
    }

    /// Like [`Tree::compute_fitness`], also returning the predictions when the
    /// tree is valid.
    pub fn compute_fitness_with_predictions(&mut self) -> Option<Vec<f64>> {
        match self.score() {
            Ok((mse, predictions)) => {
                self.fitness = mse;
                Some(predictions)
            }
            Err(err) => {
                trace!("scoring `{self}` failed: {err}");
                self.fitness = INVALID_FITNESS;
                None
            }
        }
    }

    fn score(&self) -> EvalResult<(f64, Vec<f64>)> {
        let predictions = self.predict(&self.dataset)?;
        let mse = self
            .dataset
            .mean_squared_error(&predictions)
            .ok_or(EvalError::ShapeMismatch {
                left: predictions.len(),
                right: self.dataset.sample_count(),
            })?;
        if !mse.is_finite() {
            return Err(EvalError::NonFinite);
        }
        Ok((mse, predictions))
    }

    /// Evaluate the root over `data`, which need not be the training set.
    ///
    /// Does not touch the cached fitness.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree is empty, the expression does not fit
    /// `data`, or any output is non-finite.
    pub fn predict(&self, data: &Dataset) -> EvalResult<Vec<f64>> {
        let root = self.root.as_ref().ok_or(EvalError::EmptyTree)?;
        let values = root.evaluate(data)?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EvalError::NonFinite);
        }
        Ok(values)
    }

    /// The cached fitness: mean squared error, or [`INVALID_FITNESS`].
    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Whether the cached fitness is finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.fitness.is_finite()
    }

    /// The root node, if the tree has been populated.
    #[must_use]
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// This tree's configuration.
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The shared primitive set.
    #[must_use]
    pub fn primitives(&self) -> &Arc<Primitives> {
        &self.primitives
    }

    /// The shared training set.
    #[must_use]
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Depth of the deepest node, or `None` for an empty tree.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.root.as_ref().map(|root| root.height() - 1)
    }

    /// Number of nodes (0 for an empty tree).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, Node::node_count)
    }

    /// The root's expression string, or an empty string for an empty tree.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    fn locations(&self) -> Vec<NodePath> {
        self.root.as_ref().map(Node::locations).unwrap_or_default()
    }

    fn node_at(&self, path: &NodePath) -> Option<&Node> {
        self.root.as_ref()?.get(path)
    }

    fn replace_at(&mut self, path: &NodePath, replacement: Node) -> Option<Node> {
        self.root.as_mut()?.replace(path, replacement)
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => write!(f, "{root}"),
            None => Ok(()),
        }
    }
}
