//! Mutation operators for expression trees.
//!
//! Each operator changes a tree in place. Subtree and collapse mutation are
//! validity-seeking: a candidate that scores invalid is undone and another is
//! tried, up to `tree_attempts` times, and if none succeeds the tree is left
//! exactly as it was. Point and permutation mutation always commit, even
//! when the result scores invalid. Hoist only retries its search for an
//! operator node.

// Collapse averages over the sample count
#![allow(clippy::cast_precision_loss)]

use super::Tree;
use crate::dataset::Dataset;
use crate::node::Node;
use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The mutation strategies [`Tree::mutate`] chooses between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mutation {
    /// Replace a random subtree with a fresh random one.
    Subtree,
    /// Swap the operator of a random node for another of the same arity.
    Point,
    /// Swap the operands of a random binary node.
    Permutation,
    /// Promote a random operator subtree to be the whole tree.
    Hoist,
    /// Replace a random operator subtree with the constant mean of its output.
    Collapse,
}

impl Mutation {
    /// The strategies picked uniformly when subtree mutation is not chosen.
    pub const SECONDARY: [Mutation; 4] = [
        Mutation::Point,
        Mutation::Permutation,
        Mutation::Hoist,
        Mutation::Collapse,
    ];
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Subtree => "subtree",
            Self::Point => "point",
            Self::Permutation => "permutation",
            Self::Hoist => "hoist",
            Self::Collapse => "collapse",
        };
        f.write_str(name)
    }
}

impl Tree {
    /// Mutate the tree in place and report which strategy was used.
    ///
    /// Subtree mutation is chosen with `subtree_mutation_rate`; otherwise one
    /// of [`Mutation::SECONDARY`] is picked uniformly.
    pub fn mutate<R: Rng>(&mut self, rng: &mut R) -> Mutation {
        let kind = if rng.gen_bool(self.config.subtree_mutation_rate) {
            Mutation::Subtree
        } else {
            Mutation::SECONDARY[rng.gen_range(0..Mutation::SECONDARY.len())]
        };
        self.apply_mutation(kind, rng);
        kind
    }

    /// Run one specific strategy. Returns whether the tree was changed.
    pub fn apply_mutation<R: Rng>(&mut self, kind: Mutation, rng: &mut R) -> bool {
        match kind {
            Mutation::Subtree => self.mutate_subtree(rng),
            Mutation::Point => self.mutate_point(rng),
            Mutation::Permutation => self.mutate_permutation(rng),
            Mutation::Hoist => self.mutate_hoist(rng),
            Mutation::Collapse => self.mutate_collapse(rng),
        }
    }

    /// Replace a random node with a random subtree that fits under `max_depth`.
    ///
    /// Returns `false`, with the tree unchanged, if no candidate scored valid
    /// within `tree_attempts`.
    pub fn mutate_subtree<R: Rng>(&mut self, rng: &mut R) -> bool {
        let locations = self.locations();
        let previous = self.fitness;

        for _ in 0..self.config.tree_attempts {
            let Some(path) = locations.choose(rng) else {
                return false;
            };
            let remaining = self.config.max_depth.saturating_sub(path.depth());
            let fresh = self.generate_random(rng, 0, remaining);
            let Some(original) = self.replace_at(path, fresh) else {
                continue;
            };
            if self.compute_fitness().is_finite() {
                return true;
            }
            self.replace_at(path, original);
            self.fitness = previous;
        }

        debug!(
            "subtree mutation found no valid candidate in {} attempts",
            self.config.tree_attempts
        );
        false
    }

    /// Give a random operator node a random operator of the same arity.
    ///
    /// Leaves are left alone. The fitness is recomputed either way and the
    /// change is kept even if it makes the tree invalid. Returns whether an
    /// operator node was picked.
    pub fn mutate_point<R: Rng>(&mut self, rng: &mut R) -> bool {
        let locations = self.locations();
        let Some(path) = locations.choose(rng) else {
            return false;
        };

        let operators = &self.primitives.operators;
        let changed = match self.root.as_mut().and_then(|root| root.get_mut(path)) {
            Some(Node::Binary { op, .. }) => {
                *op = operators.random_binary(rng);
                true
            }
            Some(Node::Unary { op, .. }) => {
                *op = operators.random_unary(rng);
                true
            }
            _ => false,
        };
        self.compute_fitness();
        changed
    }

    /// Swap the operands of a random binary node and rescore, keeping the
    /// result even if invalid. Returns `false` if there is no binary node.
    pub fn mutate_permutation<R: Rng>(&mut self, rng: &mut R) -> bool {
        let binaries: Vec<_> = self
            .locations()
            .into_iter()
            .filter(|path| self.node_at(path).is_some_and(Node::is_binary))
            .collect();
        let Some(path) = binaries.choose(rng) else {
            return false;
        };

        if let Some(Node::Binary { left, right, .. }) =
            self.root.as_mut().and_then(|root| root.get_mut(path))
        {
            std::mem::swap(left, right);
        }
        self.compute_fitness();
        true
    }

    /// Make a random operator subtree the new root.
    ///
    /// A leaf pick is redrawn up to `tree_attempts` times; if every draw is a
    /// leaf nothing happens and `false` is returned.
    pub fn mutate_hoist<R: Rng>(&mut self, rng: &mut R) -> bool {
        let locations = self.locations();

        for _ in 0..=self.config.tree_attempts {
            let Some(path) = locations.choose(rng) else {
                return false;
            };
            let Some(subtree) = self.node_at(path).filter(|node| !node.is_leaf()) else {
                continue;
            };
            self.root = Some(subtree.clone());
            self.compute_fitness();
            return true;
        }

        debug!("hoist found no operator node to promote");
        false
    }

    /// Replace a random operator subtree with a constant holding the mean of
    /// that subtree's output over the training set (0.0 if it cannot be
    /// evaluated).
    ///
    /// Leaf picks and invalid results both use up an attempt. Returns
    /// `false`, with the tree unchanged, if `tree_attempts` run out.
    pub fn mutate_collapse<R: Rng>(&mut self, rng: &mut R) -> bool {
        let locations = self.locations();
        let previous = self.fitness;

        for _ in 0..self.config.tree_attempts {
            let Some(path) = locations.choose(rng) else {
                return false;
            };
            let value = match self.node_at(path) {
                Some(node) if !node.is_leaf() => collapsed_value(node, &self.dataset),
                _ => continue,
            };
            let Some(original) = self.replace_at(path, Node::Constant(value)) else {
                continue;
            };
            if self.compute_fitness().is_finite() {
                return true;
            }
            self.replace_at(path, original);
            self.fitness = previous;
        }

        debug!(
            "collapse found no valid candidate in {} attempts",
            self.config.tree_attempts
        );
        false
    }
}

/// Mean output of `node` over `data`, or 0.0 when that is not a finite number.
fn collapsed_value(node: &Node, data: &Dataset) -> f64 {
    node.evaluate(data)
        .ok()
        .filter(|values| !values.is_empty())
        .map(|values| values.iter().sum::<f64>() / values.len() as f64)
        .filter(|mean| mean.is_finite())
        .unwrap_or(0.0)
}
