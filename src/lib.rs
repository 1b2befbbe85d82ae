// Allow unwrap and exact float comparison in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::float_cmp))]
//! Exprevo: expression-tree engine for genetic-programming symbolic regression.
//!
//! This crate provides the tree layer an evolutionary search is built on:
//! - Random generation of depth-bounded expression trees
//! - Vectorized evaluation and mean-squared-error fitness
//! - Five mutation operators and subtree crossover, all depth-preserving
//! - JSON persistence of trees
//!
//! Population management and selection are left to the caller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ Tree (fitness, mutation, crossover) │
//! ├─────────────────────────────────────┤
//! │   Node graph + vectorized evaluate  │
//! ├──────────────────┬──────────────────┤
//! │ Primitives       │ Dataset          │
//! │ (operators,      │ (features,       │
//! │  constants)      │  targets)        │
//! └──────────────────┴──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use exprevo::{Dataset, Primitives, Tree, TreeConfig};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//! use std::sync::Arc;
//!
//! let mut rng = SmallRng::seed_from_u64(7);
//! let data = Dataset::new(vec![vec![0.0, 1.0, 2.0]], vec![1.0, 2.0, 3.0]).unwrap();
//! let primitives = Arc::new(Primitives::standard(&mut rng));
//!
//! let mut tree = Tree::new(primitives, Arc::new(data), TreeConfig::default()).unwrap();
//! tree.populate(&mut rng);
//! tree.mutate(&mut rng);
//! assert!(tree.depth().unwrap() <= tree.config().max_depth);
//! ```

pub mod dataset;
pub mod error;
pub mod node;
pub mod operators;
pub mod persistence;
pub mod tree;

pub use dataset::Dataset;
pub use error::{ConfigError, DataError, EvalError, EvalResult, StructureError};
pub use node::{Node, NodePath, Side};
pub use operators::{BinaryOp, ConstantPalette, OperatorSet, Primitives, UnaryOp};
pub use persistence::{NodeRecord, PersistenceError, TreeRecord, load_tree, save_tree};
pub use tree::{INVALID_FITNESS, Mutation, Tree, TreeConfig};
