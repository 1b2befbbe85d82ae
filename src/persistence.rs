//! Saving and loading trees.
//!
//! A tree is stored as a JSON [`TreeRecord`]: its config plus the node graph,
//! with operators referenced by name. Loading resolves those names against an
//! [`OperatorSet`], checks the graph against the config and dataset, and
//! rescores the tree rather than trusting the stored fitness.

use crate::dataset::Dataset;
use crate::error::{ConfigError, StructureError};
use crate::node::Node;
use crate::operators::{OperatorSet, Primitives};
use crate::tree::{Tree, TreeConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Current record format version.
pub const FORMAT_VERSION: u32 = 1;

/// Failure while saving or loading a tree.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The record names an operator the operator set does not register.
    #[error("no {arity}-ary operator named `{name}` is registered")]
    UnknownOperator {
        /// The unresolved name.
        name: String,
        /// Arity the record expects.
        arity: usize,
    },
    /// The record was written by an incompatible version.
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u32),
    /// The stored constant is NaN or infinite.
    #[error("stored constant {0} is not finite")]
    NonFiniteConstant(f64),
    /// The node graph does not fit the tree's config or dataset.
    #[error(transparent)]
    Structure(#[from] StructureError),
    /// The stored config is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The file is not a valid record.
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialized form of a [`Node`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeRecord {
    /// Binary operator node.
    Binary {
        /// Operator name.
        op: String,
        /// First operand.
        left: Box<NodeRecord>,
        /// Second operand.
        right: Box<NodeRecord>,
    },
    /// Unary operator node.
    Unary {
        /// Operator name.
        op: String,
        /// The operand.
        child: Box<NodeRecord>,
    },
    /// Variable leaf.
    Variable {
        /// Feature index.
        index: usize,
    },
    /// Constant leaf.
    Constant {
        /// The value.
        value: f64,
    },
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        match node {
            Node::Binary { op, left, right } => Self::Binary {
                op: op.name().to_string(),
                left: Box::new(Self::from(&**left)),
                right: Box::new(Self::from(&**right)),
            },
            Node::Unary { op, child } => Self::Unary {
                op: op.name().to_string(),
                child: Box::new(Self::from(&**child)),
            },
            Node::Variable(index) => Self::Variable { index: *index },
            Node::Constant(value) => Self::Constant { value: *value },
        }
    }
}

impl NodeRecord {
    /// Rebuild the node graph, resolving operator names in `operators`.
    ///
    /// # Errors
    ///
    /// Returns an error if an operator name is not registered with the
    /// expected arity, or a constant is not finite.
    pub fn to_node(&self, operators: &OperatorSet) -> Result<Node, PersistenceError> {
        match self {
            Self::Binary { op, left, right } => {
                let op = operators
                    .find_binary(op)
                    .ok_or_else(|| PersistenceError::UnknownOperator {
                        name: op.clone(),
                        arity: 2,
                    })?;
                Ok(Node::binary(
                    op,
                    left.to_node(operators)?,
                    right.to_node(operators)?,
                ))
            }
            Self::Unary { op, child } => {
                let op = operators
                    .find_unary(op)
                    .ok_or_else(|| PersistenceError::UnknownOperator {
                        name: op.clone(),
                        arity: 1,
                    })?;
                Ok(Node::unary(op, child.to_node(operators)?))
            }
            Self::Variable { index } => Ok(Node::Variable(*index)),
            Self::Constant { value } if value.is_finite() => Ok(Node::Constant(*value)),
            Self::Constant { value } => Err(PersistenceError::NonFiniteConstant(*value)),
        }
    }
}

/// Serialized form of a [`Tree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    /// Record format version.
    pub version: u32,
    /// The tree's configuration.
    pub config: TreeConfig,
    /// The node graph; `None` for an empty tree.
    pub root: Option<NodeRecord>,
    /// Fitness at save time; `None` when it was invalid. Informational only.
    pub fitness: Option<f64>,
}

impl Tree {
    /// Snapshot this tree as a record.
    #[must_use]
    pub fn to_record(&self) -> TreeRecord {
        TreeRecord {
            version: FORMAT_VERSION,
            config: *self.config(),
            root: self.root().map(NodeRecord::from),
            fitness: self.is_valid().then_some(self.fitness()),
        }
    }

    /// Rebuild a tree from a record and score it against `dataset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is unsupported, the config is invalid,
    /// an operator is unknown, or the graph breaks `max_depth` or refers to
    /// variables `dataset` lacks.
    pub fn from_record(
        record: &TreeRecord,
        primitives: Arc<Primitives>,
        dataset: Arc<Dataset>,
    ) -> Result<Self, PersistenceError> {
        if record.version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(record.version));
        }
        let root = record
            .root
            .as_ref()
            .map(|root| root.to_node(&primitives.operators))
            .transpose()?;

        let mut tree = Self::new(primitives, dataset, record.config)?;
        if let Some(root) = root {
            tree.set_root(root)?;
        }
        Ok(tree)
    }
}

/// Write `tree` to `path` as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or file I/O fails.
pub fn save_tree(tree: &Tree, path: &Path) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(&tree.to_record())?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a tree saved by [`save_tree`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the record
/// does not fit `primitives` and `dataset` (see [`Tree::from_record`]).
pub fn load_tree(
    path: &Path,
    primitives: Arc<Primitives>,
    dataset: Arc<Dataset>,
) -> Result<Tree, PersistenceError> {
    let json = fs::read_to_string(path)?;
    let record: TreeRecord = serde_json::from_str(&json)?;
    Tree::from_record(&record, primitives, dataset)
}
