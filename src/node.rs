//! Expression tree nodes.
//!
//! A [`Node`] exclusively owns its children, so cloning a node deep-copies
//! the whole subtree. Positions inside a tree are addressed by a [`NodePath`]
//! (the sequence of child choices from the root) instead of parent links.

use crate::dataset::Dataset;
use crate::error::{EvalError, EvalResult};
use crate::operators::{BinaryOp, UnaryOp};
use std::fmt;

/// Which child of an operator node to descend into.
///
/// A unary node keeps its only child on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// First operand (or the only operand of a unary node).
    Left,
    /// Second operand of a binary node.
    Right,
}

/// Location of a node, as child choices taken from the root.
///
/// The empty path is the root; the path length is the node's depth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<Side>);

impl NodePath {
    /// The root position.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Depth of the addressed node (root = 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether this addresses the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The child choices from the root.
    #[must_use]
    pub fn sides(&self) -> &[Side] {
        &self.0
    }

    /// The path to this node's child on `side`.
    #[must_use]
    pub fn child(&self, side: Side) -> Self {
        let mut sides = self.0.clone();
        sides.push(side);
        Self(sides)
    }
}

impl From<Vec<Side>> for NodePath {
    fn from(sides: Vec<Side>) -> Self {
        Self(sides)
    }
}

/// One element of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Binary operator applied to two subtrees.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// First operand.
        left: Box<Node>,
        /// Second operand.
        right: Box<Node>,
    },
    /// Unary operator applied to one subtree.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        child: Box<Node>,
    },
    /// Input variable `x[index]`.
    Variable(usize),
    /// Finite constant.
    Constant(f64),
}

impl Node {
    /// Build a binary node.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Build a unary node.
    #[must_use]
    pub fn unary(op: UnaryOp, child: Node) -> Self {
        Self::Unary {
            op,
            child: Box::new(child),
        }
    }

    /// Whether this is a variable or constant.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Variable(_) | Self::Constant(_))
    }

    /// Whether this is a binary node.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary { .. })
    }

    /// Children in left-to-right order.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        let (first, second) = match self {
            Self::Binary { left, right, .. } => (Some(&**left), Some(&**right)),
            Self::Unary { child, .. } => (Some(&**child), None),
            Self::Variable(_) | Self::Constant(_) => (None, None),
        };
        first.into_iter().chain(second)
    }

    /// The child on `side`, if there is one.
    #[must_use]
    pub fn child(&self, side: Side) -> Option<&Node> {
        match (self, side) {
            (Self::Binary { left, .. }, Side::Left)
            | (Self::Unary { child: left, .. }, Side::Left) => Some(left.as_ref()),
            (Self::Binary { right, .. }, Side::Right) => Some(right.as_ref()),
            _ => None,
        }
    }

    /// Mutable access to the child on `side`, if there is one.
    pub fn child_mut(&mut self, side: Side) -> Option<&mut Node> {
        match (self, side) {
            (Self::Binary { left, .. }, Side::Left)
            | (Self::Unary { child: left, .. }, Side::Left) => Some(left.as_mut()),
            (Self::Binary { right, .. }, Side::Right) => Some(right.as_mut()),
            _ => None,
        }
    }

    /// Number of nodes in this subtree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children().map(Node::node_count).sum::<usize>()
    }

    /// Levels in this subtree: a leaf has height 1.
    #[must_use]
    pub fn height(&self) -> usize {
        1 + self.children().map(Node::height).max().unwrap_or(0)
    }

    /// Largest variable index referenced, if any.
    #[must_use]
    pub fn max_variable(&self) -> Option<usize> {
        match self {
            Self::Variable(index) => Some(*index),
            Self::Constant(_) => None,
            _ => self.children().filter_map(Node::max_variable).max(),
        }
    }

    /// Paths of every node in this subtree, in pre-order (root first).
    #[must_use]
    pub fn locations(&self) -> Vec<NodePath> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut path = Vec::new();
        self.collect_locations(&mut path, &mut out);
        out
    }

    fn collect_locations(&self, path: &mut Vec<Side>, out: &mut Vec<NodePath>) {
        out.push(NodePath(path.clone()));
        for side in [Side::Left, Side::Right] {
            if let Some(child) = self.child(side) {
                path.push(side);
                child.collect_locations(path, out);
                path.pop();
            }
        }
    }

    /// The node at `path`, relative to this one.
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&Node> {
        path.sides()
            .iter()
            .try_fold(self, |node, &side| node.child(side))
    }

    /// Mutable access to the node at `path`, relative to this one.
    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        path.sides()
            .iter()
            .try_fold(self, |node, &side| node.child_mut(side))
    }

    /// Put `replacement` at `path` and return the subtree it displaced.
    ///
    /// Returns `None` if the path does not exist.
    pub fn replace(&mut self, path: &NodePath, replacement: Node) -> Option<Node> {
        let slot = self.get_mut(path)?;
        Some(std::mem::replace(slot, replacement))
    }

    /// Structural expression string, e.g. `add(x[0], 1.0)`.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Evaluate this subtree over every sample of `data` at once.
    ///
    /// Returns one value per sample. Non-finite values are passed through;
    /// callers decide whether they make the expression invalid.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable index is out of range for `data`, or
    /// if operand vectors disagree on length.
    pub fn evaluate(&self, data: &Dataset) -> EvalResult<Vec<f64>> {
        match self {
            Self::Constant(value) => Ok(vec![*value; data.sample_count()]),
            Self::Variable(index) => data
                .feature(*index)
                .map(<[f64]>::to_vec)
                .ok_or(EvalError::UnknownVariable {
                    index: *index,
                    count: data.variable_count(),
                }),
            Self::Unary { op, child } => {
                let mut values = child.evaluate(data)?;
                op.apply(&mut values);
                Ok(values)
            }
            Self::Binary { op, left, right } => {
                let mut values = left.evaluate(data)?;
                let rhs = right.evaluate(data)?;
                if values.len() != rhs.len() {
                    return Err(EvalError::ShapeMismatch {
                        left: values.len(),
                        right: rhs.len(),
                    });
                }
                op.apply(&mut values, &rhs);
                Ok(values)
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "{value:?}"),
            Self::Variable(index) => write!(f, "x[{index}]"),
            Self::Unary { op, child } => write!(f, "{op}({child})"),
            Self::Binary { op, left, right } => write!(f, "{op}({left}, {right})"),
        }
    }
}
