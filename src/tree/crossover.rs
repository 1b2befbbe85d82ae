//! Subtree crossover between two trees.
//!
//! Offspring start as deep clones of the parents, so the parents are never
//! touched. A swap point is accepted only if both offspring stay within
//! `max_depth`, and a swap is kept only if both offspring score valid.

use super::Tree;
use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;

impl Tree {
    /// Produce two offspring by exchanging a random subtree of each parent.
    ///
    /// Up to `tree_attempts` pairs of positions are drawn. A pair is tried
    /// when `depth1 + height2 <= max_depth` and `depth2 + height1 <= max_depth`,
    /// using the smaller of the two parents' limits; the first pair whose
    /// offspring both score valid is returned. Otherwise fresh clones of the
    /// parents come back unchanged.
    #[must_use]
    pub fn recombine<R: Rng>(&self, other: &Tree, rng: &mut R) -> (Tree, Tree) {
        let mut first = self.clone();
        let mut second = other.clone();
        let locations1 = first.locations();
        let locations2 = second.locations();
        let max_depth = self.config.max_depth.min(other.config.max_depth);

        for _ in 0..self.config.tree_attempts {
            let (Some(path1), Some(path2)) = (locations1.choose(rng), locations2.choose(rng))
            else {
                return (first, second);
            };
            let (Some(subtree1), Some(subtree2)) = (first.node_at(path1), second.node_at(path2))
            else {
                continue;
            };
            if path1.depth() + subtree2.height() > max_depth
                || path2.depth() + subtree1.height() > max_depth
            {
                continue;
            }

            let (donor1, donor2) = (subtree1.clone(), subtree2.clone());
            let (Some(original1), Some(original2)) =
                (first.replace_at(path1, donor2), second.replace_at(path2, donor1))
            else {
                continue;
            };

            let valid1 = first.compute_fitness().is_finite();
            let valid2 = second.compute_fitness().is_finite();
            if valid1 && valid2 {
                return (first, second);
            }

            first.replace_at(path1, original1);
            second.replace_at(path2, original2);
        }

        debug!(
            "recombination found no valid swap in {} attempts",
            self.config.tree_attempts
        );
        (self.clone(), other.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::node::Node;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::sync::Arc;

    #[test]
    fn test_recombine_leaves_parents_untouched() {
        let prims = standard_primitives();
        let mut rng = SmallRng::seed_from_u64(17);
        let mut a = Tree::new(Arc::clone(&prims), identity_data(), config(4)).unwrap();
        let mut b = Tree::new(prims, identity_data(), config(4)).unwrap();
        a.populate(&mut rng);
        b.populate(&mut rng);
        let (render_a, render_b) = (a.render(), b.render());

        for _ in 0..50 {
            let (child1, child2) = a.recombine(&b, &mut rng);
            assert!(child1.depth().unwrap() <= 4);
            assert!(child2.depth().unwrap() <= 4);
            assert_eq!(a.render(), render_a);
            assert_eq!(b.render(), render_b);
        }
    }

    #[test]
    fn test_recombine_exchanges_subtrees() {
        let prims = standard_primitives();
        let mut rng = SmallRng::seed_from_u64(4);
        let a = tree(&prims, 3, binary(&prims, "add", Node::Variable(0), Node::Constant(1.0)));
        let b = tree(&prims, 3, unary(&prims, "sin", Node::Constant(2.0)));

        let total = a.node_count() + b.node_count();
        for _ in 0..50 {
            let (child1, child2) = a.recombine(&b, &mut rng);
            assert_eq!(child1.node_count() + child2.node_count(), total);
            assert!(child1.is_valid() && child2.is_valid());
        }
    }

    #[test]
    fn test_recombine_leaf_roots_at_depth_zero_is_noop() {
        let prims = standard_primitives();
        let mut rng = SmallRng::seed_from_u64(8);
        let a = tree(&prims, 0, Node::Variable(0));
        let b = tree(&prims, 0, Node::Constant(2.0));

        let (child1, child2) = a.recombine(&b, &mut rng);
        assert_eq!(child1.render(), "x[0]");
        assert_eq!(child2.render(), "2.0");
        assert!(child1.fitness().abs() < f64::EPSILON);
    }

    #[test]
    fn test_recombine_leaf_roots_swap_when_room() {
        let prims = standard_primitives();
        let mut rng = SmallRng::seed_from_u64(8);
        let a = tree(&prims, 1, Node::Variable(0));
        let b = tree(&prims, 1, Node::Constant(2.0));

        let (child1, child2) = a.recombine(&b, &mut rng);
        assert_eq!(child1.render(), "2.0");
        assert_eq!(child2.render(), "x[0]");
    }

    #[test]
    fn test_recombine_rejects_invalid_offspring() {
        let prims = overflow_primitives();
        let mut rng = SmallRng::seed_from_u64(21);
        let a = tree(&prims, 2, binary(&prims, "add", Node::Variable(0), Node::Constant(1.0)));
        let b = tree(&prims, 2, unary(&prims, "overflow", Node::Constant(2.0)));

        for _ in 0..50 {
            let (child1, child2) = a.recombine(&b, &mut rng);
            // b is invalid and only becomes valid by losing its overflow root,
            // which would hand that root to a; either way no swap is accepted
            assert_eq!(child1.render(), a.render());
            assert_eq!(child2.render(), b.render());
        }
    }

    #[test]
    fn test_recombine_empty_tree_is_noop() {
        let prims = standard_primitives();
        let mut rng = SmallRng::seed_from_u64(8);
        let a = tree(&prims, 2, Node::Variable(0));
        let empty = Tree::new(prims, identity_data(), config(2)).unwrap();

        let (child1, child2) = a.recombine(&empty, &mut rng);
        assert_eq!(child1.render(), "x[0]");
        assert!(child2.root().is_none());
    }
}
