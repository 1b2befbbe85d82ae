//! Integration tests driving the engine through its public API.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use exprevo::operators::{protected_divide, protected_log, protected_mod, protected_sqrt};
use exprevo::{
    BinaryOp, ConfigError, ConstantPalette, Dataset, INVALID_FITNESS, Mutation, Node, OperatorSet,
    Primitives, Tree, TreeConfig, UnaryOp, load_tree, save_tree,
};

fn linear_data() -> Arc<Dataset> {
    let samples: Vec<Vec<f64>> = (0..10)
        .map(|i| vec![f64::from(i), f64::from(i % 3)])
        .collect();
    let targets = samples.iter().map(|s| 2.0 * s[0] + s[1]).collect();
    Arc::new(Dataset::from_samples(&samples, targets).unwrap())
}

fn standard() -> Arc<Primitives> {
    let mut rng = SmallRng::seed_from_u64(3);
    Arc::new(Primitives::standard(&mut rng))
}

fn build(primitives: &Arc<Primitives>, max_depth: usize, root: Node) -> Tree {
    let config = TreeConfig {
        max_depth,
        ..TreeConfig::default()
    };
    let mut tree = Tree::new(Arc::clone(primitives), linear_data(), config).unwrap();
    tree.set_root(root).unwrap();
    tree
}

// add(multiply(x[0], 2.0), x[1])
fn exact(primitives: &Primitives) -> Node {
    let ops = &primitives.operators;
    Node::binary(
        ops.find_binary("add").unwrap(),
        Node::binary(
            ops.find_binary("multiply").unwrap(),
            Node::Variable(0),
            Node::Constant(2.0),
        ),
        Node::Variable(1),
    )
}

#[test]
fn test_exact_expression_scores_zero() {
    let primitives = standard();
    let mut tree = build(&primitives, 3, exact(&primitives));
    assert_eq!(tree.fitness(), 0.0);

    let predictions = tree.compute_fitness_with_predictions().unwrap();
    assert_eq!(predictions, linear_data().targets());
    assert_eq!(tree.to_string(), "add(multiply(x[0], 2.0), x[1])");
}

#[test]
fn test_protected_kernels() {
    assert_eq!(protected_divide(1.0, 0.0), 0.0);
    assert_eq!(protected_divide(6.0, 3.0), 2.0);
    assert_eq!(protected_sqrt(-9.0), 0.0);
    assert_eq!(protected_sqrt(9.0), 3.0);
    assert_eq!(protected_mod(-1.0, 3.0), 2.0);
    assert_eq!(protected_mod(5.0, 0.0), 0.0);
    assert!(protected_log(0.0).is_finite());
}

#[test]
fn test_evolution_loop_improves_or_holds() {
    // A minimal (1+1) search: keep a mutant only when it scores better.
    let primitives = standard();
    let mut rng = SmallRng::seed_from_u64(2024);
    let mut best =
        Tree::new(Arc::clone(&primitives), linear_data(), TreeConfig::default()).unwrap();
    best.populate(&mut rng);
    let initial = best.fitness();

    for _ in 0..200 {
        let mut candidate = best.clone();
        candidate.mutate(&mut rng);
        if candidate.fitness() < best.fitness() {
            best = candidate;
        }
    }
    assert!(best.fitness() <= initial);
    assert!(best.depth().unwrap() <= best.config().max_depth);
}

#[test]
fn test_custom_operator_set() {
    fn halve(x: f64) -> f64 {
        x / 2.0
    }
    fn hypot(a: f64, b: f64) -> f64 {
        a.hypot(b)
    }

    let operators = OperatorSet::new(
        vec![UnaryOp::new("halve", halve)],
        vec![BinaryOp::new("hypot", hypot)],
    )
    .unwrap();
    let primitives = Arc::new(Primitives::new(
        operators,
        ConstantPalette::from_values(vec![3.0]).unwrap(),
    ));

    let mut rng = SmallRng::seed_from_u64(5);
    let mut tree =
        Tree::new(Arc::clone(&primitives), linear_data(), TreeConfig::default()).unwrap();
    tree.populate(&mut rng);
    for _ in 0..20 {
        tree.mutate(&mut rng);
    }
    let rendered = tree.render();
    for name in ["add", "multiply", "sin"] {
        assert!(!rendered.contains(name), "{rendered} uses {name}");
    }
}

#[test]
fn test_duplicate_operator_rejected() {
    let err = OperatorSet::new(
        vec![UnaryOp::new("twice", |x| 2.0 * x)],
        vec![BinaryOp::new("twice", |a, _| 2.0 * a)],
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateOperator(name) if name == "twice"));
}

#[test]
fn test_collapse_folds_constant_subtree() {
    // multiply(2.0, 3.0) collapses to 6.0 and keeps the fitness it had
    let primitives = standard();
    let ops = &primitives.operators;
    let root = Node::binary(
        ops.find_binary("add").unwrap(),
        Node::Variable(0),
        Node::binary(
            ops.find_binary("multiply").unwrap(),
            Node::Constant(2.0),
            Node::Constant(3.0),
        ),
    );
    let mut tree = build(&primitives, 3, root);
    let fitness = tree.fitness();
    let mut rng = SmallRng::seed_from_u64(11);

    let mut collapsed = false;
    for _ in 0..20 {
        let mut candidate = tree.clone();
        if candidate.apply_mutation(Mutation::Collapse, &mut rng)
            && candidate.render() == "add(x[0], 6.0)"
        {
            assert!((candidate.fitness() - fitness).abs() < 1e-9);
            collapsed = true;
            break;
        }
    }
    assert!(collapsed);
    tree.compute_fitness();
    assert_eq!(tree.fitness(), fitness);
}

#[test]
fn test_invalid_tree_reports_sentinel() {
    let primitives = standard();
    let mut tree = build(&primitives, 2, Node::Constant(1e200));
    assert_eq!(tree.fitness(), INVALID_FITNESS);
    assert!(!tree.is_valid());
    assert!(tree.compute_fitness_with_predictions().is_none());
}

#[test]
fn test_persisted_tree_reloads_against_same_primitives() {
    let primitives = standard();
    let tree = build(&primitives, 3, exact(&primitives));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best.json");
    save_tree(&tree, &path).unwrap();

    let loaded = load_tree(&path, Arc::clone(&primitives), linear_data()).unwrap();
    assert_eq!(loaded.root(), tree.root());
    assert_eq!(loaded.fitness(), 0.0);

    // A set without `multiply` cannot resolve the stored tree
    let limited = Arc::new(Primitives::new(
        OperatorSet::new(
            vec![UnaryOp::new("negative", |x| -x)],
            vec![BinaryOp::new("add", |a, b| a + b)],
        )
        .unwrap(),
        ConstantPalette::from_values(vec![1.0]).unwrap(),
    ));
    assert!(load_tree(&path, limited, linear_data()).is_err());
}
