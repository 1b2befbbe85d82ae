//! Protected numeric operators and the primitive set trees are built from.
//!
//! Every kernel here maps finite inputs to a finite output. Near a domain
//! singularity (division by ~0, log of a non-positive value, overflow) the
//! kernel substitutes a safe value instead of producing NaN or infinity.
//!
//! Operators are plain function pointers tagged with a stable name. The name
//! is what [`crate::Node`] renders and what persisted trees refer to, so it
//! must be unique within an [`OperatorSet`].

use crate::error::ConfigError;
use rand::Rng;
use std::collections::HashSet;
use std::f64::consts::{E, PI, SQRT_2};
use std::fmt;

/// Magnitude at or below which a divisor is treated as zero.
pub const EPS: f64 = 1e-12;

/// A named operator of arity 1.
#[derive(Debug, Clone, Copy)]
pub struct UnaryOp {
    name: &'static str,
    func: fn(f64) -> f64,
}

impl UnaryOp {
    /// Create an operator from a name and an elementwise kernel.
    #[must_use]
    pub const fn new(name: &'static str, func: fn(f64) -> f64) -> Self {
        Self { name, func }
    }

    /// The operator's registered name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Always 1.
    #[must_use]
    pub const fn arity(&self) -> usize {
        1
    }

    /// Apply to a single value.
    #[must_use]
    pub fn call(&self, x: f64) -> f64 {
        (self.func)(x)
    }

    /// Apply elementwise, in place.
    pub fn apply(&self, values: &mut [f64]) {
        for x in values {
            *x = (self.func)(*x);
        }
    }
}

impl PartialEq for UnaryOp {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A named operator of arity 2.
#[derive(Debug, Clone, Copy)]
pub struct BinaryOp {
    name: &'static str,
    func: fn(f64, f64) -> f64,
}

impl BinaryOp {
    /// Create an operator from a name and an elementwise kernel.
    #[must_use]
    pub const fn new(name: &'static str, func: fn(f64, f64) -> f64) -> Self {
        Self { name, func }
    }

    /// The operator's registered name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Always 2.
    #[must_use]
    pub const fn arity(&self) -> usize {
        2
    }

    /// Apply to a single pair of values.
    #[must_use]
    pub fn call(&self, a: f64, b: f64) -> f64 {
        (self.func)(a, b)
    }

    /// Apply elementwise, writing the result into `left`.
    ///
    /// Both slices must have the same length; extra elements are ignored.
    pub fn apply(&self, left: &mut [f64], right: &[f64]) {
        for (a, &b) in left.iter_mut().zip(right) {
            *a = (self.func)(*a, b);
        }
    }
}

impl PartialEq for BinaryOp {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

/// `a / b`, or 0 where `|b| <= EPS`.
#[must_use]
pub fn protected_divide(a: f64, b: f64) -> f64 {
    if b.abs() > EPS {
        finite_or_zero(a / b)
    } else {
        0.0
    }
}

/// `a ^ b`, or 0 where the power is undefined or overflows.
#[must_use]
pub fn protected_power(a: f64, b: f64) -> f64 {
    finite_or_zero(a.powf(b))
}

/// Floored modulo (result takes the divisor's sign), or 0 where `|b| <= EPS`.
#[must_use]
pub fn protected_mod(a: f64, b: f64) -> f64 {
    if b.abs() > EPS {
        finite_or_zero(a - b * (a / b).floor())
    } else {
        0.0
    }
}

/// Natural log with the argument clamped to at least `EPS`.
#[must_use]
pub fn protected_log(x: f64) -> f64 {
    x.max(EPS).ln()
}

/// Base-2 log with the argument clamped to at least `EPS`.
#[must_use]
pub fn protected_log2(x: f64) -> f64 {
    x.max(EPS).log2()
}

/// Base-10 log with the argument clamped to at least `EPS`.
#[must_use]
pub fn protected_log10(x: f64) -> f64 {
    x.max(EPS).log10()
}

/// Square root with negative arguments mapped to 0.
#[must_use]
pub fn protected_sqrt(x: f64) -> f64 {
    x.max(0.0).sqrt()
}

/// `1 / x`, or 0 where `|x| <= EPS`.
#[must_use]
pub fn protected_reciprocal(x: f64) -> f64 {
    protected_divide(1.0, x)
}

fn add(a: f64, b: f64) -> f64 {
    finite_or_zero(a + b)
}

fn subtract(a: f64, b: f64) -> f64 {
    finite_or_zero(a - b)
}

fn multiply(a: f64, b: f64) -> f64 {
    finite_or_zero(a * b)
}

fn negative(x: f64) -> f64 {
    -x
}

fn exp(x: f64) -> f64 {
    finite_or_zero(x.exp())
}

fn tan(x: f64) -> f64 {
    finite_or_zero(x.tan())
}

fn arcsin(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).asin()
}

fn arccos(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).acos()
}

fn sinh(x: f64) -> f64 {
    finite_or_zero(x.sinh())
}

fn cosh(x: f64) -> f64 {
    finite_or_zero(x.cosh())
}

fn square(x: f64) -> f64 {
    finite_or_zero(x * x)
}

/// Catalogue of the operators available to tree generation and mutation.
///
/// Immutable once built; trees share it through [`Primitives`].
#[derive(Debug, Clone)]
pub struct OperatorSet {
    unary: Vec<UnaryOp>,
    binary: Vec<BinaryOp>,
}

impl OperatorSet {
    /// Build a set from explicit operator lists.
    ///
    /// # Errors
    ///
    /// Returns an error if either list is empty or two operators share a name.
    pub fn new(unary: Vec<UnaryOp>, binary: Vec<BinaryOp>) -> Result<Self, ConfigError> {
        if unary.is_empty() {
            return Err(ConfigError::EmptyOperators("unary"));
        }
        if binary.is_empty() {
            return Err(ConfigError::EmptyOperators("binary"));
        }

        let mut seen = HashSet::new();
        let names = unary
            .iter()
            .map(UnaryOp::name)
            .chain(binary.iter().map(BinaryOp::name));
        for name in names {
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateOperator(name.to_string()));
            }
        }

        Ok(Self { unary, binary })
    }

    /// The standard catalogue: arithmetic, protected division/power/modulo,
    /// min/max, logs, roots, and the trigonometric and hyperbolic families.
    #[must_use]
    pub fn standard() -> Self {
        let unary = vec![
            UnaryOp::new("negative", negative),
            UnaryOp::new("absolute", f64::abs),
            UnaryOp::new("protected_sqrt", protected_sqrt),
            UnaryOp::new("exp", exp),
            UnaryOp::new("protected_log", protected_log),
            UnaryOp::new("protected_log2", protected_log2),
            UnaryOp::new("protected_log10", protected_log10),
            UnaryOp::new("sin", f64::sin),
            UnaryOp::new("cos", f64::cos),
            UnaryOp::new("tan", tan),
            UnaryOp::new("arcsin", arcsin),
            UnaryOp::new("arccos", arccos),
            UnaryOp::new("arctan", f64::atan),
            UnaryOp::new("sinh", sinh),
            UnaryOp::new("cosh", cosh),
            UnaryOp::new("tanh", f64::tanh),
            UnaryOp::new("square", square),
            UnaryOp::new("cbrt", f64::cbrt),
            UnaryOp::new("reciprocal", protected_reciprocal),
        ];
        let binary = vec![
            BinaryOp::new("add", add),
            BinaryOp::new("subtract", subtract),
            BinaryOp::new("multiply", multiply),
            BinaryOp::new("protected_divide", protected_divide),
            BinaryOp::new("protected_power", protected_power),
            BinaryOp::new("maximum", f64::max),
            BinaryOp::new("minimum", f64::min),
            BinaryOp::new("protected_mod", protected_mod),
        ];
        Self { unary, binary }
    }

    /// Unary operators in registration order.
    #[must_use]
    pub fn unary(&self) -> &[UnaryOp] {
        &self.unary
    }

    /// Binary operators in registration order.
    #[must_use]
    pub fn binary(&self) -> &[BinaryOp] {
        &self.binary
    }

    /// Look up a unary operator by name.
    #[must_use]
    pub fn find_unary(&self, name: &str) -> Option<UnaryOp> {
        self.unary.iter().find(|op| op.name == name).copied()
    }

    /// Look up a binary operator by name.
    #[must_use]
    pub fn find_binary(&self, name: &str) -> Option<BinaryOp> {
        self.binary.iter().find(|op| op.name == name).copied()
    }

    /// Pick a unary operator uniformly at random.
    pub fn random_unary<R: Rng>(&self, rng: &mut R) -> UnaryOp {
        self.unary[rng.gen_range(0..self.unary.len())]
    }

    /// Pick a binary operator uniformly at random.
    pub fn random_binary<R: Rng>(&self, rng: &mut R) -> BinaryOp {
        self.binary[rng.gen_range(0..self.binary.len())]
    }
}

impl Default for OperatorSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// The constants a generated leaf may take.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantPalette {
    values: Vec<f64>,
}

impl ConstantPalette {
    /// π, e, √2, √3, plus one value drawn from `[-10, -1]` and one from `[1, 10]`.
    ///
    /// The two random members are drawn here, once, and stay fixed for the
    /// lifetime of the palette.
    #[must_use]
    pub fn notable<R: Rng>(rng: &mut R) -> Self {
        Self {
            values: vec![
                PI,
                E,
                SQRT_2,
                3.0_f64.sqrt(),
                rng.gen_range(-10.0..=-1.0),
                rng.gen_range(1.0..=10.0),
            ],
        }
    }

    /// Build a palette from explicit values.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is empty or holds a non-finite value.
    pub fn from_values(values: Vec<f64>) -> Result<Self, ConfigError> {
        if values.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        if let Some(&bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteConstant(bad));
        }
        Ok(Self { values })
    }

    /// The palette's values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Pick a constant uniformly at random.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        self.values[rng.gen_range(0..self.values.len())]
    }
}

/// Operators and constants shared by every tree of one engine.
#[derive(Debug, Clone)]
pub struct Primitives {
    /// Operator registry.
    pub operators: OperatorSet,
    /// Constant palette for generated leaves.
    pub constants: ConstantPalette,
}

impl Primitives {
    /// Bundle an operator set with a palette.
    #[must_use]
    pub fn new(operators: OperatorSet, constants: ConstantPalette) -> Self {
        Self {
            operators,
            constants,
        }
    }

    /// The standard operator catalogue with the notable-constant palette.
    #[must_use]
    pub fn standard<R: Rng>(rng: &mut R) -> Self {
        Self::new(OperatorSet::standard(), ConstantPalette::notable(rng))
    }
}
