//! The closed set of atoms and their per-atom hooks.
//!
//! Every interior expression node holds one [`Atom`]. The atom fixes the
//! node's shape, sign and curvature from its arguments when the node is
//! built, evaluates it numerically, and lowers it to a LinOp plus cone
//! constraints (see [`Atom::graph_implementation`]).

use nalgebra::{DMatrix, DVector};

use crate::canon::{ConeConstraint, LinOp};
use crate::dcp::{
    compose_curvature, mul_sign, sum_signs, Curvature, DcpAttr, Monotonicity, PsdStatus, Sign,
};
use crate::error::{CvxError, Result};
use crate::expr::{Expr, ExprKind, IndexSpec, Shape};

use super::graph;

/// An operation applied to the arguments of an expression node.
#[derive(Debug, Clone)]
pub enum Atom {
    // Affine
    /// Elementwise sum with scalar promotion (n-ary).
    Add,
    Neg,
    /// `A * x` with a constant left factor.
    MulExpr,
    /// `x * B` with a constant right factor.
    RMulExpr,
    /// `c ⊙ x` with a constant first argument.
    MulElemwise,
    /// `x / c` with a constant scalar divisor.
    DivExpr,
    Index(IndexSpec),
    Transpose,
    Reshape(Shape),
    SumEntries,
    Trace,
    HStack,
    VStack,
    /// Vector to diagonal matrix.
    DiagVec,
    /// Diagonal of a square matrix as a column.
    DiagMat,
    /// Full 1-D convolution with a constant kernel (first argument).
    Conv,

    // Convex
    Abs,
    Pos,
    NegPart,
    MaxElemwise,
    MaxEntries,
    Norm1,
    Norm2,
    NormInf,
    Square,
    SumSquares,
    QuadOverLin,
    /// `xᵀ P x`; the definiteness of the constant `P` is fixed at construction.
    QuadForm(PsdStatus),
    Exp,
    LambdaMax,

    // Concave
    Sqrt,
    Log,
    Entropy,
    LogDet,
    MinElemwise,
    MinEntries,
    LambdaMin,
}

impl Atom {
    pub fn name(&self) -> &'static str {
        match self {
            Atom::Add => "add",
            Atom::Neg => "neg",
            Atom::MulExpr => "mul",
            Atom::RMulExpr => "rmul",
            Atom::MulElemwise => "multiply",
            Atom::DivExpr => "div",
            Atom::Index(_) => "index",
            Atom::Transpose => "transpose",
            Atom::Reshape(_) => "reshape",
            Atom::SumEntries => "sum",
            Atom::Trace => "trace",
            Atom::HStack => "hstack",
            Atom::VStack => "vstack",
            Atom::DiagVec => "diag_vec",
            Atom::DiagMat => "diag_mat",
            Atom::Conv => "conv",
            Atom::Abs => "abs",
            Atom::Pos => "pos",
            Atom::NegPart => "neg_part",
            Atom::MaxElemwise => "maximum",
            Atom::MaxEntries => "max",
            Atom::Norm1 => "norm1",
            Atom::Norm2 => "norm2",
            Atom::NormInf => "norm_inf",
            Atom::Square => "square",
            Atom::SumSquares => "sum_squares",
            Atom::QuadOverLin => "quad_over_lin",
            Atom::QuadForm(_) => "quad_form",
            Atom::Exp => "exp",
            Atom::LambdaMax => "lambda_max",
            Atom::Sqrt => "sqrt",
            Atom::Log => "log",
            Atom::Entropy => "entropy",
            Atom::LogDet => "log_det",
            Atom::MinElemwise => "minimum",
            Atom::MinEntries => "min",
            Atom::LambdaMin => "lambda_min",
        }
    }

    /// Build an expression node applying this atom to `args`.
    ///
    /// # Errors
    ///
    /// Fails on a wrong number of arguments or incompatible shapes.
    pub fn apply(self, args: Vec<Expr>) -> Result<Expr> {
        self.check_arity(args.len())?;
        let shape = self.shape_from_args(&args)?;
        let attr = DcpAttr::new(
            self.sign_from_args(&args),
            self.curvature_from_args(&args),
            shape,
        );
        Ok(Expr::from_parts(ExprKind::Atom(self), args, attr))
    }

    fn is_nary(&self) -> bool {
        matches!(
            self,
            Atom::Add | Atom::HStack | Atom::VStack | Atom::MaxElemwise | Atom::MinElemwise
        )
    }

    fn is_binary(&self) -> bool {
        matches!(
            self,
            Atom::MulExpr
                | Atom::RMulExpr
                | Atom::MulElemwise
                | Atom::DivExpr
                | Atom::Conv
                | Atom::QuadOverLin
                | Atom::QuadForm(_)
        )
    }

    fn check_arity(&self, n: usize) -> Result<()> {
        let ok = if self.is_nary() {
            n >= 1
        } else if self.is_binary() {
            n == 2
        } else {
            n == 1
        };
        if ok {
            Ok(())
        } else {
            Err(CvxError::InvalidArgument(format!(
                "{} cannot take {} argument(s)",
                self.name(),
                n
            )))
        }
    }

    /// Index of the argument that must be constant for the atom to be
    /// affine in the others.
    pub fn constant_operand(&self) -> Option<usize> {
        match self {
            Atom::MulExpr | Atom::MulElemwise | Atom::Conv => Some(0),
            Atom::RMulExpr | Atom::DivExpr | Atom::QuadForm(_) => Some(1),
            _ => None,
        }
    }

    /// Shape of the result.
    pub fn shape_from_args(&self, args: &[Expr]) -> Result<Shape> {
        let shapes: Vec<Shape> = args.iter().map(|a| a.shape()).collect();
        let s = shapes[0];
        match self {
            Atom::Add | Atom::MaxElemwise | Atom::MinElemwise => Shape::sum(&shapes),
            Atom::Neg
            | Atom::Abs
            | Atom::Pos
            | Atom::NegPart
            | Atom::Square
            | Atom::Exp
            | Atom::Sqrt
            | Atom::Log
            | Atom::Entropy => Ok(s),
            Atom::MulExpr | Atom::RMulExpr => s.mul(&shapes[1]),
            Atom::MulElemwise => s.add(&shapes[1]),
            Atom::DivExpr => {
                if shapes[1].is_scalar() {
                    Ok(s)
                } else {
                    Err(CvxError::InvalidArgument(format!(
                        "divisor must be a scalar, got {}",
                        shapes[1]
                    )))
                }
            }
            Atom::Index(spec) => {
                spec.validate(&s)?;
                Ok(spec.shape())
            }
            Atom::Transpose => Ok(s.transpose()),
            Atom::Reshape(target) => {
                if target.size() == s.size() {
                    Ok(*target)
                } else {
                    Err(CvxError::ShapeMismatch {
                        expected: format!("{} elements", s.size()),
                        got: target.to_string(),
                    })
                }
            }
            Atom::SumEntries
            | Atom::MaxEntries
            | Atom::MinEntries
            | Atom::Norm1
            | Atom::Norm2
            | Atom::NormInf
            | Atom::SumSquares => Ok(Shape::scalar()),
            Atom::Trace | Atom::LambdaMax | Atom::LambdaMin | Atom::LogDet => {
                require_square(self, s)?;
                Ok(Shape::scalar())
            }
            Atom::HStack => {
                if let Some(bad) = shapes.iter().find(|x| x.rows != s.rows) {
                    return Err(CvxError::ShapeMismatch {
                        expected: format!("{} rows", s.rows),
                        got: bad.to_string(),
                    });
                }
                Ok(Shape::matrix(s.rows, shapes.iter().map(|x| x.cols).sum()))
            }
            Atom::VStack => {
                if let Some(bad) = shapes.iter().find(|x| x.cols != s.cols) {
                    return Err(CvxError::ShapeMismatch {
                        expected: format!("{} columns", s.cols),
                        got: bad.to_string(),
                    });
                }
                Ok(Shape::matrix(shapes.iter().map(|x| x.rows).sum(), s.cols))
            }
            Atom::DiagVec => {
                if !s.is_vector() {
                    return Err(CvxError::InvalidArgument(format!(
                        "diag_vec expects a vector, got {}",
                        s
                    )));
                }
                Ok(Shape::matrix(s.size(), s.size()))
            }
            Atom::DiagMat => {
                require_square(self, s)?;
                Ok(Shape::vector(s.rows))
            }
            Atom::Conv => {
                let x = shapes[1];
                if s.cols != 1 || x.cols != 1 {
                    return Err(CvxError::InvalidArgument(format!(
                        "conv expects column vectors, got {} and {}",
                        s, x
                    )));
                }
                Ok(Shape::vector(s.rows + x.rows - 1))
            }
            Atom::QuadOverLin => {
                if !shapes[1].is_scalar() {
                    return Err(CvxError::InvalidArgument(format!(
                        "quad_over_lin expects a scalar denominator, got {}",
                        shapes[1]
                    )));
                }
                Ok(Shape::scalar())
            }
            Atom::QuadForm(_) => {
                let p = shapes[1];
                if s.cols != 1 || p != Shape::matrix(s.rows, s.rows) {
                    return Err(CvxError::ShapeMismatch {
                        expected: format!("a ({0}, {0}) matrix", s.rows),
                        got: p.to_string(),
                    });
                }
                Ok(Shape::scalar())
            }
        }
    }

    /// Sign of the result.
    pub fn sign_from_args(&self, args: &[Expr]) -> Sign {
        let first = args[0].sign();
        match self {
            Atom::Add | Atom::HStack | Atom::VStack => sum_signs(args.iter().map(|a| a.sign())),
            Atom::Neg => first.negate(),
            Atom::MulExpr | Atom::RMulExpr | Atom::MulElemwise | Atom::DivExpr | Atom::Conv => {
                mul_sign(first, args[1].sign())
            }
            Atom::Index(_)
            | Atom::Transpose
            | Atom::Reshape(_)
            | Atom::SumEntries
            | Atom::Trace
            | Atom::DiagVec
            | Atom::DiagMat
            | Atom::MaxEntries
            | Atom::MinEntries => first,
            Atom::Abs
            | Atom::Pos
            | Atom::NegPart
            | Atom::Norm1
            | Atom::Norm2
            | Atom::NormInf
            | Atom::Square
            | Atom::SumSquares
            | Atom::QuadOverLin
            | Atom::Exp
            | Atom::Sqrt => Sign::Nonnegative,
            Atom::QuadForm(status) => match status {
                PsdStatus::Psd => Sign::Nonnegative,
                PsdStatus::Nsd => Sign::Nonpositive,
                PsdStatus::Neither => Sign::Unknown,
            },
            Atom::MaxElemwise => {
                if args.iter().all(|a| a.sign().is_zero()) {
                    Sign::Zero
                } else if args.iter().any(|a| a.sign().is_nonneg()) {
                    Sign::Nonnegative
                } else if args.iter().all(|a| a.sign().is_nonpos()) {
                    Sign::Nonpositive
                } else {
                    Sign::Unknown
                }
            }
            Atom::MinElemwise => {
                if args.iter().all(|a| a.sign().is_zero()) {
                    Sign::Zero
                } else if args.iter().any(|a| a.sign().is_nonpos()) {
                    Sign::Nonpositive
                } else if args.iter().all(|a| a.sign().is_nonneg()) {
                    Sign::Nonnegative
                } else {
                    Sign::Unknown
                }
            }
            Atom::Log | Atom::Entropy | Atom::LogDet | Atom::LambdaMax | Atom::LambdaMin => {
                Sign::Unknown
            }
        }
    }

    /// Curvature of the atom as a function of its arguments.
    pub fn func_curvature(&self) -> Curvature {
        match self {
            Atom::Add
            | Atom::Neg
            | Atom::MulExpr
            | Atom::RMulExpr
            | Atom::MulElemwise
            | Atom::DivExpr
            | Atom::Index(_)
            | Atom::Transpose
            | Atom::Reshape(_)
            | Atom::SumEntries
            | Atom::Trace
            | Atom::HStack
            | Atom::VStack
            | Atom::DiagVec
            | Atom::DiagMat
            | Atom::Conv => Curvature::Affine,
            Atom::Abs
            | Atom::Pos
            | Atom::NegPart
            | Atom::MaxElemwise
            | Atom::MaxEntries
            | Atom::Norm1
            | Atom::Norm2
            | Atom::NormInf
            | Atom::Square
            | Atom::SumSquares
            | Atom::QuadOverLin
            | Atom::Exp
            | Atom::LambdaMax => Curvature::Convex,
            Atom::QuadForm(status) => match status {
                PsdStatus::Psd => Curvature::Convex,
                PsdStatus::Nsd => Curvature::Concave,
                PsdStatus::Neither => Curvature::Unknown,
            },
            Atom::Sqrt
            | Atom::Log
            | Atom::Entropy
            | Atom::LogDet
            | Atom::MinElemwise
            | Atom::MinEntries
            | Atom::LambdaMin => Curvature::Concave,
        }
    }

    /// Monotonicity in argument `i`.
    pub fn monotonicity(&self, i: usize, args: &[Expr]) -> Monotonicity {
        match self {
            Atom::Add
            | Atom::Index(_)
            | Atom::Transpose
            | Atom::Reshape(_)
            | Atom::SumEntries
            | Atom::Trace
            | Atom::HStack
            | Atom::VStack
            | Atom::DiagVec
            | Atom::DiagMat
            | Atom::Pos
            | Atom::MaxElemwise
            | Atom::MaxEntries
            | Atom::Exp
            | Atom::Sqrt
            | Atom::Log
            | Atom::MinElemwise
            | Atom::MinEntries => Monotonicity::Increasing,
            Atom::Neg | Atom::NegPart => Monotonicity::Decreasing,
            Atom::MulExpr | Atom::MulElemwise | Atom::Conv => by_sign(args[0].sign()),
            Atom::RMulExpr | Atom::DivExpr => by_sign(args[1].sign()),
            Atom::Abs
            | Atom::Norm1
            | Atom::Norm2
            | Atom::NormInf
            | Atom::Square
            | Atom::SumSquares => Monotonicity::Signed,
            Atom::QuadOverLin => {
                if i == 0 {
                    Monotonicity::Signed
                } else {
                    Monotonicity::Decreasing
                }
            }
            Atom::QuadForm(_)
            | Atom::Entropy
            | Atom::LogDet
            | Atom::LambdaMax
            | Atom::LambdaMin => Monotonicity::Nonmonotonic,
        }
    }

    /// Curvature of the result by the composition rule.
    pub fn curvature_from_args(&self, args: &[Expr]) -> Curvature {
        if let Some(i) = self.constant_operand() {
            if !args[i].is_constant() {
                return Curvature::Unknown;
            }
        }
        compose_curvature(
            self.func_curvature(),
            args.iter()
                .enumerate()
                .map(|(i, a)| (self.monotonicity(i, args), a.sign(), a.curvature())),
        )
    }

    /// Evaluate the atom on argument values; `shape` is the result shape.
    ///
    /// Values outside an atom's domain give `NaN` or an infinity.
    pub fn numeric(&self, values: &[DMatrix<f64>], shape: Shape) -> DMatrix<f64> {
        let x = &values[0];
        match self {
            Atom::Add => values
                .iter()
                .fold(DMatrix::zeros(shape.rows, shape.cols), |acc, v| {
                    acc + broadcast(v, shape)
                }),
            Atom::Neg => -x,
            Atom::MulExpr | Atom::RMulExpr => product(x, &values[1]),
            Atom::MulElemwise => broadcast(x, shape).component_mul(&broadcast(&values[1], shape)),
            Atom::DivExpr => x / values[1][(0, 0)],
            Atom::Index(spec) => {
                let parent = Shape::matrix(x.nrows(), x.ncols());
                let data = x.as_slice();
                let picked: Vec<f64> = spec
                    .linear_indices(&parent)
                    .into_iter()
                    .map(|k| data[k])
                    .collect();
                DMatrix::from_vec(shape.rows, shape.cols, picked)
            }
            Atom::Transpose => x.transpose(),
            Atom::Reshape(s) => DMatrix::from_column_slice(s.rows, s.cols, x.as_slice()),
            Atom::SumEntries => scalar(x.sum()),
            Atom::Trace => scalar(x.trace()),
            Atom::HStack => {
                let data: Vec<f64> = values
                    .iter()
                    .flat_map(|v| v.as_slice().iter().copied())
                    .collect();
                DMatrix::from_vec(shape.rows, shape.cols, data)
            }
            Atom::VStack => {
                let mut out = DMatrix::zeros(shape.rows, shape.cols);
                let mut row = 0;
                for v in values {
                    out.view_mut((row, 0), (v.nrows(), v.ncols())).copy_from(v);
                    row += v.nrows();
                }
                out
            }
            Atom::DiagVec => DMatrix::from_diagonal(&DVector::from_column_slice(x.as_slice())),
            Atom::DiagMat => DMatrix::from_column_slice(shape.rows, 1, x.diagonal().as_slice()),
            Atom::Conv => {
                let (k, v) = (x.as_slice(), values[1].as_slice());
                let mut out = vec![0.0; shape.rows];
                for (i, ki) in k.iter().enumerate() {
                    for (j, vj) in v.iter().enumerate() {
                        out[i + j] += ki * vj;
                    }
                }
                DMatrix::from_vec(shape.rows, 1, out)
            }
            Atom::Abs => x.abs(),
            Atom::Pos => x.map(|v| v.max(0.0)),
            Atom::NegPart => x.map(|v| (-v).max(0.0)),
            Atom::MaxElemwise => fold_elemwise(values, shape, f64::max),
            Atom::MinElemwise => fold_elemwise(values, shape, f64::min),
            Atom::MaxEntries => scalar(x.max()),
            Atom::MinEntries => scalar(x.min()),
            Atom::Norm1 => scalar(x.iter().map(|v| v.abs()).sum()),
            Atom::Norm2 => scalar(x.norm()),
            Atom::NormInf => scalar(x.amax()),
            Atom::Square => x.map(|v| v * v),
            Atom::SumSquares => scalar(x.norm_squared()),
            Atom::QuadOverLin => scalar(x.norm_squared() / values[1][(0, 0)]),
            Atom::QuadForm(_) => scalar((x.transpose() * &values[1] * x)[(0, 0)]),
            Atom::Exp => x.map(f64::exp),
            Atom::Sqrt => x.map(f64::sqrt),
            Atom::Log => x.map(f64::ln),
            Atom::Entropy => x.map(|v| {
                if v > 0.0 {
                    -v * v.ln()
                } else if v == 0.0 {
                    0.0
                } else {
                    f64::NEG_INFINITY
                }
            }),
            Atom::LambdaMax => scalar(symmetric_part(x).symmetric_eigenvalues().max()),
            Atom::LambdaMin => scalar(symmetric_part(x).symmetric_eigenvalues().min()),
            Atom::LogDet => match symmetric_part(x).cholesky() {
                Some(chol) => scalar(2.0 * chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>()),
                None => scalar(f64::NEG_INFINITY),
            },
        }
    }

    /// Lower the atom given the canonical operators of its arguments.
    ///
    /// Returns an affine operator standing for the atom's value and the
    /// constraints tying it to the arguments. Auxiliary variables are fresh.
    ///
    /// # Errors
    ///
    /// Returns `NotDcp` when an operand that must be constant is not, and
    /// propagates shape errors from the builders.
    pub fn graph_implementation(
        &self,
        ops: &[LinOp],
        shape: Shape,
        args: &[Expr],
    ) -> Result<(LinOp, Vec<ConeConstraint>)> {
        if let Some(i) = self.constant_operand() {
            if !args[i].is_constant() {
                return Err(CvxError::NotDcp(format!(
                    "{} needs a constant operand, got {}",
                    self.name(),
                    args[i]
                )));
            }
        }
        graph::lower(self, ops, shape, args)
    }
}

fn require_square(atom: &Atom, s: Shape) -> Result<()> {
    if s.is_square() {
        Ok(())
    } else {
        Err(CvxError::InvalidArgument(format!(
            "{} expects a square matrix, got {}",
            atom.name(),
            s
        )))
    }
}

fn by_sign(sign: Sign) -> Monotonicity {
    if sign.is_nonneg() {
        Monotonicity::Increasing
    } else if sign.is_nonpos() {
        Monotonicity::Decreasing
    } else {
        Monotonicity::Nonmonotonic
    }
}

fn scalar(v: f64) -> DMatrix<f64> {
    DMatrix::from_element(1, 1, v)
}

fn broadcast(m: &DMatrix<f64>, shape: Shape) -> DMatrix<f64> {
    if m.nrows() == 1 && m.ncols() == 1 && !shape.is_scalar() {
        DMatrix::from_element(shape.rows, shape.cols, m[(0, 0)])
    } else {
        m.clone()
    }
}

fn product(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    if a.nrows() == 1 && a.ncols() == 1 {
        b * a[(0, 0)]
    } else if b.nrows() == 1 && b.ncols() == 1 {
        a * b[(0, 0)]
    } else {
        a * b
    }
}

fn fold_elemwise(values: &[DMatrix<f64>], shape: Shape, f: fn(f64, f64) -> f64) -> DMatrix<f64> {
    let mut acc = broadcast(&values[0], shape);
    for v in &values[1..] {
        acc = acc.zip_map(&broadcast(v, shape), f);
    }
    acc
}

fn symmetric_part(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}
