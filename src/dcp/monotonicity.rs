//! Monotonicity and the DCP composition rule.

use super::curvature::{sum_curvatures, Curvature};
use super::sign::Sign;

/// Monotonicity of an atom in one of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Monotonicity {
    /// Nondecreasing in the argument.
    Increasing,
    /// Nonincreasing in the argument.
    Decreasing,
    /// Increasing for nonnegative arguments, decreasing for nonpositive ones
    /// (e.g. `abs`, `square`).
    Signed,
    /// No monotonicity information.
    Nonmonotonic,
}

/// Curvature contribution of a single argument.
///
/// `func` is the curvature of the atom as a function of its arguments,
/// `arg_sign`/`arg_curvature` describe the argument expression.
pub fn dcp_curvature(
    monotonicity: Monotonicity,
    func: Curvature,
    arg_sign: Sign,
    arg_curvature: Curvature,
) -> Curvature {
    if arg_curvature.is_constant() {
        return Curvature::Constant;
    }
    if arg_curvature.is_affine() {
        return func;
    }
    match monotonicity {
        Monotonicity::Increasing => func + arg_curvature,
        Monotonicity::Decreasing => func - arg_curvature,
        Monotonicity::Signed => {
            let convex_nonneg = arg_curvature.is_convex() && arg_sign.is_nonneg();
            let concave_nonpos = arg_curvature.is_concave() && arg_sign.is_nonpos();
            if convex_nonneg || concave_nonpos {
                func
            } else {
                Curvature::Unknown
            }
        }
        Monotonicity::Nonmonotonic => Curvature::Unknown,
    }
}

/// Curvature of an atom applied to several arguments: the sum of the
/// per-argument contributions.
pub fn compose_curvature<I>(func: Curvature, args: I) -> Curvature
where
    I: IntoIterator<Item = (Monotonicity, Sign, Curvature)>,
{
    sum_curvatures(
        args.into_iter()
            .map(|(mono, sign, curv)| dcp_curvature(mono, func, sign, curv)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use Curvature::*;
    use Monotonicity::*;

    #[test]
    fn test_constant_and_affine_args() {
        assert_eq!(dcp_curvature(Nonmonotonic, Convex, Sign::Unknown, Constant), Constant);
        assert_eq!(dcp_curvature(Nonmonotonic, Convex, Sign::Unknown, Affine), Convex);
        assert_eq!(dcp_curvature(Decreasing, Concave, Sign::Unknown, Affine), Concave);
    }

    #[test]
    fn test_monotone_composition() {
        // convex increasing of convex is convex
        assert_eq!(dcp_curvature(Increasing, Convex, Sign::Unknown, Convex), Convex);
        // convex increasing of concave is unknown
        assert_eq!(dcp_curvature(Increasing, Convex, Sign::Unknown, Concave), Unknown);
        // convex decreasing of concave is convex
        assert_eq!(dcp_curvature(Decreasing, Convex, Sign::Unknown, Concave), Convex);
        // concave increasing of concave is concave
        assert_eq!(dcp_curvature(Increasing, Concave, Sign::Unknown, Concave), Concave);
    }

    #[test]
    fn test_signed_composition() {
        assert_eq!(dcp_curvature(Signed, Convex, Sign::Nonnegative, Convex), Convex);
        assert_eq!(dcp_curvature(Signed, Convex, Sign::Nonpositive, Concave), Convex);
        assert_eq!(dcp_curvature(Signed, Convex, Sign::Unknown, Convex), Unknown);
        assert_eq!(dcp_curvature(Signed, Convex, Sign::Nonnegative, Concave), Unknown);
    }

    #[test]
    fn test_nonmonotonic_composition() {
        assert_eq!(dcp_curvature(Nonmonotonic, Convex, Sign::Nonnegative, Convex), Unknown);
    }

    #[test]
    fn test_compose_sums_contributions() {
        let c = compose_curvature(
            Convex,
            [
                (Increasing, Sign::Unknown, Convex),
                (Increasing, Sign::Unknown, Affine),
            ],
        );
        assert_eq!(c, Convex);

        let c = compose_curvature(
            Convex,
            [
                (Increasing, Sign::Unknown, Convex),
                (Increasing, Sign::Unknown, Concave),
            ],
        );
        assert_eq!(c, Unknown);
        assert_eq!(compose_curvature(Convex, []), Constant);
    }
}
