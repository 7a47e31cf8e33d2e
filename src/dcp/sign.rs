//! Sign tracking for DCP (Disciplined Convex Programming).
//!
//! Signs are a four-point lattice. `Zero` is both non-negative and
//! non-positive; `Unknown` carries no information. Sign information feeds
//! the `Signed` monotonicity case of the composition rule.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Sign of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    /// Expression is always >= 0.
    Nonnegative,
    /// Expression is always <= 0.
    Nonpositive,
    /// Expression is always == 0.
    Zero,
    /// Sign is unknown.
    Unknown,
}

impl Sign {
    /// Check if the sign is non-negative (>= 0).
    pub fn is_nonneg(self) -> bool {
        matches!(self, Sign::Nonnegative | Sign::Zero)
    }

    /// Check if the sign is non-positive (<= 0).
    pub fn is_nonpos(self) -> bool {
        matches!(self, Sign::Nonpositive | Sign::Zero)
    }

    /// Check if the sign is zero.
    pub fn is_zero(self) -> bool {
        matches!(self, Sign::Zero)
    }

    /// Check if the sign is unknown.
    pub fn is_unknown(self) -> bool {
        matches!(self, Sign::Unknown)
    }

    /// Negate the sign.
    pub fn negate(self) -> Self {
        match self {
            Sign::Nonnegative => Sign::Nonpositive,
            Sign::Nonpositive => Sign::Nonnegative,
            Sign::Zero => Sign::Zero,
            Sign::Unknown => Sign::Unknown,
        }
    }

    /// Sign of a collection of numbers, as tight as the values allow.
    pub fn of_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut all_nonneg = true;
        let mut all_nonpos = true;
        for v in values {
            if v < 0.0 || v.is_nan() {
                all_nonneg = false;
            }
            if v > 0.0 || v.is_nan() {
                all_nonpos = false;
            }
            if !all_nonneg && !all_nonpos {
                return Sign::Unknown;
            }
        }
        match (all_nonneg, all_nonpos) {
            (true, true) => Sign::Zero,
            (true, false) => Sign::Nonnegative,
            (false, true) => Sign::Nonpositive,
            (false, false) => Sign::Unknown,
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sign::Nonnegative => "nonnegative",
            Sign::Nonpositive => "nonpositive",
            Sign::Zero => "zero",
            Sign::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Combine signs for addition: a + b.
pub fn add_sign(a: Sign, b: Sign) -> Sign {
    use Sign::*;
    match (a, b) {
        // Zero doesn't change sign
        (Zero, x) | (x, Zero) => x,
        // Same signs combine
        (Nonnegative, Nonnegative) => Nonnegative,
        (Nonpositive, Nonpositive) => Nonpositive,
        // Different signs -> unknown
        (Nonnegative, Nonpositive) | (Nonpositive, Nonnegative) => Unknown,
        // Unknown propagates
        (Unknown, _) | (_, Unknown) => Unknown,
    }
}

/// Combine signs for multiplication: a * b.
pub fn mul_sign(a: Sign, b: Sign) -> Sign {
    use Sign::*;
    match (a, b) {
        // Zero times anything is zero, even an unknown
        (Zero, _) | (_, Zero) => Zero,
        (Nonnegative, Nonnegative) | (Nonpositive, Nonpositive) => Nonnegative,
        (Nonnegative, Nonpositive) | (Nonpositive, Nonnegative) => Nonpositive,
        (Unknown, _) | (_, Unknown) => Unknown,
    }
}

impl Add for Sign {
    type Output = Sign;

    fn add(self, rhs: Sign) -> Sign {
        add_sign(self, rhs)
    }
}

impl Sub for Sign {
    type Output = Sign;

    fn sub(self, rhs: Sign) -> Sign {
        add_sign(self, rhs.negate())
    }
}

impl Mul for Sign {
    type Output = Sign;

    fn mul(self, rhs: Sign) -> Sign {
        mul_sign(self, rhs)
    }
}

impl Neg for Sign {
    type Output = Sign;

    fn neg(self) -> Sign {
        self.negate()
    }
}

/// Sign of a sum of several terms. An empty sum is zero.
pub fn sum_signs<I>(signs: I) -> Sign
where
    I: IntoIterator<Item = Sign>,
{
    signs.into_iter().fold(Sign::Zero, add_sign)
}
