use crate::{
    group::{Element, Scalar},
    poly::{Eval, Idx, PolyError},
};
use std::collections::BTreeSet;

/// Precomputed modular inverses of `1..n-1`.
///
/// With base-1 indices bounded by `n`, every distance `x_j - x_i` between two
/// distinct indices lies in `±[1, n-1]`, so Lagrange coefficients can be built
/// from table lookups instead of one field inversion per pair.
#[derive(Debug, Clone)]
pub struct InverseTable<S> {
    inverses: Vec<S>,
}

impl<S: Scalar<RHS = S>> InverseTable<S> {
    /// Builds the table for a committee of `n` participants
    pub fn new(n: usize) -> Result<Self, PolyError> {
        let inverses = (1..n.max(1) as u64)
            .map(|i| S::from_int(i).inverse().ok_or(PolyError::NoInverse))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { inverses })
    }

    /// Number of entries, i.e. `n - 1`
    pub fn len(&self) -> usize {
        self.inverses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inverses.is_empty()
    }

    /// Returns `1 / (to - from)` using the table
    fn inverse_of_distance(&self, from: Idx, to: Idx) -> Result<S, PolyError> {
        let distance = (to as i64 - from as i64).unsigned_abs();
        let inv = distance
            .checked_sub(1)
            .and_then(|pos| self.inverses.get(pos as usize))
            .ok_or(PolyError::OutOfTable(distance, self.inverses.len()))?;

        let mut inv = inv.clone();
        if to < from {
            inv.negate();
        }
        Ok(inv)
    }

    /// Interpolates the given evaluations at `x = 0`.
    ///
    /// `λ_i = Π_{j≠i} x_j / (x_j - x_i)`, and the result is `Σ λ_i · y_i`. The
    /// evaluations may live in any group whose scalar field is `S`.
    pub fn interpolate_at_zero<E>(&self, t: usize, evals: &[Eval<E>]) -> Result<E, PolyError>
    where
        E: Element<RHS = S>,
    {
        if evals.len() < t {
            return Err(PolyError::InvalidRecovery(evals.len(), t));
        }

        let mut seen = BTreeSet::new();
        for eval in evals {
            if eval.index == 0 {
                return Err(PolyError::ZeroIndex);
            }
            if !seen.insert(eval.index) {
                return Err(PolyError::DuplicateIndex(eval.index));
            }
        }

        let points = &evals[..t];
        let mut acc = E::zero();
        for point in points {
            let mut lambda = S::one();
            for other in points.iter().filter(|o| o.index != point.index) {
                lambda.mul(&S::from_int(other.index.into()));
                lambda.mul(&self.inverse_of_distance(point.index, other.index)?);
            }

            let mut term = point.value.clone();
            term.mul(&lambda);
            acc.add(&term);
        }

        Ok(acc)
    }
}
