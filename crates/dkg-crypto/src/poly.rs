use crate::group::{Element, Point, Scalar};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use thiserror::Error;

/// Participant index. Indices are base-1: evaluating a polynomial at 0 would
/// reveal its free coefficient, i.e. the secret.
pub type Idx = u32;

/// The value of a polynomial at a participant's index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eval<A> {
    pub value: A,
    pub index: Idx,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolyError {
    #[error("not enough evaluations: got {0}, need {1}")]
    InvalidRecovery(usize, usize),
    #[error("scalar has no inverse")]
    NoInverse,
    #[error("index 0 is reserved for the secret")]
    ZeroIndex,
    #[error("duplicate index {0}")]
    DuplicateIndex(Idx),
    #[error("index distance {0} is outside the inverse table (size {1})")]
    OutOfTable(u64, usize),
    #[error("polynomial has no coefficients")]
    Empty,
}

/// A polynomial whose coefficients are either scalars (a dealer's secret) or
/// points (the Feldman commitments to it). Coefficients are stored free
/// coefficient first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poly<C>(Vec<C>);

impl<C> Poly<C> {
    /// A polynomial with `n` coefficients has degree `n - 1`
    pub fn degree(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn coefficients(&self) -> &[C] {
        &self.0
    }

    /// The free coefficient: the secret of a private polynomial, or the
    /// public key of a committed one
    pub fn free_coefficient(&self) -> Result<&C, PolyError> {
        self.0.first().ok_or(PolyError::Empty)
    }
}

impl<C: Element> Poly<C> {
    /// Samples a polynomial of degree `degree`. Any `degree + 1` evaluations
    /// determine it, so in secret sharing the degree is the threshold.
    pub fn random<R: RngCore>(degree: usize, rng: &mut R) -> Self {
        Self((0..=degree).map(|_| C::rand(rng)).collect())
    }

    pub fn zero() -> Self {
        Self(vec![C::zero()])
    }
}

impl<C> Poly<C>
where
    C: Element,
    C::RHS: Scalar<RHS = C::RHS>,
{
    /// Evaluates at `x = index` with Horner's rule. On commitments this is the
    /// evaluation in the exponent which checks a share against its dealer.
    pub fn eval(&self, index: Idx) -> Result<Eval<C>, PolyError> {
        if index == 0 {
            return Err(PolyError::ZeroIndex);
        }
        if self.0.is_empty() {
            return Err(PolyError::Empty);
        }

        let x = C::RHS::from_int(index.into());
        let mut value = C::zero();
        for coeff in self.0.iter().rev() {
            value.mul(&x);
            value.add(coeff);
        }
        Ok(Eval { value, index })
    }
}

impl<S: Scalar<RHS = S>> Poly<S> {
    /// The Feldman commitment `(c_0·G, ..., c_t·G)` in the group of `P`
    pub fn commit<P: Point<RHS = S>>(&self) -> Poly<P> {
        Poly(
            self.0
                .iter()
                .map(|coeff| {
                    let mut point = P::one();
                    point.mul(coeff);
                    point
                })
                .collect(),
        )
    }
}

/// Coefficient-wise sum; the shorter polynomial is padded with zeros
impl<C: Element> AddAssign<&Poly<C>> for Poly<C> {
    fn add_assign(&mut self, other: &Poly<C>) {
        if self.0.len() < other.0.len() {
            self.0.resize(other.0.len(), C::zero());
        }
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            a.add(b);
        }
    }
}

impl<C: Element> From<Vec<C>> for Poly<C> {
    fn from(coefficients: Vec<C>) -> Self {
        Self(coefficients)
    }
}

impl<C: Element> From<Poly<C>> for Vec<C> {
    fn from(poly: Poly<C>) -> Self {
        poly.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::bls12381::{Scalar as Sc, G1};
    use proptest::prelude::*;
    use rand::thread_rng;

    fn random(degree: usize) -> Poly<Sc> {
        Poly::random(degree, &mut thread_rng())
    }

    #[test]
    fn degree_counts_coefficients() {
        let p = random(5);
        assert_eq!(p.len(), 6);
        assert_eq!(p.degree(), 5);
        assert_eq!(Poly::<Sc>::from(vec![]).degree(), 0);
    }

    #[test]
    fn zero_is_neutral() {
        let p = random(3);
        let mut sum = Poly::<Sc>::zero();
        sum += &p;
        assert_eq!(sum, p);

        let mut same = p.clone();
        same += &Poly::zero();
        assert_eq!(same, p);
    }

    #[test]
    fn eval_rejects_secret_index() {
        assert_eq!(random(2).eval(0).unwrap_err(), PolyError::ZeroIndex);
        assert_eq!(Poly::<Sc>::from(vec![]).eval(1).unwrap_err(), PolyError::Empty);
        assert_eq!(
            Poly::<Sc>::from(vec![]).free_coefficient().unwrap_err(),
            PolyError::Empty
        );
    }

    #[test]
    fn committed_evaluation_matches_share() {
        let secret = random(3);
        let public = secret.commit::<G1>();
        assert_eq!(public.len(), secret.len());

        for i in 1..6 {
            let share = secret.eval(i).unwrap().value;
            let mut expected = G1::one();
            expected.mul(&share);
            assert_eq!(public.eval(i).unwrap().value, expected);
        }
    }

    proptest! {
        #[test]
        fn sum_of_evaluations(deg1 in 0..20usize, deg2 in 0..20usize, idx in 1..50u32) {
            let (p1, p2) = (random(deg1), random(deg2));
            let mut sum = p1.clone();
            sum += &p2;
            prop_assert_eq!(sum.degree(), deg1.max(deg2));

            let mut expected = p1.eval(idx).unwrap().value;
            expected.add(&p2.eval(idx).unwrap().value);
            prop_assert_eq!(sum.eval(idx).unwrap().value, expected);
        }

        #[test]
        fn horner_matches_power_sum(degree in 0..20usize, idx in 1..100u32) {
            let p = random(degree);
            let x = Sc::from_int(idx.into());

            let mut power = Sc::one();
            let mut naive = Sc::zero();
            for coeff in p.coefficients() {
                let mut term = *coeff;
                term.mul(&power);
                naive.add(&term);
                power.mul(&x);
            }
            prop_assert_eq!(p.eval(idx).unwrap().value, naive);
        }
    }
}
