//! Algebraic traits the protocol is written against.
//!
//! Everything uses the additive notation: points are "multiplied" by scalars.
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::marker::PhantomData;

/// A member of an additive group which can be scaled by `RHS`. Scalars scale
/// by themselves, points by the scalars of their prime-order subgroup.
pub trait Element:
    Clone + Debug + Eq + Serialize + for<'a> Deserialize<'a> + Send + Sync
{
    type RHS;

    /// The additive identity. For points this is the point at infinity, which
    /// the protocol reads as "nothing published".
    fn zero() -> Self;

    fn one() -> Self;

    fn add(&mut self, other: &Self);

    fn mul(&mut self, by: &Self::RHS);

    fn rand<R: RngCore>(rng: &mut R) -> Self;

    fn is_zero(&self) -> bool {
        self == &Self::zero()
    }
}

/// A prime field element
pub trait Scalar: Element {
    /// The field element for the integer `i`
    fn from_int(i: u64) -> Self;

    fn inverse(&self) -> Option<Self>;

    fn negate(&mut self);

    fn sub(&mut self, other: &Self);
}

/// A point which can also be derived from arbitrary bytes
pub trait Point: Element {
    /// Hashes `data` to a point with unknown discrete log
    fn hash_to_curve(data: &[u8]) -> Self;
}

/// A group with a fixed generator
pub trait Curve: Clone + Debug + Send + Sync {
    type Scalar: Scalar<RHS = Self::Scalar>;

    type Point: Point<RHS = Self::Scalar>;

    fn generator() -> Self::Point {
        Self::Point::one()
    }

    /// `s * G`
    fn commit(s: &Self::Scalar) -> Self::Point {
        let mut p = Self::generator();
        p.mul(s);
        p
    }
}

/// Two groups sharing a scalar field, related by a bilinear map
pub trait PairingCurve {
    type Scalar: Scalar<RHS = Self::Scalar>;

    type G1: Point<RHS = Self::Scalar>;

    type G2: Point<RHS = Self::Scalar>;

    /// Whether `e(a1, b1) == e(a2, b2)`
    fn pairing_check(a1: &Self::G1, b1: &Self::G2, a2: &Self::G1, b2: &Self::G2) -> bool;
}

/// Binds a scalar field to one of the groups it acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgroup<S, P> {
    s: PhantomData<S>,
    p: PhantomData<P>,
}

impl<S, P> Curve for Subgroup<S, P>
where
    S: Scalar<RHS = S>,
    P: Point<RHS = S>,
{
    type Scalar = S;
    type Point = P;
}
