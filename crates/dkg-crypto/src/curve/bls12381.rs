use crate::group::{Element, PairingCurve as Pairing, Point, Scalar as ScalarField, Subgroup};
use ff::{Field, PrimeField};
use groupy::CurveProjective;
use paired::bls12_381::{Bls12, Fr, FrRepr, G1 as PG1, G2 as PG2};
use paired::Engine;
use rand_core::RngCore;

pub type Scalar = Fr;
pub type G1 = PG1;
pub type G2 = PG2;

pub type G1Curve = Subgroup<Scalar, G1>;
pub type G2Curve = Subgroup<Scalar, G2>;

impl Element for Scalar {
    type RHS = Fr;

    fn zero() -> Self {
        Field::zero()
    }

    fn one() -> Self {
        Field::one()
    }

    fn add(&mut self, other: &Self) {
        self.add_assign(other);
    }

    fn mul(&mut self, by: &Fr) {
        self.mul_assign(by)
    }

    fn rand<R: RngCore>(rng: &mut R) -> Self {
        Fr::random(rng)
    }

    fn is_zero(&self) -> bool {
        Field::is_zero(self)
    }
}

impl ScalarField for Scalar {
    fn from_int(i: u64) -> Self {
        // a u64 is always below the modulus
        Fr::from_repr(FrRepr::from(i)).unwrap_or_else(|_| Field::zero())
    }

    fn inverse(&self) -> Option<Self> {
        Field::inverse(self)
    }

    fn negate(&mut self) {
        Field::negate(self);
    }

    fn sub(&mut self, other: &Self) {
        self.sub_assign(other);
    }
}

macro_rules! subgroup_point {
    ($point:ty) => {
        impl Element for $point {
            type RHS = Scalar;

            fn zero() -> Self {
                CurveProjective::zero()
            }

            fn one() -> Self {
                CurveProjective::one()
            }

            fn add(&mut self, other: &Self) {
                self.add_assign(other);
            }

            fn mul(&mut self, by: &Scalar) {
                self.mul_assign(FrRepr::from(*by))
            }

            fn rand<R: RngCore>(rng: &mut R) -> Self {
                <$point as CurveProjective>::random(rng)
            }

            fn is_zero(&self) -> bool {
                CurveProjective::is_zero(self)
            }
        }

        impl Point for $point {
            fn hash_to_curve(data: &[u8]) -> Self {
                <$point>::hash(data)
            }
        }
    };
}

subgroup_point!(G1);
subgroup_point!(G2);

#[derive(Clone, Debug)]
pub struct PairingCurve;

impl Pairing for PairingCurve {
    type Scalar = Scalar;
    type G1 = G1;
    type G2 = G2;

    fn pairing_check(a1: &G1, b1: &G2, a2: &G1, b2: &G2) -> bool {
        Bls12::pairing(a1.into_affine(), b1.into_affine())
            == Bls12::pairing(a2.into_affine(), b2.into_affine())
    }
}
