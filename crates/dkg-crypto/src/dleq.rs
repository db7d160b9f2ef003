//! Chaum-Pedersen proofs of discrete logarithm equality.
//!
//! A proof for bases `(g1, g2)` and targets `(h1, h2)` convinces a verifier that
//! `h1 = x * g1` and `h2 = x * g2` for the same secret `x`, without revealing `x`.
//! The challenge is computed with Fiat-Shamir over SHA-256.
use crate::{
    error::CryptoResult,
    group::{Curve, Element, Scalar},
};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const DOMAIN: &[u8] = b"dkg-dleq-v1";

/// A non-interactive DLEQ proof: the challenge and the response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: Serialize + serde::de::DeserializeOwned")]
pub struct DleqProof<C: Curve> {
    pub challenge: C::Scalar,
    pub response: C::Scalar,
}

impl<C: Curve> DleqProof<C> {
    /// Proves that `secret` is the discrete log of `h1` to base `g1` and of `h2`
    /// to base `g2`, where `h1 = secret * g1` and `h2 = secret * g2`
    pub fn prove<R: RngCore>(
        rng: &mut R,
        secret: &C::Scalar,
        g1: &C::Point,
        h1: &C::Point,
        g2: &C::Point,
        h2: &C::Point,
    ) -> CryptoResult<Self> {
        let w = C::Scalar::rand(rng);

        let mut a1 = g1.clone();
        a1.mul(&w);
        let mut a2 = g2.clone();
        a2.mul(&w);

        let challenge = challenge::<C>(&[g1, h1, g2, h2, &a1, &a2])?;

        // r = w - c * x
        let mut cx = challenge.clone();
        cx.mul(secret);
        let mut response = w;
        response.sub(&cx);

        Ok(Self {
            challenge,
            response,
        })
    }

    /// Returns true if the proof is valid for the given bases and targets
    pub fn verify(
        &self,
        g1: &C::Point,
        h1: &C::Point,
        g2: &C::Point,
        h2: &C::Point,
    ) -> CryptoResult<bool> {
        // a = r * g + c * h
        let recompute = |g: &C::Point, h: &C::Point| {
            let mut rg = g.clone();
            rg.mul(&self.response);
            let mut ch = h.clone();
            ch.mul(&self.challenge);
            rg.add(&ch);
            rg
        };
        let a1 = recompute(g1, h1);
        let a2 = recompute(g2, h2);

        let expected = challenge::<C>(&[g1, h1, g2, h2, &a1, &a2])?;
        Ok(expected == self.challenge)
    }
}

fn challenge<C: Curve>(points: &[&C::Point]) -> CryptoResult<C::Scalar> {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    for p in points {
        hasher.update(bincode::serialize(p)?);
    }
    Ok(hash_to_scalar::<C::Scalar>(&hasher.finalize()))
}

/// Reduces a byte string into the scalar field, reading it as a big-endian
/// integer.
pub fn hash_to_scalar<S: Scalar<RHS = S>>(bytes: &[u8]) -> S {
    let base = S::from_int(256);
    bytes.iter().fold(S::zero(), |mut acc, b| {
        acc.mul(&base);
        acc.add(&S::from_int(u64::from(*b)));
        acc
    })
}
