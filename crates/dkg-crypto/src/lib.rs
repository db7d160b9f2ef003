//! # DKG Cryptography
//!
//! Primitives used by the distributed key generation ceremony: polynomials for
//! Shamir secret sharing with Feldman commitments, Lagrange interpolation with a
//! precomputed inverse table, pairwise share encryption and Chaum-Pedersen
//! proofs of discrete logarithm equality.
//!
//! ```rust
//! use dkg_crypto::{
//!     curve::bls12381::{Scalar, G1Curve},
//!     lagrange::InverseTable,
//!     poly::Poly,
//! };
//!
//! let (n, t) = (5u32, 3usize);
//! let private = Poly::<Scalar>::random(t - 1, &mut rand::thread_rng());
//! let shares = (1..=n)
//!     .map(|i| private.eval(i).unwrap())
//!     .collect::<Vec<_>>();
//!
//! let table = InverseTable::<Scalar>::new(n as usize).unwrap();
//! let secret = table.interpolate_at_zero(t, &shares).unwrap();
//! assert_eq!(&secret, private.free_coefficient().unwrap());
//! ```

/// Curve implementations for the traits defined in the [`group`](group/index.html) module.
pub mod curve;

/// Definitions of generic traits with scalars of prime fields and points on elliptic curves.
pub mod group;

/// Implementation of a polynomial suitable to be used for secret sharing schemes and DKG
/// protocols.
pub mod poly;

/// Lagrange interpolation at zero
pub mod lagrange;

/// Pairwise authenticated share encryption
pub mod encryption;

pub mod dleq;

mod error;
pub use error::{CryptoError, CryptoResult};
