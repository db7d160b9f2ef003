/// BLS12-381 instantiation backed by `paired`
#[cfg(feature = "bls12_381")]
pub mod bls12381;
