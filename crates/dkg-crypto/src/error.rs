use crate::poly::{Idx, PolyError};
use thiserror::Error;

/// Result type alias which returns `CryptoError`
pub type CryptoResult<A> = Result<A, CryptoError>;

/// Errors raised by the primitives. None of them is transient: each one means
/// the inputs are corrupted, so retrying with the same inputs cannot succeed.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A secret scalar was the zero element of the field
    #[error("scalar cannot be zero")]
    ZeroScalar,

    /// A public point was the identity element of its group
    #[error("point cannot be the identity element")]
    IdentityPoint,

    /// Two inputs which must agree on length did not
    #[error("{what}: expected length {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// The index is not part of the participant set
    #[error("invalid participant index {0}")]
    InvalidIndex(Idx),

    /// The ciphertext could not be opened with the derived key
    #[error("share decryption failed")]
    Decryption,

    /// The key derivation could not produce enough output
    #[error("key derivation failed")]
    KeyDerivation,

    /// BincodeError is raised when de(serialization) by bincode fails
    #[error("de(serialization) failed: {0}")]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Poly(#[from] PolyError),
}
