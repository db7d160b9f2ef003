//! # Share encryption
//!
//! Shares are encrypted under a static Diffie-Hellman key between the dealer's
//! and the recipient's transport keys. Unlike an ephemeral ECIES, the shared
//! point `k = sk_dealer * pk_recipient = sk_recipient * pk_dealer` can later be
//! revealed together with a DLEQ proof (see [`crate::dleq`]), which lets a third
//! party open exactly one share when adjudicating a dispute.
//!
//! The symmetric part derives a ChaCha20-Poly1305 key and nonce from `k` and the
//! two indices with HKDF-SHA256, so every (dealer, recipient) pair gets its own
//! key and a tampered ciphertext is rejected instead of decrypting to garbage.
use crate::{
    error::{CryptoError, CryptoResult},
    group::{Curve, Element},
    poly::Idx,
};
use serde::{Deserialize, Serialize};

// crypto imports
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;

/// The nonce length
const NONCE_LEN: usize = 12;

/// The symmetric key length
const KEY_LEN: usize = 32;

/// A domain separator
const DOMAIN: &[u8] = b"dkg-share-encryption-v1";

/// An encrypted share addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptedShare(Vec<u8>);

impl EncryptedShare {
    /// Returns the raw ciphertext bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for EncryptedShare {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Computes the Diffie-Hellman point `private * public`
pub fn shared_key<C: Curve>(private: &C::Scalar, public: &C::Point) -> CryptoResult<C::Point> {
    if private.is_zero() {
        return Err(CryptoError::ZeroScalar);
    }
    if public.is_zero() {
        return Err(CryptoError::IdentityPoint);
    }

    let mut dh = public.clone();
    dh.mul(private);
    Ok(dh)
}

/// Encrypts the share destined to `recipient` under the pair's shared key
pub fn encrypt_share<C: Curve>(
    shared_key: &C::Point,
    dealer: Idx,
    recipient: Idx,
    share: &C::Scalar,
) -> CryptoResult<EncryptedShare> {
    let (cipher, nonce) = derive::<C>(shared_key, dealer, recipient)?;
    let plaintext = bincode::serialize(share)?;

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_slice())
        .map_err(|_| CryptoError::Decryption)?;

    Ok(EncryptedShare(ciphertext))
}

/// Decrypts a share with the pair's shared key. Fails with
/// `CryptoError::Decryption` if the ciphertext was not produced under that key.
pub fn decrypt_share<C: Curve>(
    shared_key: &C::Point,
    dealer: Idx,
    recipient: Idx,
    share: &EncryptedShare,
) -> CryptoResult<C::Scalar> {
    let (cipher, nonce) = derive::<C>(shared_key, dealer, recipient)?;

    let plaintext = cipher
        .decrypt(&nonce, share.0.as_slice())
        .map_err(|_| CryptoError::Decryption)?;

    Ok(bincode::deserialize(&plaintext)?)
}

/// Derives the AEAD instance and nonce for one (dealer, recipient) pair
fn derive<C: Curve>(
    dh: &C::Point,
    dealer: Idx,
    recipient: Idx,
) -> CryptoResult<(ChaCha20Poly1305, Nonce)> {
    if dh.is_zero() {
        return Err(CryptoError::IdentityPoint);
    }
    let serialized = bincode::serialize(dh)?;

    let mut info = DOMAIN.to_vec();
    info.extend_from_slice(&dealer.to_be_bytes());
    info.extend_from_slice(&recipient.to_be_bytes());

    // the info binds the key to the (dealer, recipient) pair
    let h = Hkdf::<Sha256>::new(None, &serialized);
    let mut okm = [0u8; KEY_LEN + NONCE_LEN];
    h.expand(&info, &mut okm)
        .map_err(|_| CryptoError::KeyDerivation)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&okm[..KEY_LEN]));
    let nonce = *Nonce::from_slice(&okm[KEY_LEN..]);
    Ok((cipher, nonce))
}
