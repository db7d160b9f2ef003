//! Protocol-level cryptography over BLS12-381.
//!
//! Transport keys, commitments and key shares on G1 live in `G1`; the master
//! public key and the GPKj values live in `G2`. Every function returns an error
//! instead of panicking on malformed input, since such input can only come from
//! corrupted state or a byzantine participant.
use crate::{
    errors::{DkgError, DkgResult},
    state::Participant,
};
use dkg_crypto::{
    dleq::DleqProof,
    encryption::{self, EncryptedShare},
    group::{Curve, Element, PairingCurve as _, Point, Scalar as _},
    lagrange::InverseTable,
    poly::{Eval, Idx, Poly},
    CryptoError,
};
use ethers::{types::H256, utils::keccak256};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};

pub use dkg_crypto::curve::bls12381::{G1Curve, G2Curve, PairingCurve as Bls12, Scalar, G1, G2};

/// A DLEQ proof between two pairs of G1 points
pub type Proof = DleqProof<G1Curve>;

/// Domain separator for the second G1 base of key shares
const KEY_SHARE_BASE: &[u8] = b"dkg-key-share-base-g1";

/// A validator's published commitment to its secret value in both groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShare {
    pub g1: G1,
    pub proof: Proof,
    pub g2: G2,
}

/// The G1 base `H1` of key shares, independent from the generator
pub fn h1() -> G1 {
    G1::hash_to_curve(KEY_SHARE_BASE)
}

/// The G2 base `H2` of key shares and group public keys
pub fn h2() -> G2 {
    G2::one()
}

/// Samples a transport key pair
pub fn generate_transport_keys<R: RngCore>(rng: &mut R) -> (Scalar, G1) {
    let mut private = Scalar::rand(rng);
    while private.is_zero() {
        private = Scalar::rand(rng);
    }
    (private, G1Curve::commit(&private))
}

/// The transport key pair of an operator-provided private key
pub fn transport_keys_from(private: Scalar) -> DkgResult<(Scalar, G1)> {
    if private.is_zero() {
        return Err(CryptoError::ZeroScalar.into());
    }
    Ok((private, G1Curve::commit(&private)))
}

/// Position of `recipient`'s share in the list published by `dealer`. Dealers
/// do not encrypt a share to themselves, so the list skips their own index.
pub fn share_slot(dealer: Idx, recipient: Idx) -> DkgResult<usize> {
    if dealer == 0 || recipient == 0 || dealer == recipient {
        return Err(CryptoError::InvalidIndex(recipient).into());
    }
    Ok(if recipient < dealer {
        recipient as usize - 1
    } else {
        recipient as usize - 2
    })
}

/// The output of share distribution for one dealer
pub struct DealtShares {
    pub coefficients: Poly<Scalar>,
    pub commitments: Vec<G1>,
    pub encrypted_shares: Vec<EncryptedShare>,
}

/// Samples a polynomial of degree `threshold` and encrypts its evaluation at
/// every other participant's index under the pairwise transport key.
/// `participants` must be ordered by index and include the dealer.
pub fn generate_shares<R: RngCore>(
    rng: &mut R,
    transport_private_key: &Scalar,
    own_index: Idx,
    participants: &[&Participant],
    threshold: u32,
) -> DkgResult<DealtShares> {
    if transport_private_key.is_zero() {
        return Err(CryptoError::ZeroScalar.into());
    }

    let coefficients = Poly::<Scalar>::random(threshold as usize, rng);
    let commitments = Vec::from(coefficients.commit::<G1>());

    let encrypted_shares = participants
        .iter()
        .filter(|p| p.index != own_index)
        .map(|p| -> DkgResult<EncryptedShare> {
            let key = encryption::shared_key::<G1Curve>(transport_private_key, &p.public_key)?;
            let share = coefficients.eval(p.index)?.value;
            Ok(encryption::encrypt_share::<G1Curve>(
                &key, own_index, p.index, &share,
            )?)
        })
        .collect::<DkgResult<Vec<_>>>()?;

    if encrypted_shares.len() + 1 != participants.len() {
        return Err(DkgError::ParticipantList(format!(
            "dealer {} is not part of the {} participants",
            own_index,
            participants.len()
        )));
    }

    Ok(DealtShares {
        coefficients,
        commitments,
        encrypted_shares,
    })
}

/// Hash of the encrypted shares alone
pub fn encrypted_shares_hash(encrypted_shares: &[EncryptedShare]) -> DkgResult<H256> {
    let bytes = bincode::serialize(encrypted_shares).map_err(CryptoError::from)?;
    Ok(H256::from(keccak256(bytes)))
}

/// Hash binding a dealer's encrypted shares to its commitments. It is built on
/// top of [`encrypted_shares_hash`] so that the commitments can be checked
/// against it without the ciphertexts.
pub fn distributed_shares_hash(
    encrypted_shares: &[EncryptedShare],
    commitments: &[G1],
) -> DkgResult<H256> {
    let shares_hash = encrypted_shares_hash(encrypted_shares)?;
    distributed_shares_hash_from(shares_hash, commitments)
}

pub fn distributed_shares_hash_from(shares_hash: H256, commitments: &[G1]) -> DkgResult<H256> {
    let mut bytes = shares_hash.as_bytes().to_vec();
    bytes.extend(bincode::serialize(commitments).map_err(CryptoError::from)?);
    Ok(H256::from(keccak256(bytes)))
}

/// Checks a share against the dealer's commitments, i.e. `share * G1 == F(idx)`
/// where `F` is the committed polynomial
pub fn share_correct(idx: Idx, share: &Scalar, commitments: &[G1]) -> DkgResult<bool> {
    let public = Poly::<G1>::from(commitments.to_vec());
    let expected = public.eval(idx)?.value;
    Ok(G1Curve::commit(share) == expected)
}

/// Checks that the sizes of a dealer's published data fit the committee
fn check_dealt_lengths(dealer: &Participant, n: u32, threshold: u32) -> DkgResult<()> {
    if dealer.commitments.len() != threshold as usize + 1 {
        return Err(CryptoError::LengthMismatch {
            what: "commitments",
            expected: threshold as usize + 1,
            got: dealer.commitments.len(),
        }
        .into());
    }
    if dealer.encrypted_shares.len() + 1 != n as usize {
        return Err(CryptoError::LengthMismatch {
            what: "encrypted shares",
            expected: (n as usize).saturating_sub(1),
            got: dealer.encrypted_shares.len(),
        }
        .into());
    }
    Ok(())
}

/// Decrypts the share `dealer` addressed to us
pub fn decrypt_share_from(
    transport_private_key: &Scalar,
    own_index: Idx,
    dealer: &Participant,
) -> DkgResult<Scalar> {
    let slot = share_slot(dealer.index, own_index)?;
    let encrypted = dealer
        .encrypted_shares
        .get(slot)
        .ok_or(CryptoError::InvalidIndex(own_index))?;
    let key = encryption::shared_key::<G1Curve>(transport_private_key, &dealer.public_key)?;
    Ok(encryption::decrypt_share::<G1Curve>(
        &key,
        dealer.index,
        own_index,
        encrypted,
    )?)
}

/// Verifies the share `dealer` distributed to us.
///
/// Returns `(valid, present)`. `present` is false when the dealer never
/// distributed anything, which is a job for the missing-shares dispute. Our
/// own shares are always valid. An error means the inputs are malformed.
pub fn verify_distributed_shares(
    transport_private_key: &Scalar,
    own_index: Idx,
    dealer: &Participant,
    n: u32,
    threshold: u32,
) -> DkgResult<(bool, bool)> {
    if dealer.index == own_index {
        return Ok((true, true));
    }
    if dealer.commitments.is_empty() && dealer.encrypted_shares.is_empty() {
        return Ok((false, false));
    }
    check_dealt_lengths(dealer, n, threshold)?;

    let share = match decrypt_share_from(transport_private_key, own_index, dealer) {
        Ok(share) => share,
        // the ciphertext was not produced under our pairwise key
        Err(DkgError::Crypto(CryptoError::Decryption)) => return Ok((false, true)),
        Err(err) => return Err(err),
    };

    Ok((share_correct(own_index, &share, &dealer.commitments)?, true))
}

/// Reveals the pairwise key with `dealer` together with a proof that it was
/// derived from our registered transport key. This lets anyone decrypt exactly
/// the one share the dealer sent us.
pub fn dispute_evidence<R: RngCore>(
    rng: &mut R,
    transport_private_key: &Scalar,
    dealer_public_key: &G1,
) -> DkgResult<(G1, Proof)> {
    let own_public = G1Curve::commit(transport_private_key);
    let shared = encryption::shared_key::<G1Curve>(transport_private_key, dealer_public_key)?;
    let proof = Proof::prove(
        rng,
        transport_private_key,
        &G1::one(),
        &own_public,
        dealer_public_key,
        &shared,
    )?;
    Ok((shared, proof))
}

pub fn verify_dispute_evidence(
    accuser_public_key: &G1,
    dealer_public_key: &G1,
    shared_key: &G1,
    proof: &Proof,
) -> DkgResult<bool> {
    if shared_key.is_zero() {
        return Ok(false);
    }
    Ok(proof.verify(&G1::one(), accuser_public_key, dealer_public_key, shared_key)?)
}

/// Commits to the secret value on the key share bases and proves that the G1
/// key share has the same discrete log as the first commitment
pub fn generate_key_share<R: RngCore>(
    rng: &mut R,
    secret_value: &Scalar,
    first_commitment: &G1,
) -> DkgResult<KeyShare> {
    if secret_value.is_zero() {
        return Err(CryptoError::ZeroScalar.into());
    }
    let h1 = h1();

    let mut g1 = h1;
    g1.mul(secret_value);
    let mut g2 = h2();
    g2.mul(secret_value);

    let proof = Proof::prove(
        rng,
        secret_value,
        &G1::one(),
        first_commitment,
        &h1,
        &g1,
    )?;

    Ok(KeyShare { g1, proof, g2 })
}

/// Checks the DLEQ proof against the first commitment and that both key
/// shares hide the same value: `e(g1, H2) == e(H1, g2)`
pub fn verify_key_share(first_commitment: &G1, key_share: &KeyShare) -> DkgResult<bool> {
    if key_share.g1.is_zero() || key_share.g2.is_zero() {
        return Ok(false);
    }
    let h1 = h1();
    if !key_share
        .proof
        .verify(&G1::one(), first_commitment, &h1, &key_share.g1)?
    {
        return Ok(false);
    }
    Ok(Bls12::pairing_check(&key_share.g1, &h2(), &h1, &key_share.g2))
}

/// Sums the G2 key shares of the qualified dealers
pub fn generate_master_public_key(key_shares_g2: &[G2]) -> DkgResult<G2> {
    if key_shares_g2.is_empty() {
        return Err(CryptoError::LengthMismatch {
            what: "key shares",
            expected: 1,
            got: 0,
        }
        .into());
    }
    let mpk = key_shares_g2.iter().fold(G2::zero(), |mut acc, share| {
        acc.add(share);
        acc
    });
    if mpk.is_zero() {
        return Err(CryptoError::IdentityPoint.into());
    }
    Ok(mpk)
}

/// Checks `e(Σ key_share_g1, H2) == e(H1, mpk)`
pub fn verify_master_public_key(key_shares_g1: &[G1], mpk: &G2) -> DkgResult<bool> {
    let sum = key_shares_g1.iter().fold(G1::zero(), |mut acc, share| {
        acc.add(share);
        acc
    });
    Ok(Bls12::pairing_check(&sum, &h2(), &h1(), mpk))
}

/// Our share of the group secret: the sum of all qualified dealers'
/// evaluations at our index. Returns it with the matching GPKj.
pub fn generate_group_keys(
    transport_private_key: &Scalar,
    own_index: Idx,
    own_coefficients: &Poly<Scalar>,
    dealers: &[&Participant],
) -> DkgResult<(Scalar, G2)> {
    let mut group_private_key = Scalar::zero();
    for dealer in dealers {
        let share = if dealer.index == own_index {
            own_coefficients.eval(own_index)?.value
        } else {
            let share = decrypt_share_from(transport_private_key, own_index, dealer)?;
            if !share_correct(own_index, &share, &dealer.commitments)? {
                return Err(DkgError::ParticipantList(format!(
                    "share of qualified dealer {} does not match its commitments",
                    dealer.index
                )));
            }
            share
        };
        group_private_key.add(&share);
    }
    if group_private_key.is_zero() {
        return Err(CryptoError::ZeroScalar.into());
    }

    Ok((group_private_key, G2Curve::commit(&group_private_key)))
}

/// `Σ_i F_i(index)` over the dealers' committed polynomials: the G1 image of the
/// group secret share of the validator at `index`
pub fn expected_gpkj_commitment(commitments: &[&[G1]], index: Idx) -> DkgResult<G1> {
    let mut sum = Poly::<G1>::zero();
    for dealer in commitments {
        sum += &Poly::from(dealer.to_vec());
    }
    Ok(sum.eval(index)?.value)
}

/// The result of checking every participant's GPKj
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSigners<'a> {
    pub honest: Vec<&'a Participant>,
    pub dishonest: Vec<&'a Participant>,
    pub missing: Vec<&'a Participant>,
}

/// Partitions participants by their published GPKj. A GPKj is honest when
/// `e(expected_j, H2) == e(G1, gpkj)`, where `expected_j` comes from the
/// dealers' commitments. A zero GPKj or one from another run is missing.
pub fn categorize_group_signers<'a>(
    participants: &[&'a Participant],
    dealers: &[&Participant],
    nonce: u64,
) -> DkgResult<GroupSigners<'a>> {
    let commitments = dealers
        .iter()
        .map(|d| d.commitments.as_slice())
        .collect::<Vec<_>>();

    let mut signers = GroupSigners::default();
    for participant in participants.iter().copied() {
        if participant.gpkj.is_zero() || participant.nonce != nonce {
            signers.missing.push(participant);
            continue;
        }

        let expected = expected_gpkj_commitment(&commitments, participant.index)?;
        if Bls12::pairing_check(&expected, &h2(), &G1::one(), &participant.gpkj) {
            signers.honest.push(participant);
        } else {
            signers.dishonest.push(participant);
        }
    }

    Ok(signers)
}

/// Interpolates `threshold + 1` GPKj values at zero, recovering the master
/// public key
pub fn recover_master_public_key(
    gpkjs: &[(Idx, G2)],
    threshold: u32,
    n: u32,
) -> DkgResult<G2> {
    let table = InverseTable::<Scalar>::new(n as usize)?;
    let evals = gpkjs
        .iter()
        .map(|(index, value)| Eval {
            index: *index,
            value: *value,
        })
        .collect::<Vec<_>>();
    Ok(table.interpolate_at_zero(threshold as usize + 1, &evals)?)
}
