//! Picks which validators submit a collective transaction.
//!
//! The block hash at the start of the phase seeds a starting position in the
//! circular list of indices. At first only the validator at that position is
//! allowed to submit. Once the phase has been open for `desperation_delay`
//! blocks, the window of allowed validators starts growing so that a single
//! offline leader cannot stall the run.
use crate::config::DkgConfig;
use dkg_crypto::poly::Idx;
use ethers::types::{H256, U256};

/// First position of the allowed window for a committee of `n`
pub fn starting_position(seed: H256, n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    (U256::from_big_endian(seed.as_bytes()) % U256::from(n)).as_u32()
}

/// Number of validators allowed to submit, `blocks_since_desperation` blocks
/// after the delay expired. Grows by one after every step, where the step size
/// shrinks as the window widens.
pub fn allowed_leaders(blocks_since_desperation: i64, desperation_factor: u64, n: u32) -> u32 {
    let mut allowed: u64 = 1;
    let mut remaining = blocks_since_desperation;
    while remaining >= 0 && allowed < u64::from(n) {
        allowed += 1;
        let step = (desperation_factor / allowed).max(1);
        remaining -= step as i64;
    }
    allowed.min(u64::from(n.max(1))) as u32
}

/// Whether the validator at base-1 `index` may submit at `current_block`
pub fn is_leader(
    seed: H256,
    start_block: u64,
    current_block: u64,
    n: u32,
    index: Idx,
    config: &DkgConfig,
) -> bool {
    if n == 0 || index == 0 || index > n {
        return false;
    }

    let start = starting_position(seed, n);
    let blocks_since_desperation =
        current_block as i64 - start_block as i64 - config.desperation_delay as i64;
    let allowed = allowed_leaders(blocks_since_desperation, config.desperation_factor, n);

    // distance from the starting position, walking the circle forward
    let position = (index - 1 + n - start) % n;
    position < allowed
}
