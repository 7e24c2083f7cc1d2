//! Integer arithmetic helpers for basis-point math on `u128` amounts.

use crate::constants::BPS_PRECISION;

/// Exact `⌊amount · bps / BPS_PRECISION⌋` without widening past `u128`.
///
/// Uses the identity `⌊a·b/p⌋ = (a/p)·b + ⌊(a mod p)·b/p⌋`, which holds for
/// all non-negative integers and keeps every intermediate within `u128` for
/// any `amount` when `bps ≤ BPS_PRECISION`.
pub fn bps_of(amount: u128, bps: u64) -> u128 {
    let p = BPS_PRECISION as u128;
    let b = bps as u128;
    (amount / p) * b + (amount % p) * b / p
}
