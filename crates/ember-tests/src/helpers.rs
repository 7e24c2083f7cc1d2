//! Shared helpers for the integration suites.

use std::sync::Arc;

use ember_core::address::Address;
use ember_core::clock::ManualClock;
use ember_core::config::TokenConfig;
use ember_core::constants::{COIN, GENESIS_SUPPLY};
use ember_core::events::RecordingSink;
use ember_fees::FeeEngine;
use ember_token::Token;

/// Genesis supply used across the suites: the canonical 100 billion EMBER.
pub const SUPPLY: u128 = GENESIS_SUPPLY;

/// Launch instant used by [`launched_token`].
pub const T0: u64 = 1_700_000_000;

/// Deterministic address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

pub fn genesis() -> Address {
    addr(0xA0)
}

pub fn beneficiary() -> Address {
    addr(0xB0)
}

pub fn dex() -> Address {
    addr(0xD0)
}

/// A token wired with test collaborators.
pub struct TestToken {
    pub token: Arc<Token>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
}

/// Fresh token, not yet launched, default configuration.
pub fn fresh_token() -> TestToken {
    let clock = Arc::new(ManualClock::new(T0));
    let sink = Arc::new(RecordingSink::new());
    let token = Token::with_collaborators(
        SUPPLY,
        genesis(),
        TokenConfig::with_beneficiary(beneficiary()),
        Box::new(FeeEngine::new()),
        sink.clone(),
        clock.clone(),
    )
    .unwrap();
    TestToken {
        token: Arc::new(token),
        clock,
        sink,
    }
}

/// Token launched at [`T0`] with the dex flagged, the genesis holder
/// exempt, size limits disabled, and funds spread across a few holders.
pub fn launched_token() -> TestToken {
    let t = fresh_token();
    t.token.set_launched(T0).unwrap();
    t.token.permanently_disable_size_limit();
    t.token.set_exempt(genesis(), true).unwrap();
    t.token.set_dex_flag(dex(), true).unwrap();
    for seed in 1..=4u8 {
        t.token
            .transfer(genesis(), addr(seed), 1_000_000 * COIN)
            .unwrap();
    }
    t.sink.clear();
    t
}

/// Sum of balances over `accounts` plus the collected-but-unrouted pool.
///
/// The pipeline routes every fee as part of the transfer, so the pool term
/// is zero between operations; it is included so the helper also holds
/// mid-sequence in ledger-level tests.
pub fn total_held(token: &Token, accounts: &[Address]) -> u128 {
    let pool = token.snapshot().unwrap().ledger.fee_pool_tokens;
    accounts
        .iter()
        .map(|a| token.balance_of(*a).unwrap())
        .sum::<u128>()
        + pool
}
