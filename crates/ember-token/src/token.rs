//! The token instance: transfer pipeline, launch state machine, phased
//! size limits and the admin surface.
//!
//! All state lives behind one `parking_lot::Mutex`, so transfers serialize
//! per instance; the shared conversion rate is read and written by every
//! fee-bearing transfer, which makes this lock load-bearing rather than
//! defensive. The reentrancy guard is acquired before the lock and held
//! across event emission (after the lock is released), so a sink calling
//! back into `transfer` is rejected instead of deadlocking.
//!
//! Every operation validates fully before its first write: a failed call
//! leaves the token indistinguishable from one that never saw the call.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ember_core::address::Address;
use ember_core::clock::{Clock, SystemClock};
use ember_core::config::{TaxSchedule, TokenConfig};
use ember_core::constants::BPS_PRECISION;
use ember_core::error::{StateError, TokenError, ValidationError};
use ember_core::events::{EventSink, NullSink, TokenEvent};
use ember_core::ledger::{LedgerSnapshot, ReflectionLedger};
use ember_core::math::bps_of;
use ember_core::traits::{FeeBreakdown, FeeCalculator};
use ember_fees::FeeEngine;

use crate::guard::ReentrancyGuard;

/// Result of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// Gross amount debited from the sender.
    pub amount: u128,
    /// Flat-fee share routed to the beneficiary.
    pub flat_fee: u128,
    /// Early-sell tax share routed to the burn sink.
    pub tax: u128,
    /// Amount credited to the recipient.
    pub net: u128,
}

/// Serializable view of the full token state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub ledger: LedgerSnapshot,
    pub launched: bool,
    pub launch_timestamp: Option<u64>,
    pub paused: bool,
    pub config: TokenConfig,
}

/// State guarded by the instance lock.
#[derive(Debug)]
struct TokenState {
    ledger: ReflectionLedger,
    config: TokenConfig,
    dex_flagged: HashSet<Address>,
    fee_exempt: HashSet<Address>,
    launched_at: Option<u64>,
    paused: bool,
}

/// A reflective fee token.
///
/// Composes the [`ReflectionLedger`] and a [`FeeCalculator`] behind one
/// lock. Collaborators (fee engine, event sink, clock) are injected at
/// construction; [`Token::new`] wires the production set.
pub struct Token {
    state: Mutex<TokenState>,
    guard: ReentrancyGuard,
    engine: Box<dyn FeeCalculator>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Token {
    /// Create a token with the production collaborators: [`FeeEngine`],
    /// [`NullSink`], [`SystemClock`].
    pub fn new(
        total_supply: u128,
        genesis_holder: Address,
        config: TokenConfig,
    ) -> Result<Self, TokenError> {
        Self::with_collaborators(
            total_supply,
            genesis_holder,
            config,
            Box::new(FeeEngine::new()),
            Arc::new(NullSink),
            Arc::new(SystemClock),
        )
    }

    /// Create a token with explicit collaborators.
    ///
    /// # Errors
    ///
    /// Fails on zero supply, null genesis holder, or null beneficiary.
    pub fn with_collaborators(
        total_supply: u128,
        genesis_holder: Address,
        config: TokenConfig,
        engine: Box<dyn FeeCalculator>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        if config.beneficiary.is_zero() {
            return Err(ValidationError::NullAddress.into());
        }
        let ledger = ReflectionLedger::new(total_supply, genesis_holder)?;
        Ok(Self {
            state: Mutex::new(TokenState {
                ledger,
                config,
                dex_flagged: HashSet::new(),
                fee_exempt: HashSet::new(),
                launched_at: None,
                paused: false,
            }),
            guard: ReentrancyGuard::new(),
            engine,
            sink,
            clock,
        })
    }

    // ------------------------------------------------------------------
    // Transfer pipeline
    // ------------------------------------------------------------------

    /// Move `amount` from `sender` to `recipient`, taking fees.
    ///
    /// Pipeline: reentrancy guard, precondition checks, one-time launch
    /// bootstrap, fee computation, one ledger transfer for principal plus
    /// aggregate fee, then routing of the flat-fee share to the beneficiary
    /// and the tax share to [`Address::BURN`]. Events are emitted after all
    /// state is committed and the lock released; the guard stays held so a
    /// sink calling back into `transfer` gets [`TokenError::ReentrancyRejected`].
    ///
    /// # Errors
    ///
    /// Any precondition failure aborts with zero partial mutation:
    /// validation errors for null/sentinel parties and zero amounts,
    /// [`StateError::TransfersPaused`] while paused (unless the sender is
    /// exempt), [`TokenError::LimitExceeded`] beyond the current phase cap,
    /// ledger errors for insufficient balance, and
    /// [`TokenError::ReentrancyRejected`] for nested invocation.
    pub fn transfer(
        &self,
        sender: Address,
        recipient: Address,
        amount: u128,
    ) -> Result<TransferOutcome, TokenError> {
        let _entry = self.guard.try_enter()?;
        let now = self.clock.now_unix();
        let mut state = self.state.lock();

        if sender.is_zero() || recipient.is_zero() {
            return Err(ValidationError::NullAddress.into());
        }
        if sender == Address::BURN {
            return Err(ValidationError::SenderIsBurnSink.into());
        }
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }

        let sender_exempt = state.fee_exempt.contains(&sender);
        let recipient_exempt = state.fee_exempt.contains(&recipient);
        if state.paused && !sender_exempt {
            return Err(StateError::TransfersPaused.into());
        }

        // Launch time as of this transfer: the recorded launch, or now if
        // this transfer will bootstrap it. Committed only on success.
        let launch_at = state.launched_at.unwrap_or(now);
        let elapsed = now.saturating_sub(launch_at);

        if state.config.limit.enabled && !sender_exempt && !recipient_exempt {
            let limit = phase_limit(&state, elapsed);
            if amount > limit {
                return Err(TokenError::LimitExceeded { amount, limit });
            }
        }

        let apply_tax = state.dex_flagged.contains(&recipient) && state.config.fee.tax_enabled;
        let breakdown = if sender_exempt || recipient_exempt {
            FeeBreakdown::free(amount)
        } else {
            self.engine
                .calculate_fees(amount, elapsed, apply_tax, &state.config.fee)
        };

        // Principal and aggregate fee in one ledger call, then the fee
        // sub-transfers, all under the same rate bookkeeping.
        let beneficiary = state.config.beneficiary;
        let fee_taken = state
            .ledger
            .transfer(sender, recipient, amount, breakdown.total_bps)?;
        state.ledger.route_fee(beneficiary, breakdown.flat_fee)?;
        state.ledger.route_fee(Address::BURN, breakdown.tax)?;

        let bootstrapped = state.launched_at.is_none();
        if bootstrapped {
            state.launched_at = Some(now);
        }

        let new_rate = state.ledger.current_rate()?;
        let outcome = TransferOutcome {
            amount,
            flat_fee: breakdown.flat_fee,
            tax: breakdown.tax,
            net: breakdown.net,
        };
        drop(state);

        debug!(
            %sender,
            %recipient,
            amount,
            fee = fee_taken,
            tax = outcome.tax,
            "transfer executed"
        );
        if bootstrapped {
            info!(timestamp = now, "launch bootstrapped by first transfer");
            self.sink.emit(TokenEvent::Launched { timestamp: now });
        }
        self.sink.emit(TokenEvent::TransferExecuted {
            from: sender,
            to: recipient,
            amount,
            flat_fee: outcome.flat_fee,
            tax: outcome.tax,
        });
        if fee_taken > 0 {
            self.sink.emit(TokenEvent::FeeAbsorbed {
                amount: fee_taken,
                new_rate,
            });
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Admin surface
    // ------------------------------------------------------------------

    /// Set the flat fee rate.
    ///
    /// # Errors
    ///
    /// [`ValidationError::RateOutOfRange`] above `BPS_PRECISION`.
    pub fn set_flat_fee_bps(&self, bps: u64) -> Result<(), TokenError> {
        if bps > BPS_PRECISION {
            return Err(ValidationError::RateOutOfRange(bps).into());
        }
        self.state.lock().config.fee.flat_fee_bps = bps;
        info!(bps, "flat fee updated");
        Ok(())
    }

    /// Replace the early-sell tax schedule.
    ///
    /// Validated as a whole before anything is written; a malformed
    /// schedule leaves the previous one untouched.
    pub fn set_tax_schedule(
        &self,
        breakpoints_secs: Vec<u64>,
        rates_bps: Vec<u64>,
    ) -> Result<(), TokenError> {
        let schedule = TaxSchedule::new(breakpoints_secs, rates_bps)?;
        self.state.lock().config.fee.schedule = schedule;
        info!("tax schedule updated");
        Ok(())
    }

    /// Flag or unflag an address as a liquidity venue (sell recognition).
    pub fn set_dex_flag(&self, address: Address, flagged: bool) -> Result<(), TokenError> {
        if address.is_zero() {
            return Err(ValidationError::NullAddress.into());
        }
        let mut state = self.state.lock();
        if flagged {
            state.dex_flagged.insert(address);
        } else {
            state.dex_flagged.remove(&address);
        }
        info!(%address, flagged, "dex flag updated");
        Ok(())
    }

    /// Grant or revoke fee exemption (also bypasses pause and size limits).
    pub fn set_exempt(&self, address: Address, exempt: bool) -> Result<(), TokenError> {
        if address.is_zero() {
            return Err(ValidationError::NullAddress.into());
        }
        let mut state = self.state.lock();
        if exempt {
            state.fee_exempt.insert(address);
        } else {
            state.fee_exempt.remove(&address);
        }
        info!(%address, exempt, "fee exemption updated");
        Ok(())
    }

    /// Move an account out of the reflection space.
    pub fn exclude_account(&self, address: Address) -> Result<(), TokenError> {
        self.state.lock().ledger.exclude_account(address)?;
        info!(%address, "account excluded from reflection");
        self.sink.emit(TokenEvent::AccountExcluded(address));
        Ok(())
    }

    /// Move an account back into the reflection space.
    pub fn include_account(&self, address: Address) -> Result<(), TokenError> {
        self.state.lock().ledger.include_account(address)?;
        info!(%address, "account included in reflection");
        self.sink.emit(TokenEvent::AccountIncluded(address));
        Ok(())
    }

    /// Explicitly launch at `timestamp`. One-time.
    ///
    /// # Errors
    ///
    /// [`StateError::AlreadyLaunched`] if launched, explicitly or by
    /// bootstrap.
    pub fn set_launched(&self, timestamp: u64) -> Result<(), TokenError> {
        {
            let mut state = self.state.lock();
            if let Some(at) = state.launched_at {
                return Err(StateError::AlreadyLaunched { at }.into());
            }
            state.launched_at = Some(timestamp);
        }
        info!(timestamp, "token launched");
        self.sink.emit(TokenEvent::Launched { timestamp });
        Ok(())
    }

    /// Permanently disable the transaction-size limit. One-way; a no-op if
    /// already disabled.
    pub fn permanently_disable_size_limit(&self) {
        let mut state = self.state.lock();
        if state.config.limit.enabled {
            state.config.limit.enabled = false;
            info!("size limit permanently disabled");
        }
    }

    /// Permanently disable the early-sell tax. One-way; a no-op if already
    /// disabled.
    pub fn permanently_disable_tax(&self) {
        let mut state = self.state.lock();
        if state.config.fee.tax_enabled {
            state.config.fee.tax_enabled = false;
            info!("early-sell tax permanently disabled");
        }
    }

    /// Set the pause flag. The pipeline reads it; ownership of the policy
    /// behind it belongs to the host.
    pub fn set_paused(&self, paused: bool) {
        self.state.lock().paused = paused;
        info!(paused, "pause flag updated");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Balance in token units.
    pub fn balance_of(&self, account: Address) -> Result<u128, TokenError> {
        self.state.lock().ledger.balance_of(account)
    }

    /// Fixed total supply.
    pub fn total_supply(&self) -> u128 {
        self.state.lock().ledger.total_supply()
    }

    /// Whether the one-time launch transition has happened.
    pub fn is_launched(&self) -> bool {
        self.state.lock().launched_at.is_some()
    }

    /// Launch timestamp, if launched.
    pub fn launched_at(&self) -> Option<u64> {
        self.state.lock().launched_at
    }

    /// Whether the account is outside the reflection space.
    pub fn is_excluded(&self, account: Address) -> bool {
        self.state.lock().ledger.is_excluded(account)
    }

    /// Every fee ever absorbed, token units.
    pub fn total_fees_collected(&self) -> u128 {
        self.state.lock().ledger.total_fees_collected()
    }

    /// Current per-transaction size cap in token units, `None` once the
    /// feature is disabled.
    pub fn current_limit(&self) -> Option<u128> {
        let state = self.state.lock();
        if !state.config.limit.enabled {
            return None;
        }
        let elapsed = match state.launched_at {
            Some(at) => self.clock.now_unix().saturating_sub(at),
            None => 0,
        };
        Some(phase_limit(&state, elapsed))
    }

    /// Serializable view of the full token state.
    pub fn snapshot(&self) -> Result<TokenSnapshot, TokenError> {
        let state = self.state.lock();
        Ok(TokenSnapshot {
            ledger: state.ledger.snapshot()?,
            launched: state.launched_at.is_some(),
            launch_timestamp: state.launched_at,
            paused: state.paused,
            config: state.config.clone(),
        })
    }
}

/// Size cap for the current launch phase, token units.
fn phase_limit(state: &TokenState, elapsed_secs: u64) -> u128 {
    let bps = if state.launched_at.is_none() || elapsed_secs < state.config.limit.launch_window_secs
    {
        state.config.limit.early_max_tx_bps
    } else {
        state.config.limit.standard_max_tx_bps
    };
    bps_of(state.ledger.total_supply(), bps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::clock::ManualClock;
    use ember_core::constants::COIN;
    use ember_core::error::LedgerError;
    use ember_core::events::RecordingSink;
    use proptest::prelude::*;

    const SUPPLY: u128 = 100_000_000 * COIN;
    const T0: u64 = 1_700_000_000;

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    fn genesis() -> Address {
        addr(0xA0)
    }

    fn beneficiary() -> Address {
        addr(0xB0)
    }

    fn dex() -> Address {
        addr(0xD0)
    }

    struct Harness {
        token: Token,
        clock: Arc<ManualClock>,
        sink: Arc<RecordingSink>,
    }

    /// Token with manual clock, recording sink, size limits disabled and
    /// the genesis holder exempt, so tests move funds freely.
    fn harness() -> Harness {
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
        token.permanently_disable_size_limit();
        token.set_exempt(genesis(), true).unwrap();
        token.set_dex_flag(dex(), true).unwrap();
        token
            .transfer(genesis(), addr(1), 10_000_000 * COIN)
            .unwrap();
        sink.clear();
        Harness { token, clock, sink }
    }

    // ------------------------------------------------------------------
    // Transfer pipeline
    // ------------------------------------------------------------------

    #[test]
    fn plain_transfer_takes_flat_fee() {
        let h = harness();
        let outcome = h.token.transfer(addr(1), addr(2), 10_000 * COIN).unwrap();
        assert_eq!(
            outcome,
            TransferOutcome {
                amount: 10_000 * COIN,
                flat_fee: 50 * COIN,
                tax: 0,
                net: 9_950 * COIN,
            }
        );
        assert_eq!(h.token.balance_of(addr(2)).unwrap(), 9_950 * COIN);
        assert_eq!(h.token.balance_of(beneficiary()).unwrap(), 50 * COIN);
        assert_eq!(h.token.balance_of(Address::BURN).unwrap(), 0);
    }

    #[test]
    fn sell_to_dex_pays_tax_to_burn() {
        let h = harness();
        // Launched by the bootstrap at T0; still inside the first bracket.
        h.clock.advance(3_600);
        let outcome = h.token.transfer(addr(1), dex(), 10_000 * COIN).unwrap();
        assert_eq!(outcome.flat_fee, 50 * COIN);
        assert_eq!(outcome.tax, 300 * COIN);
        assert_eq!(outcome.net, 9_650 * COIN);
        assert_eq!(h.token.balance_of(Address::BURN).unwrap(), 300 * COIN);
        assert_eq!(h.token.balance_of(beneficiary()).unwrap(), 50 * COIN);
    }

    #[test]
    fn buy_from_dex_is_untaxed() {
        let h = harness();
        h.token.transfer(addr(1), dex(), 10_000 * COIN).unwrap();
        let burned = h.token.balance_of(Address::BURN).unwrap();
        let outcome = h.token.transfer(dex(), addr(1), 1_000 * COIN).unwrap();
        assert_eq!(outcome.tax, 0);
        assert_eq!(h.token.balance_of(Address::BURN).unwrap(), burned);
    }

    #[test]
    fn tax_decays_across_brackets() {
        let h = harness();
        h.clock.advance(90_000); // inside the second bracket
        let outcome = h.token.transfer(addr(1), dex(), 10_000 * COIN).unwrap();
        assert_eq!(outcome.tax, 200 * COIN);
        h.clock.set(T0 + 300_000); // past the schedule
        let outcome = h.token.transfer(addr(1), dex(), 10_000 * COIN).unwrap();
        assert_eq!(outcome.tax, 0);
        assert_eq!(outcome.flat_fee, 50 * COIN);
    }

    #[test]
    fn exempt_parties_pay_nothing() {
        let h = harness();
        h.token.set_exempt(addr(1), true).unwrap();
        let outcome = h.token.transfer(addr(1), dex(), 10_000 * COIN).unwrap();
        assert_eq!(outcome.flat_fee + outcome.tax, 0);
        assert_eq!(outcome.net, 10_000 * COIN);
    }

    #[test]
    fn burn_sink_cannot_send() {
        let h = harness();
        let err = h.token.transfer(Address::BURN, addr(1), COIN).unwrap_err();
        assert_eq!(err, TokenError::Validation(ValidationError::SenderIsBurnSink));
    }

    #[test]
    fn null_parties_rejected() {
        let h = harness();
        let err = h.token.transfer(Address::ZERO, addr(1), COIN).unwrap_err();
        assert_eq!(err, TokenError::Validation(ValidationError::NullAddress));
        let err = h.token.transfer(addr(1), Address::ZERO, COIN).unwrap_err();
        assert_eq!(err, TokenError::Validation(ValidationError::NullAddress));
    }

    #[test]
    fn failed_transfer_emits_nothing() {
        let h = harness();
        let err = h.token.transfer(addr(7), addr(2), COIN).unwrap_err();
        assert!(matches!(
            err,
            TokenError::Ledger(LedgerError::InsufficientBalance { .. })
        ));
        assert!(h.sink.events().is_empty());
    }

    #[test]
    fn transfer_events_in_order() {
        let h = harness();
        h.token.transfer(addr(1), addr(2), 10_000 * COIN).unwrap();
        let events = h.sink.events();
        assert!(matches!(events[0], TokenEvent::TransferExecuted { .. }));
        assert!(matches!(events[1], TokenEvent::FeeAbsorbed { .. }));
    }

    // ------------------------------------------------------------------
    // Pause
    // ------------------------------------------------------------------

    #[test]
    fn paused_blocks_non_exempt() {
        let h = harness();
        h.token.set_paused(true);
        let err = h.token.transfer(addr(1), addr(2), COIN).unwrap_err();
        assert_eq!(err, TokenError::State(StateError::TransfersPaused));
        h.token.set_paused(false);
        h.token.transfer(addr(1), addr(2), COIN).unwrap();
    }

    #[test]
    fn exempt_sender_bypasses_pause() {
        let h = harness();
        h.token.set_paused(true);
        h.token.transfer(genesis(), addr(2), COIN).unwrap();
    }

    // ------------------------------------------------------------------
    // Launch state machine
    // ------------------------------------------------------------------

    #[test]
    fn first_transfer_bootstraps_launch() {
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
        assert!(!token.is_launched());
        token.transfer(genesis(), addr(1), COIN).unwrap();
        assert_eq!(token.launched_at(), Some(T0));
        assert!(matches!(
            sink.events()[0],
            TokenEvent::Launched { timestamp: T0 }
        ));

        // Bootstrap happens exactly once.
        clock.advance(100);
        token.transfer(genesis(), addr(1), COIN).unwrap();
        assert_eq!(token.launched_at(), Some(T0));
        let err = token.set_launched(T0 + 500).unwrap_err();
        assert_eq!(err, TokenError::State(StateError::AlreadyLaunched { at: T0 }));
    }

    #[test]
    fn explicit_launch_precedes_bootstrap() {
        let h = harness();
        // harness() already bootstrapped via its seed transfer
        let err = h.token.set_launched(T0 + 1).unwrap_err();
        assert_eq!(err, TokenError::State(StateError::AlreadyLaunched { at: T0 }));
    }

    #[test]
    fn failed_transfer_does_not_bootstrap() {
        let clock = Arc::new(ManualClock::new(T0));
        let token = Token::with_collaborators(
            SUPPLY,
            genesis(),
            TokenConfig::with_beneficiary(beneficiary()),
            Box::new(FeeEngine::new()),
            Arc::new(RecordingSink::new()),
            clock,
        )
        .unwrap();
        assert!(token.transfer(addr(1), addr(2), COIN).is_err());
        assert!(!token.is_launched());
    }

    // ------------------------------------------------------------------
    // Size limits
    // ------------------------------------------------------------------

    fn limited_harness() -> Harness {
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
        token.set_launched(T0).unwrap();
        Harness { token, clock, sink }
    }

    #[test]
    fn early_phase_enforces_small_cap() {
        let h = limited_harness();
        // 10 bps of supply
        let cap = SUPPLY / 1_000;
        assert_eq!(h.token.current_limit(), Some(cap));
        let err = h.token.transfer(genesis(), addr(1), cap + 1).unwrap_err();
        assert_eq!(
            err,
            TokenError::LimitExceeded {
                amount: cap + 1,
                limit: cap
            }
        );
        h.token.transfer(genesis(), addr(1), cap).unwrap();
    }

    #[test]
    fn standard_phase_raises_cap() {
        let h = limited_harness();
        h.clock.advance(86_400);
        // 50 bps of supply
        let cap = SUPPLY / 200;
        assert_eq!(h.token.current_limit(), Some(cap));
        h.token.transfer(genesis(), addr(1), cap).unwrap();
        assert!(h.token.transfer(genesis(), addr(1), cap + 1).is_err());
    }

    #[test]
    fn exempt_party_bypasses_limit() {
        let h = limited_harness();
        h.token.set_exempt(genesis(), true).unwrap();
        h.token
            .transfer(genesis(), addr(1), SUPPLY / 100)
            .unwrap();
    }

    #[test]
    fn disable_is_permanent_and_idempotent() {
        let h = limited_harness();
        h.token.permanently_disable_size_limit();
        h.token.permanently_disable_size_limit();
        assert_eq!(h.token.current_limit(), None);
        h.token
            .transfer(genesis(), addr(1), SUPPLY / 10)
            .unwrap();
    }

    // ------------------------------------------------------------------
    // Admin surface
    // ------------------------------------------------------------------

    #[test]
    fn set_flat_fee_applies_to_next_transfer() {
        let h = harness();
        h.token.set_flat_fee_bps(100).unwrap();
        let outcome = h.token.transfer(addr(1), addr(2), 10_000 * COIN).unwrap();
        assert_eq!(outcome.flat_fee, 100 * COIN);
    }

    #[test]
    fn set_flat_fee_rejects_out_of_range() {
        let h = harness();
        let err = h.token.set_flat_fee_bps(10_001).unwrap_err();
        assert_eq!(
            err,
            TokenError::Validation(ValidationError::RateOutOfRange(10_001))
        );
    }

    #[test]
    fn malformed_schedule_leaves_previous_intact() {
        let h = harness();
        let err = h
            .token
            .set_tax_schedule(vec![100, 100], vec![300, 200])
            .unwrap_err();
        assert_eq!(
            err,
            TokenError::Validation(ValidationError::NonIncreasingBreakpoints)
        );
        // Canonical schedule still in force.
        let outcome = h.token.transfer(addr(1), dex(), 10_000 * COIN).unwrap();
        assert_eq!(outcome.tax, 300 * COIN);
    }

    #[test]
    fn disable_tax_is_permanent() {
        let h = harness();
        h.token.permanently_disable_tax();
        h.token.permanently_disable_tax();
        let outcome = h.token.transfer(addr(1), dex(), 10_000 * COIN).unwrap();
        assert_eq!(outcome.tax, 0);
        assert_eq!(outcome.flat_fee, 50 * COIN);
    }

    #[test]
    fn exclude_include_emit_events() {
        let h = harness();
        h.token.exclude_account(addr(5)).unwrap();
        h.token.include_account(addr(5)).unwrap();
        let events = h.sink.events();
        assert_eq!(events[0], TokenEvent::AccountExcluded(addr(5)));
        assert_eq!(events[1], TokenEvent::AccountIncluded(addr(5)));
    }

    #[test]
    fn null_beneficiary_rejected_at_construction() {
        let err = Token::new(
            SUPPLY,
            genesis(),
            TokenConfig::with_beneficiary(Address::ZERO),
        )
        .unwrap_err();
        assert_eq!(err, TokenError::Validation(ValidationError::NullAddress));
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn outcome_components_partition_amount(
            amount in 1u128..=1_000_000,
            flat_bps in 0u64..=500,
            to_dex: bool,
        ) {
            let h = harness();
            h.token.set_flat_fee_bps(flat_bps).unwrap();
            let amount = amount * COIN;
            let recipient = if to_dex { dex() } else { addr(2) };

            let outcome = h.token.transfer(addr(1), recipient, amount).unwrap();

            prop_assert_eq!(outcome.amount, amount);
            prop_assert_eq!(outcome.flat_fee + outcome.tax + outcome.net, amount);
            // Ceiling holds for any flat rate combined with the sell tax.
            prop_assert!(outcome.flat_fee + outcome.tax <= bps_of(amount, 500));
            if !to_dex {
                prop_assert_eq!(outcome.tax, 0);
            }
            prop_assert_eq!(h.token.balance_of(recipient).unwrap(), outcome.net);
        }
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    #[test]
    fn snapshot_serializes_full_state() {
        let h = harness();
        h.token.transfer(addr(1), addr(2), 10_000 * COIN).unwrap();
        let snapshot = h.token.snapshot().unwrap();
        assert!(snapshot.launched);
        assert_eq!(snapshot.launch_timestamp, Some(T0));
        assert_eq!(snapshot.ledger.total_supply, SUPPLY);
        assert!(snapshot.ledger.total_fees_collected > 0);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TokenSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, back);
    }
}
