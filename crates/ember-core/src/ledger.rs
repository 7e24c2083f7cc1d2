//! Reflective balance ledger: two parallel unit spaces and one shared rate.
//!
//! Non-excluded accounts hold balances in overscaled reflection units; their
//! token balance is `reflection_balance / current_rate`. Excluded accounts
//! hold absolute token units that the rate cannot touch. Fees collected by
//! [`ReflectionLedger::take_fee`] enter a pool tracked in both unit spaces,
//! which keeps the rate consistent without visiting any holder's storage;
//! [`ReflectionLedger::route_fee`] moves pooled fee into a destination
//! account under the same bookkeeping.
//!
//! Every operation validates fully before its first write, so a failed call
//! is indistinguishable from one never attempted.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::Address;
use crate::error::{LedgerError, StateError, TokenError, ValidationError};
use crate::math::bps_of;

/// One account row of the persisted state shape.
///
/// Exactly one of `reflection_balance` / `token_balance` is set, matching
/// the unit space the account currently occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: Address,
    pub is_excluded: bool,
    pub reflection_balance: Option<u128>,
    pub token_balance: Option<u128>,
}

/// Serializable view of the full ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub total_supply: u128,
    pub reflection_total: u128,
    pub current_rate: u128,
    pub total_fees_collected: u128,
    pub fee_pool_tokens: u128,
    /// Accounts sorted by address for deterministic output.
    pub accounts: Vec<AccountRecord>,
}

/// The reflective balance ledger.
#[derive(Debug, Clone)]
pub struct ReflectionLedger {
    total_supply: u128,
    reflection_total: u128,
    /// Reflection-space balances of non-excluded accounts.
    reflection_balances: HashMap<Address, u128>,
    /// Token-space balances of excluded accounts.
    token_balances: HashMap<Address, u128>,
    excluded: HashSet<Address>,
    /// Collected-but-unrouted fee, token units.
    fee_pool_tokens: u128,
    /// Collected-but-unrouted fee, reflection units (conversion-time rates).
    fee_pool_reflections: u128,
    /// Monotonic total of every fee ever absorbed, token units.
    total_fees_collected: u128,
    /// Token units held by excluded accounts.
    excluded_tokens: u128,
    /// Reflection units withdrawn from circulation by exclusions.
    excluded_reflections: u128,
}

impl ReflectionLedger {
    /// Create a ledger, minting `total_supply` once to `genesis_holder`.
    ///
    /// The reflection total is the largest `u128` evenly divisible by
    /// `total_supply`, so the initial rate is exact with zero remainder.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroTotalSupply`] if `total_supply == 0`
    /// - [`ValidationError::NullAddress`] if the genesis holder is null
    pub fn new(total_supply: u128, genesis_holder: Address) -> Result<Self, TokenError> {
        if total_supply == 0 {
            return Err(LedgerError::ZeroTotalSupply.into());
        }
        if genesis_holder.is_zero() {
            return Err(ValidationError::NullAddress.into());
        }
        let reflection_total = u128::MAX - u128::MAX % total_supply;
        let mut reflection_balances = HashMap::new();
        reflection_balances.insert(genesis_holder, reflection_total);
        Ok(Self {
            total_supply,
            reflection_total,
            reflection_balances,
            token_balances: HashMap::new(),
            excluded: HashSet::new(),
            fee_pool_tokens: 0,
            fee_pool_reflections: 0,
            total_fees_collected: 0,
            excluded_tokens: 0,
            excluded_reflections: 0,
        })
    }

    /// Fixed total supply in token units.
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Fixed reflection-space total.
    pub fn reflection_total(&self) -> u128 {
        self.reflection_total
    }

    /// Every fee ever absorbed, token units. Never decreases.
    pub fn total_fees_collected(&self) -> u128 {
        self.total_fees_collected
    }

    /// Collected fee not yet routed to a destination, token units.
    pub fn fee_pool_tokens(&self) -> u128 {
        self.fee_pool_tokens
    }

    /// Whether the account currently lives in the token-unit space.
    pub fn is_excluded(&self, account: Address) -> bool {
        self.excluded.contains(&account)
    }

    /// Token units still participating in reflection (rate denominator).
    fn denominator(&self) -> Result<u128, TokenError> {
        let denom = self
            .total_supply
            .checked_sub(self.fee_pool_tokens)
            .and_then(|v| v.checked_sub(self.excluded_tokens))
            .ok_or(LedgerError::InvariantViolation)?;
        if denom == 0 {
            return Err(LedgerError::InvariantViolation.into());
        }
        Ok(denom)
    }

    /// Global conversion rate between reflection units and token units.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvariantViolation`] if no token units remain in the
    /// reflection space (the denominator would be non-positive).
    pub fn current_rate(&self) -> Result<u128, TokenError> {
        let numerator = self
            .reflection_total
            .checked_sub(self.fee_pool_reflections)
            .and_then(|v| v.checked_sub(self.excluded_reflections))
            .ok_or(LedgerError::InvariantViolation)?;
        Ok(numerator / self.denominator()?)
    }

    /// Balance in token units, whichever space the account occupies.
    ///
    /// For non-excluded accounts this is `reflection_balance / current_rate`,
    /// truncating toward zero — the sole source of bounded dust in the
    /// conservation invariant.
    pub fn balance_of(&self, account: Address) -> Result<u128, TokenError> {
        if self.excluded.contains(&account) {
            return Ok(self.token_balances.get(&account).copied().unwrap_or(0));
        }
        let reflection = self.reflection_balances.get(&account).copied().unwrap_or(0);
        if reflection == 0 {
            return Ok(0);
        }
        Ok(reflection / self.current_rate()?)
    }

    /// Convert token units to reflection units at the current rate.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AmountOutOfRange`] if `amount` exceeds the total supply.
    pub fn token_to_reflection(&self, amount: u128) -> Result<u128, TokenError> {
        if amount > self.total_supply {
            return Err(LedgerError::AmountOutOfRange {
                amount,
                max: self.total_supply,
            }
            .into());
        }
        amount
            .checked_mul(self.current_rate()?)
            .ok_or_else(|| LedgerError::InvariantViolation.into())
    }

    /// Convert reflection units to token units at the current rate.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AmountOutOfRange`] if `amount` exceeds the reflection
    /// total.
    pub fn reflection_to_token(&self, amount: u128) -> Result<u128, TokenError> {
        if amount > self.reflection_total {
            return Err(LedgerError::AmountOutOfRange {
                amount,
                max: self.reflection_total,
            }
            .into());
        }
        Ok(amount / self.current_rate()?)
    }

    /// Move an account from the reflection space to the token space.
    ///
    /// The account's reflection balance is converted to token units at the
    /// current rate (rounding down) and frozen; from here on the rate cannot
    /// dilute or appreciate it.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NullAddress`] for the null address
    /// - [`StateError::AlreadyExcluded`] if already excluded
    /// - [`LedgerError::InvariantViolation`] if excluding would drain the
    ///   reflection space entirely, leaving the rate undefined
    pub fn exclude_account(&mut self, account: Address) -> Result<(), TokenError> {
        if account.is_zero() {
            return Err(ValidationError::NullAddress.into());
        }
        if self.excluded.contains(&account) {
            return Err(StateError::AlreadyExcluded(account).into());
        }
        let rate = self.current_rate()?;
        let reflection_balance = self.reflection_balances.get(&account).copied().unwrap_or(0);
        let token_balance = reflection_balance / rate;
        if token_balance >= self.denominator()? {
            return Err(LedgerError::InvariantViolation.into());
        }
        self.reflection_balances.remove(&account);
        if token_balance > 0 {
            self.token_balances.insert(account, token_balance);
        }
        self.excluded.insert(account);
        self.excluded_tokens += token_balance;
        self.excluded_reflections += reflection_balance;
        debug!(%account, token_balance, "account left the reflection space");
        Ok(())
    }

    /// Move an account back into the reflection space.
    ///
    /// The frozen token-unit balance is re-expressed in reflection units at
    /// the *current* rate; with no intervening transfers the round trip
    /// preserves the balance within one unit of truncation.
    ///
    /// # Errors
    ///
    /// [`StateError::NotExcluded`] if the account is not excluded.
    pub fn include_account(&mut self, account: Address) -> Result<(), TokenError> {
        if !self.excluded.contains(&account) {
            return Err(StateError::NotExcluded(account).into());
        }
        let rate = self.current_rate()?;
        let token_balance = self.token_balances.get(&account).copied().unwrap_or(0);
        let reflection_balance = token_balance
            .checked_mul(rate)
            .ok_or(LedgerError::InvariantViolation)?;
        self.token_balances.remove(&account);
        self.excluded.remove(&account);
        if reflection_balance > 0 {
            self.reflection_balances.insert(account, reflection_balance);
        }
        // excluded_tokens mirrors token_balances mutations exactly; the
        // reflection side may carry truncation residue from rate drift.
        self.excluded_tokens -= token_balance;
        self.excluded_reflections = self.excluded_reflections.saturating_sub(reflection_balance);
        if self.excluded.is_empty() {
            self.excluded_reflections = 0;
        }
        debug!(%account, token_balance, "account rejoined the reflection space");
        Ok(())
    }

    /// Absorb a fee into the pool and recompute the rate.
    ///
    /// Both unit spaces are credited at the conversion-time rate, so the
    /// pooled fee leaves circulating reflection supply without touching any
    /// holder's storage. Returns the new rate.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AmountOutOfRange`] if `fee` exceeds the total supply
    /// - [`LedgerError::InvariantViolation`] if absorbing `fee` would leave
    ///   no token units in the reflection space (the pathological
    ///   full-supply-as-fee case), checked before anything is written
    pub fn take_fee(&mut self, fee: u128) -> Result<u128, TokenError> {
        if fee == 0 {
            return self.current_rate();
        }
        if fee > self.total_supply {
            return Err(LedgerError::AmountOutOfRange {
                amount: fee,
                max: self.total_supply,
            }
            .into());
        }
        let rate = self.current_rate()?;
        if fee >= self.denominator()? {
            return Err(LedgerError::InvariantViolation.into());
        }
        let reflection_fee = fee
            .checked_mul(rate)
            .ok_or(LedgerError::InvariantViolation)?;
        self.fee_pool_tokens += fee;
        self.fee_pool_reflections += reflection_fee;
        self.total_fees_collected += fee;
        self.current_rate()
    }

    /// Route collected fee out of the pool into a destination account.
    ///
    /// The ledger-internal counterpart of a transfer: the destination is
    /// credited in whichever unit space it occupies and the pool gives up
    /// the same quantity in both spaces, so the rate bookkeeping stays
    /// consistent.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NullAddress`] for the null destination
    /// - [`LedgerError::FeePoolUnderflow`] if `amount` exceeds the pool
    pub fn route_fee(&mut self, destination: Address, amount: u128) -> Result<(), TokenError> {
        if destination.is_zero() {
            return Err(ValidationError::NullAddress.into());
        }
        if amount == 0 {
            return Ok(());
        }
        if amount > self.fee_pool_tokens {
            return Err(LedgerError::FeePoolUnderflow {
                requested: amount,
                pooled: self.fee_pool_tokens,
            }
            .into());
        }
        let rate = self.current_rate()?;
        let reflection_amount = amount
            .checked_mul(rate)
            .ok_or(LedgerError::InvariantViolation)?;
        self.fee_pool_tokens -= amount;
        self.fee_pool_reflections = self.fee_pool_reflections.saturating_sub(reflection_amount);
        if self.fee_pool_tokens == 0 {
            // Flush truncation residue once the pool empties; leftover
            // reflection units would bias the rate numerator downward forever.
            self.fee_pool_reflections = 0;
        }
        self.credit(destination, amount, reflection_amount);
        Ok(())
    }

    /// Atomic transfer with fee absorption.
    ///
    /// Computes `fee = amount · fee_bps / 10_000` and moves `amount - fee`
    /// to the recipient. Debits and credits use whichever unit space each
    /// party occupies; all conversions happen at the pre-fee rate, and
    /// [`take_fee`](Self::take_fee) runs exactly once after the principal
    /// mutation so the rate shift does not retroactively alter the amount
    /// just moved. Returns the fee actually taken.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NullAddress`] / [`ValidationError::ZeroAmount`]
    /// - [`LedgerError::AmountOutOfRange`] if `amount` exceeds the supply
    /// - [`LedgerError::InsufficientBalance`] if the sender holds less
    /// - [`LedgerError::InvariantViolation`] if the post-transfer fee
    ///   absorption would empty the reflection space (pre-flighted, so the
    ///   failure leaves no partial mutation)
    pub fn transfer(
        &mut self,
        sender: Address,
        recipient: Address,
        amount: u128,
        fee_bps: u64,
    ) -> Result<u128, TokenError> {
        if sender.is_zero() || recipient.is_zero() {
            return Err(ValidationError::NullAddress.into());
        }
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        if amount > self.total_supply {
            return Err(LedgerError::AmountOutOfRange {
                amount,
                max: self.total_supply,
            }
            .into());
        }
        let rate = self.current_rate()?;
        let fee = bps_of(amount, fee_bps);
        let net = amount - fee;
        let have = self.balance_of(sender)?;
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount }.into());
        }
        let r_amount = amount
            .checked_mul(rate)
            .ok_or(LedgerError::InvariantViolation)?;
        let r_net = net
            .checked_mul(rate)
            .ok_or(LedgerError::InvariantViolation)?;

        // Pre-flight the post-principal denominator so a failure cannot
        // strand a half-applied transfer, and so a full-balance move into
        // an excluded account cannot empty the reflection space.
        let mut post_denom = self.denominator()?;
        if self.excluded.contains(&sender) {
            post_denom += amount;
        }
        if self.excluded.contains(&recipient) {
            post_denom = post_denom
                .checked_sub(net)
                .ok_or(LedgerError::InvariantViolation)?;
        }
        if post_denom <= fee {
            return Err(LedgerError::InvariantViolation.into());
        }

        self.debit(sender, amount, r_amount);
        self.credit(recipient, net, r_net);
        if fee > 0 {
            self.take_fee(fee)?;
        }
        Ok(fee)
    }

    /// Debit an account in its current unit space. Callers have already
    /// verified the balance covers `amount` (hence `r_amount`).
    fn debit(&mut self, account: Address, amount: u128, r_amount: u128) {
        if self.excluded.contains(&account) {
            let balance = self.token_balances.get(&account).copied().unwrap_or(0);
            let remaining = balance - amount;
            if remaining == 0 {
                self.token_balances.remove(&account);
            } else {
                self.token_balances.insert(account, remaining);
            }
            self.excluded_tokens -= amount;
            self.excluded_reflections = self.excluded_reflections.saturating_sub(r_amount);
        } else {
            let balance = self.reflection_balances.get(&account).copied().unwrap_or(0);
            let remaining = balance - r_amount;
            if remaining == 0 {
                self.reflection_balances.remove(&account);
            } else {
                self.reflection_balances.insert(account, remaining);
            }
        }
    }

    /// Credit an account in its current unit space.
    fn credit(&mut self, account: Address, amount: u128, r_amount: u128) {
        if self.excluded.contains(&account) {
            *self.token_balances.entry(account).or_insert(0) += amount;
            self.excluded_tokens += amount;
            self.excluded_reflections += r_amount;
        } else {
            *self.reflection_balances.entry(account).or_insert(0) += r_amount;
        }
    }

    /// Serializable account table plus global record.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, TokenError> {
        let mut accounts: Vec<AccountRecord> = self
            .reflection_balances
            .iter()
            .map(|(address, reflection)| AccountRecord {
                address: *address,
                is_excluded: false,
                reflection_balance: Some(*reflection),
                token_balance: None,
            })
            .collect();
        for address in &self.excluded {
            accounts.push(AccountRecord {
                address: *address,
                is_excluded: true,
                reflection_balance: None,
                token_balance: Some(self.token_balances.get(address).copied().unwrap_or(0)),
            });
        }
        accounts.sort_by_key(|record| record.address);
        Ok(LedgerSnapshot {
            total_supply: self.total_supply,
            reflection_total: self.reflection_total,
            current_rate: self.current_rate()?,
            total_fees_collected: self.total_fees_collected,
            fee_pool_tokens: self.fee_pool_tokens,
            accounts,
        })
    }
}
