//! Trait interfaces between crates.
//!
//! [`FeeCalculator`] is the contract the transfer pipeline (ember-token)
//! uses to talk to the fee engine (ember-fees); the engine stays a pure
//! leaf with no ledger access.

use crate::config::{FeeConfig, TaxSchedule};

/// Result of a fee computation over a gross transfer amount.
///
/// `flat_fee + tax == total` and `net + total == amount` always hold.
/// `total_bps` is the aggregate rate actually applied (after the ceiling),
/// suitable for handing to the ledger's transfer primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    /// Flat-fee share, routed to the beneficiary.
    pub flat_fee: u128,
    /// Early-sell tax share, routed to the burn sink.
    pub tax: u128,
    /// Combined fee taken from the gross amount.
    pub total: u128,
    /// Amount the recipient receives.
    pub net: u128,
    /// Aggregate fee rate applied, basis points.
    pub total_bps: u64,
}

impl FeeBreakdown {
    /// A fee-free breakdown: the whole amount passes through.
    pub fn free(amount: u128) -> Self {
        Self {
            flat_fee: 0,
            tax: 0,
            total: 0,
            net: amount,
            total_bps: 0,
        }
    }
}

/// Pure fee computation over explicit inputs. Never mutates state.
pub trait FeeCalculator: Send + Sync {
    /// Early-sell tax rate for the given time since launch, basis points.
    ///
    /// Returns the rate of the first breakpoint `elapsed_secs` is strictly
    /// below; 0 at or past the last breakpoint. Callers supply a validated,
    /// strictly increasing schedule.
    fn early_sell_tax_bps(&self, elapsed_secs: u64, schedule: &TaxSchedule) -> u64;

    /// Compute the fee split for a gross `amount`.
    ///
    /// The tax applies to the gross amount (not net of the flat fee), only
    /// when `apply_tax` is set. If the combined rate exceeds the ceiling,
    /// both components are scaled proportionally so the total equals the
    /// ceiling exactly. Total over its whole domain; no error conditions.
    fn calculate_fees(
        &self,
        amount: u128,
        elapsed_secs: u64,
        apply_tax: bool,
        config: &FeeConfig,
    ) -> FeeBreakdown;
}
