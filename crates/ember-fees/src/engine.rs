//! Fee engine implementing the [`FeeCalculator`] trait.
//!
//! Combines the flat transfer fee with the time-decaying early-sell tax and
//! applies the combined-rate ceiling. All arithmetic is integer-only on
//! `u128` with truncation toward zero; the engine reads configuration and
//! elapsed time as explicit inputs and touches no shared state.

use ember_core::config::{FeeConfig, TaxSchedule};
use ember_core::math::bps_of;
use ember_core::traits::{FeeBreakdown, FeeCalculator};
use tracing::trace;

/// The production fee calculator.
///
/// Implements [`FeeCalculator`] with:
/// - Bracket lookup over the validated tax schedule
/// - Gross-amount basis for both fee components
/// - Proportional scaling of both components when the ceiling binds
#[derive(Debug, Clone, Default)]
pub struct FeeEngine;

impl FeeEngine {
    /// Create a new FeeEngine.
    pub fn new() -> Self {
        Self
    }
}

/// Exact `⌊total · part / whole⌋` without widening past `u128`.
///
/// `part` and `whole` are bounded by twice the basis-point precision, so
/// the split intermediates stay within `u128` for any `total`.
fn proportional_share(total: u128, part: u64, whole: u64) -> u128 {
    let part = part as u128;
    let whole = whole as u128;
    (total / whole) * part + (total % whole) * part / whole
}

impl FeeCalculator for FeeEngine {
    fn early_sell_tax_bps(&self, elapsed_secs: u64, schedule: &TaxSchedule) -> u64 {
        for (breakpoint, rate) in schedule.brackets() {
            if elapsed_secs < breakpoint {
                return rate;
            }
        }
        0
    }

    fn calculate_fees(
        &self,
        amount: u128,
        elapsed_secs: u64,
        apply_tax: bool,
        config: &FeeConfig,
    ) -> FeeBreakdown {
        if amount == 0 {
            return FeeBreakdown::free(0);
        }

        let flat_bps = config.flat_fee_bps;
        let tax_bps = if apply_tax && config.tax_enabled {
            self.early_sell_tax_bps(elapsed_secs, &config.schedule)
        } else {
            0
        };

        let combined_bps = flat_bps + tax_bps;
        if combined_bps == 0 {
            return FeeBreakdown::free(amount);
        }

        let total_bps = combined_bps.min(config.fee_cap_bps);
        let total = bps_of(amount, total_bps);
        // Splitting the capped total proportionally keeps flat + tax == total
        // exact; computing the parts independently would not.
        let flat_fee = proportional_share(total, flat_bps, combined_bps);
        let tax = total - flat_fee;

        trace!(
            amount,
            elapsed_secs,
            flat_bps,
            tax_bps,
            total_bps,
            "fee breakdown computed"
        );

        FeeBreakdown {
            flat_fee,
            tax,
            total,
            net: amount - total,
            total_bps,
        }
    }
}
