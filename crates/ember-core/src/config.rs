//! Fee and limit configuration.
//!
//! Config structs are owned by the token instance and mutated only through
//! its admin surface. Every mutation validates fully before anything is
//! written, so a rejected update leaves the previous configuration intact.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::constants::{
    BPS_PRECISION, DEFAULT_FLAT_FEE_BPS, EARLY_MAX_TX_BPS, FEE_CAP_BPS, LAUNCH_WINDOW_SECS,
    SELL_TAX_BREAKPOINTS_SECS, SELL_TAX_RATES_BPS, STANDARD_MAX_TX_BPS,
};
use crate::error::ValidationError;

/// Time-decaying early-sell tax schedule.
///
/// `breakpoints_secs` must be strictly increasing and paired one-to-one with
/// `rates_bps`. Elapsed time strictly below a breakpoint selects its rate;
/// elapsed time at or past the last breakpoint is untaxed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSchedule {
    breakpoints_secs: Vec<u64>,
    rates_bps: Vec<u64>,
}

impl TaxSchedule {
    /// Validate and build a schedule. An empty schedule is valid and never taxes.
    pub fn new(breakpoints_secs: Vec<u64>, rates_bps: Vec<u64>) -> Result<Self, ValidationError> {
        if breakpoints_secs.len() != rates_bps.len() {
            return Err(ValidationError::ScheduleLengthMismatch {
                breakpoints: breakpoints_secs.len(),
                rates: rates_bps.len(),
            });
        }
        for pair in breakpoints_secs.windows(2) {
            if pair[0] >= pair[1] {
                return Err(ValidationError::NonIncreasingBreakpoints);
            }
        }
        for &rate in &rates_bps {
            if rate > BPS_PRECISION {
                return Err(ValidationError::RateOutOfRange(rate));
            }
        }
        Ok(Self {
            breakpoints_secs,
            rates_bps,
        })
    }

    /// Breakpoint/rate pairs in ascending breakpoint order.
    pub fn brackets(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.breakpoints_secs
            .iter()
            .copied()
            .zip(self.rates_bps.iter().copied())
    }

    pub fn breakpoints_secs(&self) -> &[u64] {
        &self.breakpoints_secs
    }

    pub fn rates_bps(&self) -> &[u64] {
        &self.rates_bps
    }
}

impl Default for TaxSchedule {
    fn default() -> Self {
        Self {
            breakpoints_secs: SELL_TAX_BREAKPOINTS_SECS.to_vec(),
            rates_bps: SELL_TAX_RATES_BPS.to_vec(),
        }
    }
}

/// Fee parameters read by the fee engine during a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Flat fee in basis points, applied to every non-exempt transfer.
    pub flat_fee_bps: u64,
    /// Ceiling on the combined flat fee + tax, basis points.
    pub fee_cap_bps: u64,
    /// Early-sell tax schedule.
    pub schedule: TaxSchedule,
    /// Global tax switch; one-way disableable.
    pub tax_enabled: bool,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            flat_fee_bps: DEFAULT_FLAT_FEE_BPS,
            fee_cap_bps: FEE_CAP_BPS,
            schedule: TaxSchedule::default(),
            tax_enabled: true,
        }
    }
}

/// Phased transaction-size limit parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Cap before and during the launch window, bps of total supply.
    pub early_max_tx_bps: u64,
    /// Cap after the launch window, bps of total supply.
    pub standard_max_tx_bps: u64,
    /// Length of the restrictive window after launch, seconds.
    pub launch_window_secs: u64,
    /// Feature switch; one-way disableable.
    pub enabled: bool,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            early_max_tx_bps: EARLY_MAX_TX_BPS,
            standard_max_tx_bps: STANDARD_MAX_TX_BPS,
            launch_window_secs: LAUNCH_WINDOW_SECS,
            enabled: true,
        }
    }
}

/// Full token configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub fee: FeeConfig,
    pub limit: LimitConfig,
    /// Recipient of the flat-fee share. Must not be null.
    pub beneficiary: Address,
}

impl TokenConfig {
    /// Default configuration with the given flat-fee beneficiary.
    pub fn with_beneficiary(beneficiary: Address) -> Self {
        Self {
            fee: FeeConfig::default(),
            limit: LimitConfig::default(),
            beneficiary,
        }
    }
}
