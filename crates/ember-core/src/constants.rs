//! Protocol constants. All monetary values in base units (1 EMBER = 10^18 base units).

/// Base units per whole token.
pub const COIN: u128 = 1_000_000_000_000_000_000;

/// Default genesis supply: 100 billion EMBER, minted once.
pub const GENESIS_SUPPLY: u128 = 100_000_000_000 * COIN;

/// Denominator for all basis-point rates.
pub const BPS_PRECISION: u64 = 10_000;

/// Flat fee skimmed from every non-exempt transfer: 0.5%.
pub const DEFAULT_FLAT_FEE_BPS: u64 = 50;

/// Safety ceiling on the combined flat fee + early-sell tax: 5%.
pub const FEE_CAP_BPS: u64 = 500;

/// Early-sell tax brackets, seconds since launch. Strictly increasing.
pub const SELL_TAX_BREAKPOINTS_SECS: [u64; 3] = [86_400, 172_800, 259_200];

/// Early-sell tax rates per bracket: 3% / 2% / 1%, then zero.
pub const SELL_TAX_RATES_BPS: [u64; 3] = [300, 200, 100];

/// Transaction-size cap before and during the first launch window: 0.1% of supply.
pub const EARLY_MAX_TX_BPS: u64 = 10;

/// Transaction-size cap after the launch window: 0.5% of supply.
pub const STANDARD_MAX_TX_BPS: u64 = 50;

/// Length of the restrictive post-launch window, seconds.
pub const LAUNCH_WINDOW_SECS: u64 = 86_400;
