//! Error types for the Ember token.
use crate::address::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("null address")] NullAddress,
    #[error("burn sink cannot be the sender")] SenderIsBurnSink,
    #[error("amount must be positive")] ZeroAmount,
    #[error("tax schedule breakpoints must be strictly increasing")] NonIncreasingBreakpoints,
    #[error("tax schedule length mismatch: {breakpoints} breakpoints, {rates} rates")] ScheduleLengthMismatch { breakpoints: usize, rates: usize },
    #[error("rate out of range: {0} bps")] RateOutOfRange(u64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("already launched at {at}")] AlreadyLaunched { at: u64 },
    #[error("account already excluded: {0}")] AlreadyExcluded(Address),
    #[error("account not excluded: {0}")] NotExcluded(Address),
    #[error("transfers are paused")] TransfersPaused,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("total supply must be positive")] ZeroTotalSupply,
    #[error("amount out of range: {amount} > {max}")] AmountOutOfRange { amount: u128, max: u128 },
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u128, need: u128 },
    #[error("rate denominator would be non-positive")] InvariantViolation,
    #[error("fee pool underflow: requested {requested}, pooled {pooled}")] FeePoolUnderflow { requested: u128, pooled: u128 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error(transparent)] Validation(#[from] ValidationError),
    #[error(transparent)] State(#[from] StateError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error("amount {amount} exceeds transaction limit {limit}")] LimitExceeded { amount: u128, limit: u128 },
    #[error("reentrant call rejected")] ReentrancyRejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_display() {
        let errors: Vec<TokenError> = vec![
            ValidationError::NullAddress.into(),
            StateError::AlreadyLaunched { at: 1_700_000_000 }.into(),
            LedgerError::InvariantViolation.into(),
            TokenError::LimitExceeded { amount: 10, limit: 5 },
            TokenError::ReentrancyRejected,
        ];
        for e in &errors {
            assert!(!format!("{e}").is_empty());
        }
    }

    #[test]
    fn transparent_wrapping_preserves_message() {
        let inner = LedgerError::InsufficientBalance { have: 1, need: 2 };
        let outer: TokenError = inner.clone().into();
        assert_eq!(format!("{outer}"), format!("{inner}"));
    }

    #[test]
    fn error_eq() {
        assert_eq!(TokenError::ReentrancyRejected, TokenError::ReentrancyRejected);
        assert_ne!(
            TokenError::LimitExceeded { amount: 1, limit: 5 },
            TokenError::LimitExceeded { amount: 2, limit: 5 },
        );
    }
}
