//! # ember-token
//! The transfer pipeline: a [`Token`] instance composing the reflective
//! ledger and the fee engine behind one lock, with the reentrancy guard,
//! launch state machine, phased transaction-size limits and the admin
//! surface.

pub mod guard;
pub mod token;

pub use guard::ReentrancyGuard;
pub use token::{Token, TokenSnapshot, TransferOutcome};
