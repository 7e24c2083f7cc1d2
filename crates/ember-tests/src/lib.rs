//! Integration and adversarial test suite for the Ember token.
//!
//! The suites in `tests/` exercise the full pipeline (ledger, fee engine
//! and token composed as in production) under realistic and hostile
//! sequences: conservation over random activity, the canonical fee
//! scenarios, and attacks on the guard, limits and state machine.

pub mod helpers;
