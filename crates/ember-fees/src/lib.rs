//! # ember-fees
//! Pure fee computation for the Ember token: the flat transfer fee, the
//! time-decaying early-sell tax, and the combined-fee ceiling.

pub mod engine;

pub use engine::FeeEngine;
