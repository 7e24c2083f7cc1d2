//! # ember-core
//! Foundation types for the Ember token: addresses, constants, the error
//! taxonomy, events, configuration, and the reflective balance ledger.

pub mod address;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod ledger;
pub mod math;
pub mod traits;
