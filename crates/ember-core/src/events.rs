//! Event model: notifications emitted after state is finalized.
//!
//! The token never calls collaborators mid-mutation; events describe state
//! that has already been committed. The [`EventSink`] trait is the seam for
//! the hosting environment's event relay.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// A committed state change worth notifying collaborators about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEvent {
    /// A transfer completed, including its fee split.
    TransferExecuted {
        from: Address,
        to: Address,
        amount: u128,
        flat_fee: u128,
        tax: u128,
    },
    /// A fee was absorbed into the pool; `new_rate` is the conversion rate
    /// after the absorption and any routing.
    FeeAbsorbed { amount: u128, new_rate: u128 },
    /// An account left the reflection space.
    AccountExcluded(Address),
    /// An account re-entered the reflection space.
    AccountIncluded(Address),
    /// The one-time launch transition, explicit or bootstrapped.
    Launched { timestamp: u64 },
}

/// Receiver for [`TokenEvent`]s.
///
/// Called only after all state for the operation is finalized. A sink that
/// calls back into the transfer pipeline is rejected by the reentrancy guard.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TokenEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: TokenEvent) {}
}

/// Sink that records events for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TokenEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in emission order.
    pub fn events(&self) -> Vec<TokenEvent> {
        self.events.lock().clone()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: TokenEvent) {
        self.events.lock().push(event);
    }
}
