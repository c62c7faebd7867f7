//! Shared test stores and clocks for Vellum.

mod clock;
mod store;

pub use clock::{FixedClock, SteppingClock};
pub use store::{FailingStore, InMemoryStore};
