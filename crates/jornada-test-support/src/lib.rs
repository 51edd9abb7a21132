//! Shared test doubles for the Jornada conversational funnel.

mod clock;
mod generation;
mod pacing;
mod store;

pub use clock::FixedClock;
pub use generation::{FailingGenerator, ScriptedGenerator};
pub use pacing::InstantPacer;
pub use store::{FailingSessionStore, InMemorySessionStore};
