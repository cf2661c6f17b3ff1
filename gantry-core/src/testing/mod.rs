//! Injectable providers for process-level dependencies.
//!
//! Resolvers read the environment, generate identifiers and check token
//! expiry through these traits, so tests can swap in deterministic mocks
//! while production wiring uses the real implementations.

mod clock;
mod env;
mod uuid;

pub use clock::{ClockProvider, MockClock, RealClock};
pub use env::{EnvProvider, MockEnv, RealEnv};
pub use uuid::{MockUuid, RealUuid, UuidProvider};
