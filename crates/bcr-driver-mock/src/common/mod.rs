//! Common infrastructure for the mock scanner.
//!
//! - **errors**: Error injection framework
//! - **rng**: Seeded random number generator
//! - **timing**: Simulated service latency

pub mod errors;
pub mod rng;
pub mod timing;

pub use errors::{ops, ErrorConfig, ErrorScenario};
pub use rng::MockRng;
pub use timing::TimingConfig;
