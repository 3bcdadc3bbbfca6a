//! Cross-cutting utilities: errors, clock, id generation, shutdown.

pub mod clock;
pub mod errors;
pub mod ids;
pub mod shutdown;

pub use clock::{Clock, FakeClock, SystemClock};
pub use errors::{DomainError, DomainResult, InfraError, InfraResult};
pub use ids::generate_id;
pub use shutdown::ShutdownSignal;
