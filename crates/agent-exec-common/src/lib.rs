#![deny(clippy::all)]

pub mod error_codes;
mod sync;
mod telemetry;

pub use error_codes::ErrorCategory;
pub use sync::mutex_lock_or_recover;
pub use sync::rwlock_read_or_recover;
pub use sync::rwlock_write_or_recover;
pub use telemetry::TelemetryGuard;
pub use telemetry::init_tracing;
