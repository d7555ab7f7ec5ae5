//! compendium-limiter
//!
//! Admission control for calls to rate-limited upstream services: a fixed
//! rate, a fixed number of concurrent tasks and unbounded retry of tasks the
//! service turned away.

pub mod backoff;
pub mod controller;
pub mod error;

pub use backoff::BackoffPolicy;
pub use controller::AdmissionController;
pub use error::AdmissionError;
