//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! network / execution produce:
//!     → tracing events (structured fields, per-execution log id)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, plain or JSON)
//!     → whatever metrics recorder the application installs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Log id flows through every attempt of an execution
//! - Key material is never logged

pub mod logging;
pub mod metrics;
