//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt returns a retryable status:
//!     → backoff.rs (delay before the next attempt)
//! Node fails at transport level:
//!     → backoff.rs (per-node readmission delay, see network::node)
//! ```
//!
//! # Design Decisions
//! - Delays carry no jitter
//! - Every attempt is bounded by a timeout (see execution)

pub mod backoff;
