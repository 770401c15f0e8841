//! Execution subsystem.
//!
//! # Data Flow
//! ```text
//! Client::execute(envelope)
//!     → engine.rs (operator signing, attempt loop)
//!     → NodeList::advance → Network::node → Node::is_healthy
//!     → Transport::send (bounded by the attempt timeout)
//!     → Status::classify → success / retry with backoff / fail
//! ```

pub mod cancel;
pub mod engine;
pub mod outcome;
pub mod transport;

pub use cancel::{CancelSignal, Cancellation};
pub use engine::Client;
pub use outcome::{ExecuteError, ExecuteResult, TransactionResponse};
pub use transport::{Transport, TransportError, TransportResponse};
