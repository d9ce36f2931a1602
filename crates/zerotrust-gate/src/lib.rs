//! Request-boundary integration for zero-trust sealed envelopes.
//!
//! Framework-agnostic: handlers pass in the decoded request fields as a
//! JSON object map and map a [`Rejection`] to their own response type.

pub mod error;
pub mod gate;

pub use error::{GateError, Rejection, REJECTION_MESSAGE, REJECTION_STATUS};
pub use gate::{parse_client_public_key, Fields, SealGate, RESPONSE_FIELD};
