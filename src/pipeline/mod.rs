//! Lead intake pipeline.
//!
//! Every submission, whatever transport it arrived on, flows through
//! [`process_lead_submission`]: method gate, parse, honeypot, rate limit,
//! validation, persistence, then notification. Transport adapters only
//! translate the outcome.

pub mod processor;
pub mod rules;
pub mod types;

pub use processor::{IntakeDeps, process_lead_submission, process_submission};
