//! Lead Intake: contact-form submissions in, stored leads and notification
//! emails out.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod ratelimit;
pub mod store;
