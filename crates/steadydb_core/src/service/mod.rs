//! Caller-facing services over the access policies.
//!
//! # Responsibility
//! - Turn a `Policy` value into a composed operation and run it.
//! - Keep callers decoupled from individual policy wrappers.

pub mod resilient;
