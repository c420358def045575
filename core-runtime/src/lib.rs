//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the other crates:
//! - Logging and tracing setup (with redaction helpers for customer data)
//! - Event bus for decoupled state-change notifications
//!
//! This crate establishes the async runtime patterns, logging conventions,
//! and event broadcasting mechanisms used throughout the system.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
