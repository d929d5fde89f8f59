//! Shared utilities
//!
//! Currently the bounded retry combinator used by the readiness poller.

pub mod retry;
