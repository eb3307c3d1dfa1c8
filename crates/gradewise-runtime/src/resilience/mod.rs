//! Resilience patterns for gradewise-runtime.
//!
//! This module provides:
//! - Fixed-delay retry around upstream attempts
//! - The rate-limit fallback strategy

mod fallback;
mod retry;

pub use fallback::{matches_rate_limit_signature, FallbackStrategy};
pub use retry::RetryPolicy;
