//! Admission control for the serialized resource.
//!
//! The gateway never queues without bound: every caller that wants fresh data
//! must first obtain a slot from the [`AdmissionLimiter`], waiting at most the
//! current load level's admission timeout. Callers that cannot get a slot in
//! time are rejected (HTTP 429) instead of piling up.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`AdmissionLimiter`] | Bounded-concurrency gate with live capacity changes |
//! | [`AdmissionPermit`] | RAII slot, released on drop |
//! | [`AdmissionSnapshot`] | Capacity / inflight counters for health reporting |
//!
//! ```rust
//! use quote_gate::resilience::AdmissionLimiter;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = AdmissionLimiter::new(1);
//! let permit = limiter.admit(Duration::from_millis(50)).await.unwrap();
//! assert!(limiter.admit(Duration::from_millis(10)).await.is_err());
//! drop(permit);
//! assert_eq!(limiter.snapshot().inflight, 0);
//! # }
//! ```

pub mod admission;

pub use admission::{AdmissionLimiter, AdmissionPermit, AdmissionSnapshot, AdmissionTimedOut};
