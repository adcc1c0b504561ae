//! HTTP fetch layer: bounded GET-with-retry used by every other component.
//!
//! The client owns timeout, TLS verification policy, and exponential backoff.
//! Responses come back with their status and pagination headers attached so
//! the classifier and pagination engine can branch on them; only transient
//! failures that survive the whole retry budget surface as errors.

mod client;
mod error;
mod retry;
mod shape;

pub use client::{
    ApiClient, FetchedPage, REQUEST_USER_AGENT, TOTAL_ITEMS_HEADER, TOTAL_PAGES_HEADER,
};
pub use error::FetchError;
pub use retry::{FailureKind, RetryDecision, RetryPolicy, classify_error, classify_status};
pub use shape::BodyShape;
