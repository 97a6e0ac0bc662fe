//! HTTP implementation of the [`Scheduler`](scli_common::scheduler::Scheduler) port.
//!
//! The remote service exposes a single JSON endpoint. Every operation is a POST whose
//! body names the operation in its `type` field; every response carries a `status`.

mod http;
mod wire;

pub use http::{API_KEY_HEADER, HttpScheduler};
