//! # scli Core
//!
//! The batch retrieval pipeline:
//!
//! ```text
//! expander ──► orchestrator ──► N × workflow ──► report
//!                                   │
//!                                   └── Scheduler port (HTTP adapter in `scheduler`)
//! ```
//!
//! * **[`expander`]**: Turns a base serial into the list of systems to process.
//! * **[`workflow`]**: Resolves one system into a [`ProvisioningRecord`] or nothing.
//! * **[`orchestrator`]**: Runs workflows on a fixed pool of workers and collects results.
//! * **[`report`]**: Renders the collected records as a fixed-width table.
//! * **[`scheduler`]**: The HTTP implementation of the scheduler port.
//!
//! [`ProvisioningRecord`]: scli_common::provisioning::ProvisioningRecord

pub mod expander;
pub mod orchestrator;
pub mod report;
pub mod scheduler;
pub mod workflow;
