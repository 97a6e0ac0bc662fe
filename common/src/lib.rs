//! # scli Common
//!
//! Shared vocabulary for the `scli` workspace.
//!
//! ## Contents
//! * **[`serial`]**: Order and system serial numbers (query form vs display form).
//! * **[`provisioning`]**: The data a workflow produces for one physical system.
//! * **[`scheduler`]**: The outbound port to the remote inventory/scheduling service.
//! * **[`config`]**: Runtime configuration and the API key it carries.
//!
//! Nothing in here performs IO except [`config::ConfigLoader`], which reads files and
//! the process environment once at startup.

pub mod config;
pub mod provisioning;
pub mod scheduler;
pub mod serial;
