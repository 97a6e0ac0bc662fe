//! # Scheduler Port
//!
//! The contract between the batch logic and the remote inventory/scheduling service.
//!
//! Every call is one round trip and one attempt. A lookup that legitimately finds nothing
//! returns `Ok(None)`; only real failures come back as [`SchedulerError`].
//!
//! Implementations must be safe to call from many workflows at once.

use async_trait::async_trait;
use thiserror::Error;

use crate::provisioning::{LicenseKey, LotField, PartNumber, SystemId};
use crate::serial::SystemSerial;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The service rejected the API key (HTTP 401).
    #[error("authentication to the scheduler failed")]
    Authentication,
    /// The request never produced a response (refused, reset, timed out).
    #[error("unable to reach the scheduler: {0}")]
    Transport(String),
    /// A response arrived but could not be understood.
    #[error("malformed scheduler response: {0}")]
    Malformed(String),
    /// The service answered with `status: "error"`.
    #[error("scheduler returned an error: {0}")]
    Rejected(String),
}

impl SchedulerError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, SchedulerError::Authentication)
    }
}

/// A system matched by [`Scheduler::search_system`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemMatch {
    pub system_id: SystemId,
    pub serial: String,
    pub message: Option<String>,
}

#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Resolves a system serial to the scheduler's identifier.
    async fn lookup_identifier(
        &self,
        serial: &SystemSerial,
    ) -> Result<Option<SystemId>, SchedulerError>;

    /// Reads the first entry scanned into a lot-serial field. A blank entry is `None`.
    async fn lookup_field(
        &self,
        system: &SystemId,
        field: LotField,
    ) -> Result<Option<String>, SchedulerError>;

    /// Returns the license part number if the system is entitled to a key.
    async fn check_license_eligibility(
        &self,
        system: &SystemId,
    ) -> Result<Option<PartNumber>, SchedulerError>;

    /// Reserves a key for the given BMC MAC address.
    async fn reserve_license_key(
        &self,
        system: &SystemId,
        mac: &str,
        part: &PartNumber,
    ) -> Result<LicenseKey, SchedulerError>;

    /// Marks the reserved key as applied.
    async fn apply_license_key(&self, system: &SystemId, mac: &str) -> Result<(), SchedulerError>;

    /// Reads every entry of a lot-serial field, in scan order.
    ///
    /// Multi-node chassis carry one entry per node, so blank entries stay in place as
    /// `None`. The default suits services that only ever hold a single value.
    async fn lookup_field_values(
        &self,
        system: &SystemId,
        field: LotField,
    ) -> Result<Vec<Option<String>>, SchedulerError> {
        Ok(self.lookup_field(system, field).await?.into_iter().map(Some).collect())
    }

    /// Finds the system that contains the given component serials.
    async fn search_system(
        &self,
        _component_serials: &[String],
    ) -> Result<Option<SystemMatch>, SchedulerError> {
        Ok(None)
    }
}
