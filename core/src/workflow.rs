//! Per-system workflow.
//!
//! Turns one system serial into a [`ProvisioningRecord`], or into nothing when the
//! scheduler does not know the system.
//!
//! Only the identity lookup can fail the workflow. Every later step degrades instead:
//! a missing or failed field becomes [`FieldValue::Unavailable`], a failed license step
//! leaves the key off the record.
//!
//! Steps run one after another, so a workflow has at most one remote call in flight.

use std::sync::Arc;

use scli_common::provisioning::{
    FieldValue, LicenseKey, LotField, PartNumber, ProvisioningRecord, SystemId,
};
use scli_common::scheduler::{Scheduler, SchedulerError};
use scli_common::serial::SystemSerial;
use thiserror::Error;
use tracing::debug;

/// One unit of work for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemJob {
    pub serial: SystemSerial,
    /// Already resolved during discovery, if known.
    pub system_id: Option<SystemId>,
}

impl SystemJob {
    pub fn new(serial: SystemSerial) -> Self {
        Self {
            serial,
            system_id: None,
        }
    }

    pub fn resolved(serial: SystemSerial, system_id: SystemId) -> Self {
        Self {
            serial,
            system_id: Some(system_id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowKind {
    /// One record per system.
    #[default]
    Single,
    /// One record per node of a multi-node chassis.
    MultiNode,
}

/// The identity lookup failed, so nothing else could be attempted.
#[derive(Debug, Error)]
#[error("system {serial}: identity lookup failed: {source}")]
pub struct WorkflowError {
    pub serial: SystemSerial,
    #[source]
    pub source: SchedulerError,
}

#[derive(Clone)]
pub struct ProvisioningWorkflow {
    scheduler: Arc<dyn Scheduler>,
}

impl ProvisioningWorkflow {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self { scheduler }
    }

    /// Runs the workflow of the given kind. An empty vector means "no such system".
    pub async fn execute(
        &self,
        job: SystemJob,
        kind: WorkflowKind,
    ) -> Result<Vec<ProvisioningRecord>, WorkflowError> {
        match kind {
            WorkflowKind::Single => Ok(self.run(job).await?.into_iter().collect()),
            WorkflowKind::MultiNode => self.run_multi_node(job).await,
        }
    }

    pub async fn run(&self, job: SystemJob) -> Result<Option<ProvisioningRecord>, WorkflowError> {
        let SystemJob { serial, system_id } = job;
        let Some(system_id) = self.resolve(&serial, system_id).await? else {
            return Ok(None);
        };

        let mac = self.field(&system_id, &serial, LotField::MacAddress).await;
        let password = self.field(&system_id, &serial, LotField::IpmiPassword).await;
        let part = self.eligibility(&system_id, &serial).await;

        let license_key = match part {
            Some(part) => self.license_key(&system_id, &serial, &mac, &part).await,
            None => None,
        };

        Ok(Some(
            ProvisioningRecord::new(system_id, serial)
                .with_mac(mac)
                .with_password(password)
                .with_license_key(license_key),
        ))
    }

    /// Multi-node chassis keep one MAC and one password per node in the same field.
    ///
    /// Values are paired by scan position; a blank entry leaves that node's value
    /// unavailable without shifting the nodes after it. Eligibility is checked once for
    /// the chassis, then a key is reserved for each node against that node's own MAC.
    pub async fn run_multi_node(
        &self,
        job: SystemJob,
    ) -> Result<Vec<ProvisioningRecord>, WorkflowError> {
        let SystemJob { serial, system_id } = job;
        let Some(system_id) = self.resolve(&serial, system_id).await? else {
            return Ok(Vec::new());
        };

        let macs = self.field_values(&system_id, &serial, LotField::MacAddress).await;
        let passwords = self.field_values(&system_id, &serial, LotField::IpmiPassword).await;
        let part = self.eligibility(&system_id, &serial).await;

        if macs.len() != passwords.len() {
            debug!(
                "{serial}: {} MAC addresses but {} passwords scanned",
                macs.len(),
                passwords.len()
            );
        }

        let nodes = macs.len().max(passwords.len()).max(1);
        let mut macs = macs.into_iter();
        let mut passwords = passwords.into_iter();
        let mut records = Vec::with_capacity(nodes);

        for node in 1..=nodes {
            let mac = FieldValue::from(macs.next().flatten());
            let password = FieldValue::from(passwords.next().flatten());
            let license_key = match &part {
                Some(part) => self.license_key(&system_id, &serial, &mac, part).await,
                None => None,
            };

            records.push(
                ProvisioningRecord::new(system_id.clone(), serial.clone())
                    .with_node(u16::try_from(node).unwrap_or(u16::MAX))
                    .with_mac(mac)
                    .with_password(password)
                    .with_license_key(license_key),
            );
        }

        Ok(records)
    }

    async fn resolve(
        &self,
        serial: &SystemSerial,
        known: Option<SystemId>,
    ) -> Result<Option<SystemId>, WorkflowError> {
        if let Some(system_id) = known {
            return Ok(Some(system_id));
        }

        match self.scheduler.lookup_identifier(serial).await {
            Ok(Some(system_id)) => {
                debug!("{serial}: resolved to system id {system_id}");
                Ok(Some(system_id))
            }
            Ok(None) => {
                debug!("{serial}: not found in the scheduler");
                Ok(None)
            }
            Err(source) => Err(WorkflowError {
                serial: serial.clone(),
                source,
            }),
        }
    }

    async fn field(&self, system_id: &SystemId, serial: &SystemSerial, field: LotField) -> FieldValue {
        match self.scheduler.lookup_field(system_id, field).await {
            Ok(value) => {
                if value.is_none() {
                    debug!("{serial}: no data for '{field}'");
                }
                FieldValue::from(value)
            }
            Err(e) => {
                debug!("{serial}: lookup of '{field}' failed: {e}");
                FieldValue::Unavailable
            }
        }
    }

    async fn field_values(
        &self,
        system_id: &SystemId,
        serial: &SystemSerial,
        field: LotField,
    ) -> Vec<Option<String>> {
        match self.scheduler.lookup_field_values(system_id, field).await {
            Ok(values) => values,
            Err(e) => {
                debug!("{serial}: lookup of all '{field}' values failed: {e}");
                Vec::new()
            }
        }
    }

    async fn eligibility(&self, system_id: &SystemId, serial: &SystemSerial) -> Option<PartNumber> {
        match self.scheduler.check_license_eligibility(system_id).await {
            Ok(Some(part)) => Some(part),
            Ok(None) => {
                debug!("{serial}: has no license assigned");
                None
            }
            Err(e) => {
                debug!("{serial}: license eligibility check failed: {e}");
                None
            }
        }
    }

    /// Reserves a key and marks it applied. The key is kept only if both calls succeed.
    async fn license_key(
        &self,
        system_id: &SystemId,
        serial: &SystemSerial,
        mac: &FieldValue,
        part: &PartNumber,
    ) -> Option<LicenseKey> {
        let Some(mac) = mac.as_known() else {
            debug!("{serial}: entitled to {part} but its MAC address is unavailable, not reserving a key");
            return None;
        };

        let key = match self.scheduler.reserve_license_key(system_id, mac, part).await {
            Ok(key) => key,
            Err(e) => {
                debug!("{serial}: reserving a {part} key failed: {e}");
                return None;
            }
        };

        match self.scheduler.apply_license_key(system_id, mac).await {
            Ok(()) => Some(key),
            Err(e) => {
                debug!("{serial}: marking the {part} key as applied failed: {e}");
                None
            }
        }
    }
}
