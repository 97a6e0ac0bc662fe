//! # Provisioning Model
//!
//! What the operator needs to bring a system up: the BMC MAC address, the BMC login and,
//! when the order includes one, a license key.
//!
//! A [`ProvisioningRecord`] only exists for a system the scheduler knows about. A system
//! that could not be resolved produces *no record* rather than a record full of blanks.

use std::fmt;

use crate::serial::SystemSerial;

/// Fixed BMC administrative user shipped on every system.
pub const ADMIN_USER: &str = "ADMIN";

/// Rendered in place of a value the scheduler could not supply.
pub const UNAVAILABLE: &str = "N/A";

/// Opaque identifier the scheduler assigns to a physical system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SystemId(String);

impl SystemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// License part number a system is entitled to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartNumber(String);

impl PartNumber {
    pub fn new(partno: impl Into<String>) -> Self {
        Self(partno.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reserved license key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LicenseKey(String);

impl LicenseKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lot-serial fields scanned into the scheduler during production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LotField {
    MacAddress,
    IpmiPassword,
}

impl LotField {
    /// Rule name the scheduler filters lot-serial entries by.
    pub fn rule(&self) -> &'static str {
        match self {
            LotField::MacAddress => "MAC Address",
            LotField::IpmiPassword => "IPMI Password",
        }
    }
}

impl fmt::Display for LotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule())
    }
}

/// A field that is either known or explicitly unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Known(String),
    Unavailable,
}

impl FieldValue {
    pub fn as_known(&self) -> Option<&str> {
        match self {
            FieldValue::Known(value) => Some(value),
            FieldValue::Unavailable => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, FieldValue::Known(_))
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(value) if !value.trim().is_empty() => FieldValue::Known(value),
            _ => FieldValue::Unavailable,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_known().unwrap_or(UNAVAILABLE))
    }
}

/// One report row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRecord {
    pub system_id: SystemId,
    pub serial: SystemSerial,
    /// Node position inside a multi-node chassis, 1-based. `None` for a regular system.
    pub node: Option<u16>,
    pub mac: FieldValue,
    pub user: &'static str,
    pub password: FieldValue,
    pub license_key: Option<LicenseKey>,
}

impl ProvisioningRecord {
    pub fn new(system_id: SystemId, serial: SystemSerial) -> Self {
        Self {
            system_id,
            serial,
            node: None,
            mac: FieldValue::Unavailable,
            user: ADMIN_USER,
            password: FieldValue::Unavailable,
            license_key: None,
        }
    }

    pub fn with_node(mut self, node: u16) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_mac(mut self, mac: FieldValue) -> Self {
        self.mac = mac;
        self
    }

    pub fn with_password(mut self, password: FieldValue) -> Self {
        self.password = password;
        self
    }

    pub fn with_license_key(mut self, key: Option<LicenseKey>) -> Self {
        self.license_key = key;
        self
    }

    /// Report ordering: serial first, then node.
    pub fn sort_key(&self) -> (&SystemSerial, Option<u16>) {
        (&self.serial, self.node)
    }
}

/// Records collected by one orchestrator run, plus what happened to the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    records: Vec<ProvisioningRecord>,
    /// Workflows that found no such system.
    pub missing: usize,
    /// Workflows that aborted on a scheduler error.
    pub failed: usize,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ProvisioningRecord) {
        self.records.push(record);
    }

    /// Sorts the records by serial. Called once every workflow has terminated.
    pub fn finalize(mut self) -> Self {
        self.records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self
    }

    pub fn records(&self) -> &[ProvisioningRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ProvisioningRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
