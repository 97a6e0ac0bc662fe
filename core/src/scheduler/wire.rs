use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use scli_common::scheduler::SchedulerError;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(super) enum Request<'a> {
    #[serde(rename = "SystemID")]
    SystemId { serial: String },
    #[serde(rename = "SystemGetDataLotSerial")]
    LotSerial { system: &'a str, rule: &'static str },
    SumLookup { system: &'a str },
    SumAllocateKey {
        system: &'a str,
        partno: &'a str,
        mac: &'a str,
    },
    SumApplyKey { system: &'a str, mac: &'a str },
    SystemSearch { serials: &'a [String] },
}

impl Request<'_> {
    pub(super) fn name(&self) -> &'static str {
        match self {
            Request::SystemId { .. } => "SystemID",
            Request::LotSerial { .. } => "SystemGetDataLotSerial",
            Request::SumLookup { .. } => "SumLookup",
            Request::SumAllocateKey { .. } => "SumAllocateKey",
            Request::SumApplyKey { .. } => "SumApplyKey",
            Request::SystemSearch { .. } => "SystemSearch",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SystemIdBody {
    pub systemid: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LotSerialBody {
    pub data: Option<Vec<LotSerialEntry>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LotSerialEntry {
    #[serde(rename = "LotSerial")]
    pub lot_serial: Option<Value>,
}

impl LotSerialBody {
    /// The first entry only, blank or not.
    pub fn first(self) -> Option<String> {
        self.data?.into_iter().next()?.lot_serial.as_ref().and_then(scalar)
    }

    /// Every entry in the order the service listed them. Blanks keep their position.
    pub fn values(self) -> Vec<Option<String>> {
        self.data
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.lot_serial.as_ref().and_then(scalar))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SumLookupBody {
    pub expected_licenses: Option<Value>,
    pub licenses: Option<Vec<LicenseEntry>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LicenseEntry {
    pub partno: Option<Value>,
}

impl SumLookupBody {
    pub fn part_number(self) -> Option<String> {
        if !self.expected_licenses.as_ref().is_some_and(truthy) {
            return None;
        }
        self.licenses?
            .into_iter()
            .next()?
            .partno
            .as_ref()
            .and_then(scalar)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AllocateKeyBody {
    pub productkey: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MessageBody {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchBody {
    pub systemid: Option<Value>,
    pub serial: Option<Value>,
    pub message: Option<String>,
}

/// Checks the `status` every response carries and hands back the whole document.
pub(super) fn parse_envelope(body: &[u8]) -> Result<Value, SchedulerError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| SchedulerError::Malformed(format!("response is not JSON: {e}")))?;

    let status = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| SchedulerError::Malformed("response carries no status".into()))?;

    if status.eq_ignore_ascii_case("error") {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message given");
        return Err(SchedulerError::Rejected(message.to_string()));
    }

    Ok(value)
}

pub(super) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, SchedulerError> {
    serde_json::from_value(value).map_err(|e| SchedulerError::Malformed(e.to_string()))
}

/// Identifiers and serials come back as strings or as bare numbers.
pub(super) fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
