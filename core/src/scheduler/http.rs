use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scli_common::config::{ApiKey, Config};
use scli_common::provisioning::{LicenseKey, LotField, PartNumber, SystemId};
use scli_common::scheduler::{Scheduler, SchedulerError, SystemMatch};
use scli_common::serial::SystemSerial;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::wire::{
    self, AllocateKeyBody, LotSerialBody, MessageBody, Request, SearchBody, SumLookupBody,
    SystemIdBody,
};

pub const API_KEY_HEADER: &str = "SCC-API-Key";

/// Talks to the scheduler over HTTP. One POST per call, no retries.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Clone)]
pub struct HttpScheduler {
    client: Client,
    endpoint: Url,
    api_key: ApiKey,
}

impl fmt::Debug for HttpScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpScheduler")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpScheduler {
    pub fn new(config: &Config) -> Result<Self, SchedulerError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| SchedulerError::Transport(format!("unable to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send(&self, request: &Request<'_>) -> Result<Value, SchedulerError> {
        debug!("POST {} ({})", self.endpoint, request.name());

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| SchedulerError::Transport(describe(&e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(SchedulerError::Authentication);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SchedulerError::Transport(describe(&e)))?;

        wire::parse_envelope(&body)
    }

    async fn lot_serial(
        &self,
        system: &SystemId,
        field: LotField,
    ) -> Result<LotSerialBody, SchedulerError> {
        let request = Request::LotSerial {
            system: system.as_str(),
            rule: field.rule(),
        };
        wire::decode(self.send(&request).await?)
    }
}

/// reqwest errors carry the URL; the chain below it says what actually went wrong.
fn describe(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl Scheduler for HttpScheduler {
    /// The service answers an unknown serial with `status: "error"`, which is a miss here.
    async fn lookup_identifier(
        &self,
        serial: &SystemSerial,
    ) -> Result<Option<SystemId>, SchedulerError> {
        let request = Request::SystemId {
            serial: serial.query_form(),
        };
        let body: SystemIdBody = match self.send(&request).await {
            Ok(value) => wire::decode(value)?,
            Err(SchedulerError::Rejected(message)) => {
                debug!("{serial}: {message}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(body.systemid.as_ref().and_then(wire::scalar).map(SystemId::new))
    }

    async fn lookup_field(
        &self,
        system: &SystemId,
        field: LotField,
    ) -> Result<Option<String>, SchedulerError> {
        Ok(self.lot_serial(system, field).await?.first())
    }

    async fn lookup_field_values(
        &self,
        system: &SystemId,
        field: LotField,
    ) -> Result<Vec<Option<String>>, SchedulerError> {
        Ok(self.lot_serial(system, field).await?.values())
    }

    async fn check_license_eligibility(
        &self,
        system: &SystemId,
    ) -> Result<Option<PartNumber>, SchedulerError> {
        let request = Request::SumLookup {
            system: system.as_str(),
        };
        let body: SumLookupBody = wire::decode(self.send(&request).await?)?;
        Ok(body.part_number().map(PartNumber::new))
    }

    async fn reserve_license_key(
        &self,
        system: &SystemId,
        mac: &str,
        part: &PartNumber,
    ) -> Result<LicenseKey, SchedulerError> {
        let request = Request::SumAllocateKey {
            system: system.as_str(),
            partno: part.as_str(),
            mac,
        };
        let body: AllocateKeyBody = wire::decode(self.send(&request).await?)?;

        body.productkey
            .as_ref()
            .and_then(wire::scalar)
            .map(LicenseKey::new)
            .ok_or_else(|| SchedulerError::Malformed("allocation response has no productkey".into()))
    }

    async fn apply_license_key(&self, system: &SystemId, mac: &str) -> Result<(), SchedulerError> {
        let request = Request::SumApplyKey {
            system: system.as_str(),
            mac,
        };
        let body: MessageBody = wire::decode(self.send(&request).await?)?;
        if let Some(message) = body.message {
            debug!("system {system}: {message}");
        }
        Ok(())
    }

    async fn search_system(
        &self,
        component_serials: &[String],
    ) -> Result<Option<SystemMatch>, SchedulerError> {
        let request = Request::SystemSearch {
            serials: component_serials,
        };
        let body: SearchBody = wire::decode(self.send(&request).await?)?;

        let Some(system_id) = body.systemid.as_ref().and_then(wire::scalar) else {
            return Ok(None);
        };

        Ok(Some(SystemMatch {
            system_id: SystemId::new(system_id),
            serial: body
                .serial
                .as_ref()
                .and_then(wire::scalar)
                .unwrap_or_default(),
            message: body.message,
        }))
    }
}
