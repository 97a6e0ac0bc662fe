//! Turns a base serial into the list of systems to process.

use std::ops::Range;
use std::sync::Arc;

use scli_common::scheduler::{Scheduler, SchedulerError};
use scli_common::serial::{BaseSerial, SerialError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::workflow::SystemJob;

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error(transparent)]
    Serial(#[from] SerialError),
    #[error("invalid unit range {start}..{end}: units start at 1")]
    InvalidRange { start: u32, end: u32 },
    #[error("discovery of {base} stopped at unit {unit}: {source}")]
    Scheduler {
        base: BaseSerial,
        unit: u32,
        #[source]
        source: SchedulerError,
    },
}

/// How the systems of an order are enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandMode {
    /// Probe units 1, 2, ... until the first one the scheduler does not know.
    DiscoverAll,
    /// Half-open range of units, taken as given.
    Range { start: u32, end: u32 },
}

pub struct SerialExpander {
    scheduler: Arc<dyn Scheduler>,
}

impl SerialExpander {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self { scheduler }
    }

    pub async fn expand(&self, base: &BaseSerial, mode: &ExpandMode) -> Result<Vec<SystemJob>, ExpandError> {
        match mode {
            ExpandMode::DiscoverAll => self.discover_all(base).await,
            ExpandMode::Range { start, end } => range(base, *start..*end),
        }
    }

    /// Probes sequentially and stops at the first gap.
    ///
    /// Units found along the way keep their resolved identifier so the workflow does not
    /// look them up again. A rejected authentication aborts discovery; any other error
    /// ends it as if the unit did not exist.
    pub async fn discover_all(&self, base: &BaseSerial) -> Result<Vec<SystemJob>, ExpandError> {
        let mut jobs = Vec::new();

        for unit in 1.. {
            let serial = base.unit(unit)?;
            match self.scheduler.lookup_identifier(&serial).await {
                Ok(Some(system_id)) => {
                    debug!("Discovered {serial} as system {system_id}");
                    jobs.push(SystemJob::resolved(serial, system_id));
                }
                Ok(None) => {
                    debug!("No system at {serial}, discovery ends");
                    break;
                }
                Err(source) if source.is_authentication() => {
                    return Err(ExpandError::Scheduler {
                        base: base.clone(),
                        unit,
                        source,
                    });
                }
                Err(SchedulerError::Rejected(message)) => {
                    debug!("Lookup of {serial} rejected ({message}), discovery ends");
                    break;
                }
                Err(e) => {
                    warn!("Lookup of {serial} failed, discovery ends: {e}");
                    break;
                }
            }
        }

        Ok(jobs)
    }
}

/// Builds jobs for `units` without contacting the scheduler.
pub fn range(base: &BaseSerial, units: Range<u32>) -> Result<Vec<SystemJob>, ExpandError> {
    if units.start == 0 {
        return Err(ExpandError::InvalidRange {
            start: units.start,
            end: units.end,
        });
    }

    units
        .map(|unit| Ok(SystemJob::new(base.unit(unit)?)))
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
