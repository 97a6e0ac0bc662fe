//! # Serial Number Model
//!
//! An order ships one or more physical systems that share a **base serial**
//! (e.g. `1098591`). Each system is addressed as `<base>-<unit>`.
//!
//! The same system has two spellings:
//! * **Query form** (`1098591-1`): what the scheduler's lookup understands. No leading zeros.
//! * **Display form** (`1098591-01`): what production labels and reports use. Unit padded to 2 digits.
//!
//! Both parse into the same [`SystemSerial`], which compares by `(base, unit)`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const DISPLAY_WIDTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerialError {
    #[error("serial number is empty")]
    Empty,
    #[error("invalid base serial '{0}': only letters and digits are allowed")]
    InvalidBase(String),
    #[error("invalid unit '{unit}' in serial '{serial}'")]
    InvalidUnit { serial: String, unit: String },
    #[error("unit number must be 1 or greater in serial '{0}'")]
    ZeroUnit(String),
}

/// The order-level serial shared by every system in a multi-unit order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaseSerial(String);

impl BaseSerial {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Addresses the `unit`-th system of this order.
    pub fn unit(&self, unit: u32) -> Result<SystemSerial, SerialError> {
        SystemSerial::new(self.clone(), unit)
    }
}

impl FromStr for BaseSerial {
    type Err = SerialError;

    /// Accepts either a bare base (`1098591`) or any system serial of the order
    /// (`1098591-03`), in which case the unit part is dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let base = trimmed.split_once('-').map_or(trimmed, |(base, _)| base);
        parse_base(base)
    }
}

impl fmt::Display for BaseSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One physical system within an order.
///
/// Ordering is numeric on the unit within a base, so `1000-2` sorts before `1000-10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemSerial {
    base: BaseSerial,
    unit: u32,
}

impl SystemSerial {
    pub fn new(base: BaseSerial, unit: u32) -> Result<Self, SerialError> {
        if unit == 0 {
            return Err(SerialError::ZeroUnit(format!("{base}-{unit}")));
        }
        Ok(Self { base, unit })
    }

    pub fn base(&self) -> &BaseSerial {
        &self.base
    }

    pub fn unit(&self) -> u32 {
        self.unit
    }

    /// `1098591-1`
    pub fn query_form(&self) -> String {
        format!("{}-{}", self.base, self.unit)
    }

    /// `1098591-01`
    pub fn display_form(&self) -> String {
        format!("{}-{:0width$}", self.base, self.unit, width = DISPLAY_WIDTH)
    }
}

impl FromStr for SystemSerial {
    type Err = SerialError;

    /// Parses any spelling of a system serial.
    ///
    /// * `1098591` is a single-system order and means unit 1.
    /// * `1098591-1` and `1098591-01` are the same system.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let Some((base_str, unit_str)) = trimmed.split_once('-') else {
            return Ok(Self {
                base: parse_base(trimmed)?,
                unit: 1,
            });
        };

        let base = parse_base(base_str)?;
        let unit = parse_unit(trimmed, unit_str)?;
        Self::new(base, unit)
    }
}

impl fmt::Display for SystemSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.display_form())
    }
}

/// Rewrites any accepted spelling into the scheduler's query form.
pub fn normalize(serial: &str) -> Result<String, SerialError> {
    Ok(serial.parse::<SystemSerial>()?.query_form())
}

/// Rewrites any accepted spelling into the zero-padded display form.
pub fn display(serial: &str) -> Result<String, SerialError> {
    Ok(serial.parse::<SystemSerial>()?.display_form())
}

fn parse_base(base: &str) -> Result<BaseSerial, SerialError> {
    if base.is_empty() {
        return Err(SerialError::Empty);
    }
    if !base.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SerialError::InvalidBase(base.to_string()));
    }
    Ok(BaseSerial(base.to_string()))
}

fn parse_unit(serial: &str, unit: &str) -> Result<u32, SerialError> {
    let invalid = || SerialError::InvalidUnit {
        serial: serial.to_string(),
        unit: unit.to_string(),
    };

    if unit.is_empty() || !unit.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    // A unit made only of zeros strips down to nothing.
    let stripped = unit.trim_start_matches('0');
    if stripped.is_empty() {
        return Err(SerialError::ZeroUnit(serial.to_string()));
    }

    stripped.parse::<u32>().map_err(|_| invalid())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
