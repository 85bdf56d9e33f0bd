//! Reading — a measurement paired with its unit.
//!
//! A single reading may carry several sub-measurements separated by `;`
//! (wind speed and direction, for instance). The unit `*` marks a unitless
//! reading such as a binary status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MULTI_VALUE_DELIMITER: char = ';';
const UNITLESS: &str = "*";

/// Raw measurement text and its unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    measurement: String,
    unit: String,
}

impl Reading {
    /// # Errors
    ///
    /// Returns [`ValidationError::Blank`] if measurement or unit is blank.
    pub fn new(
        measurement: impl Into<String>,
        unit: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let measurement = measurement.into();
        let unit = unit.into();
        if measurement.trim().is_empty() {
            return Err(ValidationError::Blank("measurement"));
        }
        if unit.trim().is_empty() {
            return Err(ValidationError::Blank("unit"));
        }
        Ok(Self { measurement, unit })
    }

    #[must_use]
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Parse the measurement as a number, if it is a single numeric value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.measurement.trim().parse().ok()
    }

    /// Human readable rendering, e.g. `"12 km/h and 270 deg"`.
    #[must_use]
    pub fn display(&self) -> String {
        let units: Vec<&str> = self.unit.split(MULTI_VALUE_DELIMITER).collect();
        self.measurement
            .split(MULTI_VALUE_DELIMITER)
            .enumerate()
            .map(|(index, part)| {
                let unit = units
                    .get(index)
                    .or_else(|| units.last())
                    .map_or(UNITLESS, |unit| unit.trim());
                if unit == UNITLESS {
                    part.trim().to_string()
                } else {
                    format!("{} {unit}", part.trim())
                }
            })
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}
