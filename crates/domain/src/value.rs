//! Recorded sensor values in their three temporal shapes.
//!
//! - [`InstantValue`]: a reading taken at one moment.
//! - [`InstantLocationValue`]: the same, tagged with where it was taken.
//! - [`PeriodValue`]: a reading aggregated over an interval.
//!
//! Values are append-only: fields are private and there are no setters.
//! Window queries differ per shape. Instants match an open window
//! (`start < t < end`) while periods must be contained in a closed one
//! (`start <= from && to <= end`).

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;
use crate::error::ValidationError;
use crate::id::{SensorId, ValueId};
use crate::location::GpsCode;
use crate::reading::Reading;
use crate::time::{self, Timestamp};

/// Behaviour shared by every recorded value.
pub trait TimeSeriesValue: AggregateRoot<Id = ValueId> + Clone + Send + Sync + 'static {
    fn sensor_id(&self) -> &SensorId;

    fn reading(&self) -> &Reading;

    /// Whether the value belongs to the `[start, end]` query window, using the
    /// boundary semantics of its shape.
    fn falls_within(&self, start: Timestamp, end: Timestamp) -> bool;
}

/// A value recorded at a single instant.
pub trait InstantSeriesValue: TimeSeriesValue {
    fn recorded_at(&self) -> Timestamp;
}

/// Reading taken at one moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantValue {
    id: ValueId,
    sensor_id: SensorId,
    reading: Reading,
    recorded_at: Timestamp,
}

impl InstantValue {
    #[must_use]
    pub fn builder() -> InstantValueBuilder {
        InstantValueBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &ValueId {
        &self.id
    }
}

impl AggregateRoot for InstantValue {
    type Id = ValueId;

    const KIND: &'static str = "InstantValue";

    fn identity(&self) -> &ValueId {
        &self.id
    }
}

impl TimeSeriesValue for InstantValue {
    fn sensor_id(&self) -> &SensorId {
        &self.sensor_id
    }

    fn reading(&self) -> &Reading {
        &self.reading
    }

    fn falls_within(&self, start: Timestamp, end: Timestamp) -> bool {
        time::strictly_between(self.recorded_at, start, end)
    }
}

impl InstantSeriesValue for InstantValue {
    fn recorded_at(&self) -> Timestamp {
        self.recorded_at
    }
}

/// Builder for [`InstantValue`].
#[derive(Debug, Default)]
pub struct InstantValueBuilder {
    id: Option<ValueId>,
    sensor_id: Option<SensorId>,
    reading: Option<Reading>,
    recorded_at: Option<Timestamp>,
}

impl InstantValueBuilder {
    #[must_use]
    pub fn id(mut self, id: ValueId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn sensor_id(mut self, sensor_id: SensorId) -> Self {
        self.sensor_id = Some(sensor_id);
        self
    }

    #[must_use]
    pub fn reading(mut self, reading: Reading) -> Self {
        self.reading = Some(reading);
        self
    }

    #[must_use]
    pub fn recorded_at(mut self, recorded_at: Timestamp) -> Self {
        self.recorded_at = Some(recorded_at);
        self
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::Missing`] if sensor, reading or timestamp
    /// were not supplied.
    pub fn build(self) -> Result<InstantValue, ValidationError> {
        Ok(InstantValue {
            id: self.id.unwrap_or_else(ValueId::generate),
            sensor_id: self.sensor_id.ok_or(ValidationError::Missing("sensor id"))?,
            reading: self.reading.ok_or(ValidationError::Missing("reading"))?,
            recorded_at: self
                .recorded_at
                .ok_or(ValidationError::Missing("timestamp"))?,
        })
    }
}

/// Reading taken at one moment and place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantLocationValue {
    id: ValueId,
    sensor_id: SensorId,
    reading: Reading,
    recorded_at: Timestamp,
    gps_code: GpsCode,
}

impl InstantLocationValue {
    #[must_use]
    pub fn builder() -> InstantLocationValueBuilder {
        InstantLocationValueBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &ValueId {
        &self.id
    }

    #[must_use]
    pub fn gps_code(&self) -> GpsCode {
        self.gps_code
    }
}

impl AggregateRoot for InstantLocationValue {
    type Id = ValueId;

    const KIND: &'static str = "InstantLocationValue";

    fn identity(&self) -> &ValueId {
        &self.id
    }
}

impl TimeSeriesValue for InstantLocationValue {
    fn sensor_id(&self) -> &SensorId {
        &self.sensor_id
    }

    fn reading(&self) -> &Reading {
        &self.reading
    }

    fn falls_within(&self, start: Timestamp, end: Timestamp) -> bool {
        time::strictly_between(self.recorded_at, start, end)
    }
}

impl InstantSeriesValue for InstantLocationValue {
    fn recorded_at(&self) -> Timestamp {
        self.recorded_at
    }
}

/// Builder for [`InstantLocationValue`].
#[derive(Debug, Default)]
pub struct InstantLocationValueBuilder {
    id: Option<ValueId>,
    sensor_id: Option<SensorId>,
    reading: Option<Reading>,
    recorded_at: Option<Timestamp>,
    gps_code: Option<GpsCode>,
}

impl InstantLocationValueBuilder {
    #[must_use]
    pub fn id(mut self, id: ValueId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn sensor_id(mut self, sensor_id: SensorId) -> Self {
        self.sensor_id = Some(sensor_id);
        self
    }

    #[must_use]
    pub fn reading(mut self, reading: Reading) -> Self {
        self.reading = Some(reading);
        self
    }

    #[must_use]
    pub fn recorded_at(mut self, recorded_at: Timestamp) -> Self {
        self.recorded_at = Some(recorded_at);
        self
    }

    #[must_use]
    pub fn gps_code(mut self, gps_code: GpsCode) -> Self {
        self.gps_code = Some(gps_code);
        self
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::Missing`] for any field other than the id.
    pub fn build(self) -> Result<InstantLocationValue, ValidationError> {
        Ok(InstantLocationValue {
            id: self.id.unwrap_or_else(ValueId::generate),
            sensor_id: self.sensor_id.ok_or(ValidationError::Missing("sensor id"))?,
            reading: self.reading.ok_or(ValidationError::Missing("reading"))?,
            recorded_at: self
                .recorded_at
                .ok_or(ValidationError::Missing("timestamp"))?,
            gps_code: self.gps_code.ok_or(ValidationError::Missing("gps code"))?,
        })
    }
}

/// Reading aggregated over `[start, end]`.
///
/// The bounds are stored as given; `start` is not required to precede `end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodValue {
    id: ValueId,
    sensor_id: SensorId,
    reading: Reading,
    start: Timestamp,
    end: Timestamp,
}

impl PeriodValue {
    #[must_use]
    pub fn builder() -> PeriodValueBuilder {
        PeriodValueBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &ValueId {
        &self.id
    }

    #[must_use]
    pub fn start(&self) -> Timestamp {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> Timestamp {
        self.end
    }
}

impl AggregateRoot for PeriodValue {
    type Id = ValueId;

    const KIND: &'static str = "PeriodValue";

    fn identity(&self) -> &ValueId {
        &self.id
    }
}

impl TimeSeriesValue for PeriodValue {
    fn sensor_id(&self) -> &SensorId {
        &self.sensor_id
    }

    fn reading(&self) -> &Reading {
        &self.reading
    }

    fn falls_within(&self, start: Timestamp, end: Timestamp) -> bool {
        time::contained_in(self.start, self.end, start, end)
    }
}

/// Builder for [`PeriodValue`].
#[derive(Debug, Default)]
pub struct PeriodValueBuilder {
    id: Option<ValueId>,
    sensor_id: Option<SensorId>,
    reading: Option<Reading>,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl PeriodValueBuilder {
    #[must_use]
    pub fn id(mut self, id: ValueId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn sensor_id(mut self, sensor_id: SensorId) -> Self {
        self.sensor_id = Some(sensor_id);
        self
    }

    #[must_use]
    pub fn reading(mut self, reading: Reading) -> Self {
        self.reading = Some(reading);
        self
    }

    #[must_use]
    pub fn period(mut self, start: Timestamp, end: Timestamp) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::Missing`] for any field other than the id.
    pub fn build(self) -> Result<PeriodValue, ValidationError> {
        Ok(PeriodValue {
            id: self.id.unwrap_or_else(ValueId::generate),
            sensor_id: self.sensor_id.ok_or(ValidationError::Missing("sensor id"))?,
            reading: self.reading.ok_or(ValidationError::Missing("reading"))?,
            start: self.start.ok_or(ValidationError::Missing("period start"))?,
            end: self.end.ok_or(ValidationError::Missing("period end"))?,
        })
    }
}

/// Any recorded value, for callers that mix shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RecordedValue {
    Instant(InstantValue),
    InstantLocation(InstantLocationValue),
    Period(PeriodValue),
}

impl RecordedValue {
    #[must_use]
    pub fn id(&self) -> &ValueId {
        match self {
            Self::Instant(value) => value.identity(),
            Self::InstantLocation(value) => value.identity(),
            Self::Period(value) => value.identity(),
        }
    }

    #[must_use]
    pub fn sensor_id(&self) -> &SensorId {
        match self {
            Self::Instant(value) => value.sensor_id(),
            Self::InstantLocation(value) => value.sensor_id(),
            Self::Period(value) => value.sensor_id(),
        }
    }

    #[must_use]
    pub fn reading(&self) -> &Reading {
        match self {
            Self::Instant(value) => value.reading(),
            Self::InstantLocation(value) => value.reading(),
            Self::Period(value) => value.reading(),
        }
    }
}

impl From<InstantValue> for RecordedValue {
    fn from(value: InstantValue) -> Self {
        Self::Instant(value)
    }
}

impl From<InstantLocationValue> for RecordedValue {
    fn from(value: InstantLocationValue) -> Self {
        Self::InstantLocation(value)
    }
}

impl From<PeriodValue> for RecordedValue {
    fn from(value: PeriodValue) -> Self {
        Self::Period(value)
    }
}
