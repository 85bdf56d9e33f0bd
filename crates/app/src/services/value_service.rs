//! Value service — recording and querying sensor readings.
//!
//! Readings come in three shapes (instant, instant with location, period),
//! each kept in its own repository. Which repository a sensor's readings live
//! in is decided by the service method name configured for its functionality.

use std::collections::BTreeMap;

use smarthome_domain::error::{ConflictError, NotFoundError, SmartHomeError};
use smarthome_domain::id::{DeviceId, SensorFunctionalityId, SensorId};
use smarthome_domain::sensor::SensorRef;
use smarthome_domain::time::{self, Timestamp};
use smarthome_domain::value::{
    InstantLocationValue, InstantSeriesValue, InstantValue, PeriodValue, RecordedValue,
    TimeSeriesValue,
};

use crate::capabilities::Capabilities;
use crate::ports::{InstantValueRepository, SensorRepository, ValueRepository};

/// Functionality of the grid meter sensor averaging power over its cadence.
pub const POWER_AVERAGE: &str = "PowerAverage";
/// Functionality of power source sensors reporting instant consumption.
pub const SPECIFIC_TIME_POWER_CONSUMPTION: &str = "SpecificTimePowerConsumption";

/// Repository a functionality's readings are listed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSeries {
    Instant,
    InstantLocation,
    Period,
}

impl ValueSeries {
    /// Resolve a configured service method name.
    #[must_use]
    pub fn from_service_method(name: &str) -> Option<Self> {
        match name {
            "list_instant_values" => Some(Self::Instant),
            "list_instant_location_values" => Some(Self::InstantLocation),
            "list_period_values" => Some(Self::Period),
            _ => None,
        }
    }
}

/// Application service for sensor readings.
pub struct ValueService<S, I, L, P> {
    sensors: S,
    instant: I,
    instant_location: L,
    period: P,
    capabilities: Capabilities,
}

impl<S, I, L, P> ValueService<S, I, L, P>
where
    S: SensorRepository,
    I: InstantValueRepository<InstantValue>,
    L: InstantValueRepository<InstantLocationValue>,
    P: ValueRepository<PeriodValue>,
{
    pub fn new(
        sensors: S,
        instant: I,
        instant_location: L,
        period: P,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            sensors,
            instant,
            instant_location,
            period,
            capabilities,
        }
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown sensor or
    /// [`ConflictError::AlreadyExists`] for a reused value id.
    #[tracing::instrument(skip(self, value), fields(sensor_id = %value.sensor_id()))]
    pub async fn record_instant(&self, value: InstantValue) -> Result<InstantValue, SmartHomeError> {
        self.ensure_sensor(value.sensor_id()).await?;
        store(&self.instant, value).await
    }

    /// # Errors
    ///
    /// Same as [`record_instant`](Self::record_instant).
    #[tracing::instrument(skip(self, value), fields(sensor_id = %value.sensor_id()))]
    pub async fn record_instant_location(
        &self,
        value: InstantLocationValue,
    ) -> Result<InstantLocationValue, SmartHomeError> {
        self.ensure_sensor(value.sensor_id()).await?;
        store(&self.instant_location, value).await
    }

    /// # Errors
    ///
    /// Same as [`record_instant`](Self::record_instant).
    #[tracing::instrument(skip(self, value), fields(sensor_id = %value.sensor_id()))]
    pub async fn record_period(&self, value: PeriodValue) -> Result<PeriodValue, SmartHomeError> {
        self.ensure_sensor(value.sensor_id()).await?;
        store(&self.period, value).await
    }

    /// Readings of every sensor of a device within `[start, end]`.
    ///
    /// Sensors whose functionality has no known service method contribute
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn measurements_for_device_between(
        &self,
        device_id: &DeviceId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<RecordedValue>, SmartHomeError> {
        let mut readings = Vec::new();
        for sensor in self.sensors.find_by_device_id(device_id).await? {
            let method = self
                .capabilities
                .sensors
                .service_method_for(sensor.functionality_id());
            let Some(series) = method.and_then(ValueSeries::from_service_method) else {
                tracing::debug!(
                    sensor_id = %sensor.id(),
                    method = ?method,
                    "no value series for sensor functionality"
                );
                continue;
            };
            readings.extend(self.list_series(series, sensor.id(), start, end).await?);
        }
        Ok(readings)
    }

    /// Most recent instant reading of a device for one functionality.
    ///
    /// Plain instant readings win; instant-location readings are only
    /// consulted for sensors that have none.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn last_measurement(
        &self,
        device_id: &DeviceId,
        functionality_id: &SensorFunctionalityId,
    ) -> Result<Option<RecordedValue>, SmartHomeError> {
        let mut latest: Option<(Timestamp, RecordedValue)> = None;
        let sensors = self
            .sensors
            .find_by_device_id_and_functionality_id(device_id, functionality_id)
            .await?;
        for sensor in sensors {
            let candidate = match self.instant.find_last_value_recorded(sensor.id()).await? {
                Some(value) => Some((value.recorded_at(), RecordedValue::from(value))),
                None => self
                    .instant_location
                    .find_last_value_recorded(sensor.id())
                    .await?
                    .map(|value| (value.recorded_at(), RecordedValue::from(value))),
            };
            if let Some((at, value)) = candidate
                && latest.as_ref().is_none_or(|(best, _)| at > *best)
            {
                latest = Some((at, value));
            }
        }
        Ok(latest.map(|(_, value)| value))
    }

    /// Highest combined power draw observed in `[start, end]`.
    ///
    /// Each grid meter period reading is added to the power source readings
    /// taken during the cadence that ends with it. Power source readings are
    /// counted once per device and timestamp. Returns `0.0` when the house has
    /// no grid meter or it reported nothing.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn peak_power_consumption(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<f64, SmartHomeError> {
        let settings = &self.capabilities.settings;
        let Some(grid_device) = settings
            .grid_meter_device_id
            .as_deref()
            .and_then(|raw| DeviceId::new(raw).ok())
        else {
            tracing::debug!("no grid meter configured");
            return Ok(0.0);
        };

        let mut grid_values = Vec::new();
        for sensor in self
            .sensors_for(Some(&grid_device), POWER_AVERAGE)
            .await?
        {
            grid_values.extend(
                self.period
                    .find_by_sensor_id_between(sensor.id(), start, end)
                    .await?,
            );
        }

        let mut sources: BTreeMap<(DeviceId, Timestamp), f64> = BTreeMap::new();
        for sensor in self
            .sensors_for(None, SPECIFIC_TIME_POWER_CONSUMPTION)
            .await?
        {
            for value in self
                .instant
                .find_by_sensor_id_between(sensor.id(), start, end)
                .await?
            {
                if let Some(watts) = numeric(&value) {
                    sources
                        .entry((sensor.device_id().clone(), value.recorded_at()))
                        .or_insert(watts);
                }
            }
        }

        let cadence = chrono::Duration::minutes(i64::from(settings.grid_meter_cadence_minutes));
        let peak = grid_values
            .iter()
            .filter_map(|grid| {
                let window_start = grid.end() - cadence;
                let drawn: f64 = sources
                    .iter()
                    .filter(|((_, at), _)| *at >= window_start && *at <= grid.end())
                    .map(|(_, watts)| watts)
                    .sum();
                numeric(grid).map(|watts| watts + drawn)
            })
            .fold(0.0_f64, f64::max);
        Ok(peak)
    }

    /// Largest absolute gap between an inside and an outside temperature.
    ///
    /// Every inside reading taken within `[start, end]`, bounds included, is
    /// compared with the outside reading closest to it in time, provided that
    /// one is no further away than the configured tolerance. Inside readings
    /// without such a partner are skipped. Returns `None` when nothing could
    /// be paired.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown sensor, or a
    /// storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn max_temperature_difference(
        &self,
        inside: &SensorId,
        outside: &SensorId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Option<f64>, SmartHomeError> {
        self.ensure_sensor(inside).await?;
        self.ensure_sensor(outside).await?;

        let tolerance =
            chrono::Duration::seconds(i64::from(self.capabilities.settings.tolerance_seconds));
        let outside_values = self.instant.find_by_sensor_id(outside).await?;

        let mut widest: Option<f64> = None;
        for value in self.instant.find_by_sensor_id(inside).await? {
            let at = value.recorded_at();
            if !time::contained_in(at, at, start, end) {
                continue;
            }
            let Some(inside_temperature) = numeric(&value) else {
                continue;
            };
            let partner = outside_values
                .iter()
                .map(|candidate| ((candidate.recorded_at() - at).abs(), candidate))
                .filter(|(gap, _)| *gap <= tolerance)
                .min_by_key(|(gap, _)| *gap)
                .and_then(|(_, candidate)| numeric(candidate));
            let Some(outside_temperature) = partner else {
                tracing::debug!(recorded_at = %at, "no outside reading within tolerance");
                continue;
            };
            let difference = (inside_temperature - outside_temperature).abs();
            widest = Some(widest.map_or(difference, |current| current.max(difference)));
        }
        Ok(widest)
    }

    async fn sensors_for(
        &self,
        device_id: Option<&DeviceId>,
        functionality: &str,
    ) -> Result<Vec<SensorRef>, SmartHomeError> {
        let functionality = SensorFunctionalityId::new(functionality)?;
        match device_id {
            Some(device_id) => {
                self.sensors
                    .find_by_device_id_and_functionality_id(device_id, &functionality)
                    .await
            }
            None => self.sensors.find_by_functionality_id(&functionality).await,
        }
    }

    async fn list_series(
        &self,
        series: ValueSeries,
        sensor_id: &SensorId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<RecordedValue>, SmartHomeError> {
        Ok(match series {
            ValueSeries::Instant => self
                .instant
                .find_by_sensor_id_between(sensor_id, start, end)
                .await?
                .into_iter()
                .map(RecordedValue::from)
                .collect(),
            ValueSeries::InstantLocation => self
                .instant_location
                .find_by_sensor_id_between(sensor_id, start, end)
                .await?
                .into_iter()
                .map(RecordedValue::from)
                .collect(),
            ValueSeries::Period => self
                .period
                .find_by_sensor_id_between(sensor_id, start, end)
                .await?
                .into_iter()
                .map(RecordedValue::from)
                .collect(),
        })
    }

    async fn ensure_sensor(&self, sensor_id: &SensorId) -> Result<(), SmartHomeError> {
        if self.sensors.contains_by_id(sensor_id).await? {
            Ok(())
        } else {
            Err(NotFoundError {
                entity: "Sensor",
                id: sensor_id.to_string(),
            }
            .into())
        }
    }
}

async fn store<V, R>(repo: &R, value: V) -> Result<V, SmartHomeError>
where
    V: TimeSeriesValue,
    R: ValueRepository<V>,
{
    let id = value.identity().to_string();
    repo.save(value).await?.ok_or_else(|| {
        ConflictError::AlreadyExists {
            entity: V::KIND,
            id,
        }
        .into()
    })
}

fn numeric(value: &impl TimeSeriesValue) -> Option<f64> {
    let parsed = value.reading().as_f64();
    if parsed.is_none() {
        tracing::warn!(value_id = %value.identity(), "ignoring non numeric reading");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::capabilities::tests::FixedSource;
    use crate::ports::Repository;
    use crate::services::test_support::InMemory;
    use smarthome_domain::id::ValueId;
    use smarthome_domain::location::GpsCode;
    use smarthome_domain::reading::Reading;
    use smarthome_domain::sensor::{self, SensorBlueprint};

    type Service = ValueService<
        InMemory<SensorRef>,
        InMemory<InstantValue>,
        InMemory<InstantLocationValue>,
        InMemory<PeriodValue>,
    >;

    fn at(hour: u32, minute: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
    }

    fn sensor(id: &str, device: &str, functionality: &str) -> SensorRef {
        sensor::builtin_factory()
            .create(
                Some(&format!("{functionality}Sensor")),
                SensorBlueprint {
                    id: SensorId::new(id).unwrap(),
                    functionality_id: SensorFunctionalityId::new(functionality).unwrap(),
                    device_id: DeviceId::new(device).unwrap(),
                },
            )
            .unwrap()
    }

    async fn make_service() -> Service {
        let sensors = InMemory::default();
        for (id, device, functionality) in [
            ("Thermo", "Device001", "TemperatureCelsius"),
            ("Outside", "Device002", "TemperatureCelsius"),
            ("Wind", "Device001", "WindSpeedAndDirection"),
            ("Scale", "Device001", "Scale"),
            ("Grid", "Grid Power Meter", POWER_AVERAGE),
            ("Source1", "Power Source 1", SPECIFIC_TIME_POWER_CONSUMPTION),
            ("Source2", "Power Source 2", SPECIFIC_TIME_POWER_CONSUMPTION),
        ] {
            sensors
                .save(sensor(id, device, functionality))
                .await
                .unwrap();
        }
        ValueService::new(
            sensors,
            InMemory::default(),
            InMemory::default(),
            InMemory::default(),
            Capabilities::load(&FixedSource),
        )
    }

    fn instant(sensor: &str, measurement: &str, recorded_at: Timestamp) -> InstantValue {
        InstantValue::builder()
            .sensor_id(SensorId::new(sensor).unwrap())
            .reading(Reading::new(measurement, "W").unwrap())
            .recorded_at(recorded_at)
            .build()
            .unwrap()
    }

    fn period(sensor: &str, measurement: &str, start: Timestamp, end: Timestamp) -> PeriodValue {
        PeriodValue::builder()
            .sensor_id(SensorId::new(sensor).unwrap())
            .reading(Reading::new(measurement, "W").unwrap())
            .period(start, end)
            .build()
            .unwrap()
    }

    #[test]
    fn should_resolve_known_service_methods() {
        assert_eq!(
            ValueSeries::from_service_method("list_period_values"),
            Some(ValueSeries::Period)
        );
        assert_eq!(ValueSeries::from_service_method("list_scale_values"), None);
    }

    #[tokio::test]
    async fn should_return_not_found_when_recording_for_unknown_sensor() {
        let svc = make_service().await;
        let result = svc.record_instant(instant("Ghost", "1", at(10, 0))).await;
        assert!(matches!(result, Err(SmartHomeError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_return_conflict_when_value_id_reused() {
        let svc = make_service().await;
        let value = InstantValue::builder()
            .id(ValueId::new("Value001").unwrap())
            .sensor_id(SensorId::new("Thermo").unwrap())
            .reading(Reading::new("21", "C").unwrap())
            .recorded_at(at(10, 0))
            .build()
            .unwrap();
        svc.record_instant(value.clone()).await.unwrap();
        let result = svc.record_instant(value).await;
        assert!(matches!(result, Err(SmartHomeError::Conflict(_))));
    }

    #[tokio::test]
    async fn should_route_device_measurements_by_service_method() {
        let svc = make_service().await;
        svc.record_instant(instant("Thermo", "21", at(10, 5)))
            .await
            .unwrap();
        svc.record_instant(instant("Scale", "80", at(10, 5)))
            .await
            .unwrap();
        svc.record_instant_location(
            InstantLocationValue::builder()
                .sensor_id(SensorId::new("Wind").unwrap())
                .reading(Reading::new("12;270", "km/h;deg").unwrap())
                .recorded_at(at(10, 10))
                .gps_code(GpsCode::new(41.1, -8.6).unwrap())
                .build()
                .unwrap(),
        )
        .await
        .unwrap();

        let readings = svc
            .measurements_for_device_between(
                &DeviceId::new("Device001").unwrap(),
                at(10, 0),
                at(11, 0),
            )
            .await
            .unwrap();

        // Scale readings use an unknown method and are left out.
        assert_eq!(readings.len(), 2);
        assert!(readings
            .iter()
            .any(|r| matches!(r, RecordedValue::InstantLocation(_))));
    }

    #[tokio::test]
    async fn should_return_latest_instant_measurement() {
        let svc = make_service().await;
        svc.record_instant(instant("Thermo", "19", at(8, 0)))
            .await
            .unwrap();
        svc.record_instant(instant("Thermo", "23", at(14, 0)))
            .await
            .unwrap();
        svc.record_instant(instant("Thermo", "21", at(11, 0)))
            .await
            .unwrap();

        let last = svc
            .last_measurement(
                &DeviceId::new("Device001").unwrap(),
                &SensorFunctionalityId::new("TemperatureCelsius").unwrap(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.reading().measurement(), "23");
    }

    #[tokio::test]
    async fn should_return_none_when_no_measurement_recorded() {
        let svc = make_service().await;
        let last = svc
            .last_measurement(
                &DeviceId::new("Device001").unwrap(),
                &SensorFunctionalityId::new("TemperatureCelsius").unwrap(),
            )
            .await
            .unwrap();
        assert!(last.is_none());
    }

    #[tokio::test]
    async fn should_compute_peak_power_from_grid_and_sources() {
        let svc = make_service().await;
        svc.record_period(period("Grid", "100", at(10, 0), at(10, 15)))
            .await
            .unwrap();
        svc.record_period(period("Grid", "200", at(10, 15), at(10, 30)))
            .await
            .unwrap();
        svc.record_instant(instant("Source1", "50", at(10, 10)))
            .await
            .unwrap();
        // Same device and timestamp, counted once.
        svc.record_instant(instant("Source1", "50", at(10, 10)))
            .await
            .unwrap();
        svc.record_instant(instant("Source2", "30", at(10, 10)))
            .await
            .unwrap();
        svc.record_instant(instant("Source2", "40", at(10, 25)))
            .await
            .unwrap();

        let peak = svc
            .peak_power_consumption(at(9, 59), at(11, 0))
            .await
            .unwrap();

        // 100 + 50 + 30 = 180 for the first quarter, 200 + 40 for the second.
        assert_eq!(peak, 240.0);
    }

    #[tokio::test]
    async fn should_return_zero_peak_without_grid_values() {
        let svc = make_service().await;
        svc.record_instant(instant("Source1", "50", at(10, 10)))
            .await
            .unwrap();
        let peak = svc
            .peak_power_consumption(at(9, 0), at(11, 0))
            .await
            .unwrap();
        assert_eq!(peak, 0.0);
    }

    fn thermo_pair() -> (SensorId, SensorId) {
        (SensorId::new("Thermo").unwrap(), SensorId::new("Outside").unwrap())
    }

    #[tokio::test]
    async fn should_compare_inside_reading_with_closest_outside_reading() {
        let svc = make_service().await;
        svc.record_instant(instant("Thermo", "18", at(14, 0)))
            .await
            .unwrap();
        svc.record_instant(instant("Outside", "30", at(13, 58)))
            .await
            .unwrap();
        svc.record_instant(instant("Outside", "24", at(14, 5)))
            .await
            .unwrap();

        let (inside, outside) = thermo_pair();
        let widest = svc
            .max_temperature_difference(&inside, &outside, at(8, 0), at(21, 0))
            .await
            .unwrap();
        assert_eq!(widest, Some(12.0));
    }

    #[tokio::test]
    async fn should_pair_outside_reading_exactly_at_tolerance() {
        let svc = make_service().await;
        svc.record_instant(instant("Thermo", "18", at(8, 0)))
            .await
            .unwrap();
        svc.record_instant(instant("Thermo", "24", at(21, 0)))
            .await
            .unwrap();
        svc.record_instant(instant("Outside", "24", at(8, 5)))
            .await
            .unwrap();
        // One second past the tolerance of the 21:00 reading.
        svc.record_instant(instant(
            "Outside",
            "0",
            at(21, 5) + chrono::Duration::seconds(1),
        ))
        .await
        .unwrap();

        let (inside, outside) = thermo_pair();
        let widest = svc
            .max_temperature_difference(&inside, &outside, at(8, 0), at(21, 0))
            .await
            .unwrap();
        assert_eq!(widest, Some(6.0));
    }

    #[tokio::test]
    async fn should_return_none_when_no_reading_can_be_paired() {
        let svc = make_service().await;
        let (inside, outside) = thermo_pair();
        let empty = svc
            .max_temperature_difference(&inside, &outside, at(8, 0), at(21, 0))
            .await
            .unwrap();
        assert_eq!(empty, None);

        // Inside reading after the window, and one too far from any outside one.
        svc.record_instant(instant("Thermo", "25", at(22, 0)))
            .await
            .unwrap();
        svc.record_instant(instant("Thermo", "27", at(17, 6)))
            .await
            .unwrap();
        svc.record_instant(instant("Outside", "24", at(14, 5)))
            .await
            .unwrap();
        let unpaired = svc
            .max_temperature_difference(&inside, &outside, at(8, 0), at(21, 0))
            .await
            .unwrap();
        assert_eq!(unpaired, None);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_outside_sensor() {
        let svc = make_service().await;
        let result = svc
            .max_temperature_difference(
                &SensorId::new("Thermo").unwrap(),
                &SensorId::new("Ghost").unwrap(),
                at(8, 0),
                at(21, 0),
            )
            .await;
        assert!(matches!(result, Err(SmartHomeError::NotFound(_))));
    }
}
