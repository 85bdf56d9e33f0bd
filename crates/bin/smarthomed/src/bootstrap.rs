//! Demo data loader.
//!
//! Populates one house with rooms, devices, sensors, actuators and a few
//! readings, all created through the application services so every sensor
//! and actuator goes through the capability registry and factories. Nothing
//! happens when the demo house already exists.

use chrono::Duration;

use smarthome_app::ports::Storage;
use smarthome_domain::actuator::{ActuatorProperties, DecimalRange, IntegerRange};
use smarthome_domain::device::Device;
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::house::House;
use smarthome_domain::id::{
    ActuatorFunctionalityId, ActuatorId, DeviceId, HouseId, RoomId, SensorFunctionalityId,
    SensorId,
};
use smarthome_domain::location::{Address, GpsCode, Location};
use smarthome_domain::reading::Reading;
use smarthome_domain::room::{Room, RoomDimensions};
use smarthome_domain::time::{self, Timestamp};
use smarthome_domain::value::{InstantLocationValue, InstantValue, PeriodValue};

use crate::services::Services;

pub const DEMO_HOUSE_ID: &str = "House001";

/// `(id, floor, length, width, height)`; a zero height marks an outdoor area.
const ROOMS: &[(&str, i32, f64, f64, f64)] = &[
    ("Bedroom", 1, 5.0, 4.0, 2.5),
    ("Kitchen", 0, 4.0, 3.5, 2.5),
    ("Living Room", 0, 7.0, 5.0, 2.8),
    ("Office", 1, 3.5, 3.0, 2.5),
    ("Garden", 0, 15.0, 10.0, 0.0),
];

/// `(id, room, model)`
const DEVICES: &[(&str, &str, &str)] = &[
    ("Thermostat", "Bedroom", "Nest Learning Thermostat"),
    ("Blind Controller", "Living Room", "Somfy TaHoma"),
    ("Weather Station", "Garden", "Netatmo Weather Station"),
    ("Grid Power Meter", "Office", "Shelly EM"),
    ("Power Source 1", "Kitchen", "Solar Inverter"),
    ("Power Source 2", "Kitchen", "Home Battery"),
];

/// `(sensor id, device, functionality)`
const SENSORS: &[(&str, &str, &str)] = &[
    ("Bedroom Temperature", "Thermostat", "TemperatureCelsius"),
    ("Bedroom Humidity", "Thermostat", "HumidityPercentage"),
    ("Blind Position", "Blind Controller", "Scale"),
    ("Wind", "Weather Station", "WindSpeedAndDirection"),
    ("Sunrise", "Weather Station", "Sunrise"),
    ("Grid Power", "Grid Power Meter", "PowerAverage"),
    ("Source 1 Power", "Power Source 1", "SpecificTimePowerConsumption"),
    ("Source 2 Power", "Power Source 2", "SpecificTimePowerConsumption"),
];

/// Create the demo house unless it is already there.
///
/// Sensors and actuators whose functionality the capability file does not
/// resolve are skipped; their readings are skipped with them.
///
/// Returns whether anything was loaded.
///
/// # Errors
///
/// Returns a storage error, or any service error other than an
/// unresolvable functionality.
#[tracing::instrument(skip(services))]
pub async fn load_demo_data<S: Storage>(services: &Services<S>) -> Result<bool, SmartHomeError> {
    let house_id = HouseId::new(DEMO_HOUSE_ID)?;
    match services.houses.get_house(&house_id).await {
        Ok(_) => {
            tracing::info!("demo house already present, skipping demo data");
            return Ok(false);
        }
        Err(SmartHomeError::NotFound(_)) => {}
        Err(err) => return Err(err),
    }

    let location = Location::new(
        Address::new("Rua Dr. Bernardino", "431", "4200-072", "Porto", "Portugal")?,
        GpsCode::new(41.178, -8.608)?,
    );
    services
        .houses
        .create_house(
            House::builder()
                .id(house_id.clone())
                .location(location)
                .build()?,
        )
        .await?;

    for (id, floor, length, width, height) in ROOMS {
        services
            .rooms
            .create_room(
                Room::builder()
                    .id(RoomId::new(*id)?)
                    .house_id(house_id.clone())
                    .floor(*floor)
                    .dimensions(RoomDimensions::new(*length, *width, *height)?)
                    .build()?,
            )
            .await?;
    }

    for (id, room, model) in DEVICES {
        services
            .devices
            .create_device(
                Device::builder()
                    .id(DeviceId::new(*id)?)
                    .room_id(RoomId::new(*room)?)
                    .model(*model)
                    .build()?,
            )
            .await?;
    }

    let mut sensors = Vec::new();
    for (id, device, functionality) in SENSORS {
        let added = services
            .sensors
            .add_sensor(
                SensorId::new(*id)?,
                DeviceId::new(*device)?,
                SensorFunctionalityId::new(*functionality)?,
            )
            .await;
        if let Some(sensor) = skip_unresolvable(added)? {
            sensors.push(sensor.id().clone());
        }
    }

    add_actuators(services).await?;
    record_readings(services, &sensors, time::now()).await?;

    tracing::info!(
        rooms = ROOMS.len(),
        devices = DEVICES.len(),
        sensors = sensors.len(),
        "demo data loaded"
    );
    Ok(true)
}

async fn add_actuators<S: Storage>(services: &Services<S>) -> Result<(), SmartHomeError> {
    let actuators = [
        ("Heating", "Thermostat", "Switch", ActuatorProperties::None),
        (
            "Target Temperature",
            "Thermostat",
            "DecimalSetter",
            ActuatorProperties::DecimalRange(DecimalRange::new(10.0, 30.0, 1)?),
        ),
        ("Blind", "Blind Controller", "BlindSetter", ActuatorProperties::None),
        (
            "Fan Speed",
            "Thermostat",
            "IntegerSetter",
            ActuatorProperties::IntegerRange(IntegerRange::new(0, 5)?),
        ),
    ];
    for (id, device, functionality, properties) in actuators {
        let added = services
            .actuators
            .add_actuator(
                ActuatorId::new(id)?,
                DeviceId::new(device)?,
                ActuatorFunctionalityId::new(functionality)?,
                properties,
            )
            .await;
        skip_unresolvable(added)?;
    }
    Ok(())
}

async fn record_readings<S: Storage>(
    services: &Services<S>,
    sensors: &[SensorId],
    now: Timestamp,
) -> Result<(), SmartHomeError> {
    let created = |id: &str| sensors.iter().find(|sensor| sensor.as_str() == id).cloned();

    if let Some(sensor) = created("Bedroom Temperature") {
        for (minutes_ago, celsius) in [(45, "20.5"), (30, "21.0"), (15, "21.4")] {
            services
                .values
                .record_instant(instant(&sensor, celsius, "C", now - Duration::minutes(minutes_ago))?)
                .await?;
        }
    }

    if let Some(sensor) = created("Wind") {
        services
            .values
            .record_instant_location(
                InstantLocationValue::builder()
                    .sensor_id(sensor)
                    .reading(Reading::new("12;270", "km/h;deg")?)
                    .recorded_at(now - Duration::minutes(10))
                    .gps_code(GpsCode::new(41.178, -8.608)?)
                    .build()?,
            )
            .await?;
    }

    if let Some(sensor) = created("Grid Power") {
        for (from, to, watts) in [(60, 45, "310"), (45, 30, "420"), (30, 15, "380")] {
            services
                .values
                .record_period(
                    PeriodValue::builder()
                        .sensor_id(sensor.clone())
                        .reading(Reading::new(watts, "W")?)
                        .period(now - Duration::minutes(from), now - Duration::minutes(to))
                        .build()?,
                )
                .await?;
        }
    }

    for (id, watts) in [("Source 1 Power", "120"), ("Source 2 Power", "75")] {
        if let Some(sensor) = created(id) {
            services
                .values
                .record_instant(instant(&sensor, watts, "W", now - Duration::minutes(35))?)
                .await?;
        }
    }
    Ok(())
}

fn instant(
    sensor: &SensorId,
    measurement: &str,
    unit: &str,
    at: Timestamp,
) -> Result<InstantValue, SmartHomeError> {
    Ok(InstantValue::builder()
        .sensor_id(sensor.clone())
        .reading(Reading::new(measurement, unit)?)
        .recorded_at(at)
        .build()?)
}

/// Turn a capability failure into a logged skip.
fn skip_unresolvable<T>(result: Result<T, SmartHomeError>) -> Result<Option<T>, SmartHomeError> {
    match result {
        Ok(created) => Ok(Some(created)),
        Err(SmartHomeError::Capability(err)) => {
            tracing::warn!(error = %err, "skipping demo item");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
