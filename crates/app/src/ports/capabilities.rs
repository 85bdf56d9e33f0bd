//! Capability source port — where functionality configuration comes from.

use smarthome_domain::registry::CapabilityTable;

/// Default cadence of the grid power meter, in minutes.
pub const DEFAULT_GRID_METER_CADENCE_MINUTES: u32 = 15;

/// Default distance allowed between paired inside and outside readings.
pub const DEFAULT_TOLERANCE_SECONDS: u32 = 300;

/// House-wide settings read alongside the capability tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSettings {
    /// Device that hosts the grid power meter, if the house has one.
    pub grid_meter_device_id: Option<String>,
    /// How often the grid meter reports, which is also the width of an
    /// "instant" when correlating power sources with grid readings.
    pub grid_meter_cadence_minutes: u32,
    /// Largest gap, in seconds, between an inside reading and the outside
    /// reading it is compared with.
    pub tolerance_seconds: u32,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            grid_meter_device_id: None,
            grid_meter_cadence_minutes: DEFAULT_GRID_METER_CADENCE_MINUTES,
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
        }
    }
}

/// Supplies the raw capability configuration.
///
/// Implementations never fail: a missing or unreadable source yields empty
/// tables and default settings.
pub trait CapabilitySource {
    fn sensor_table(&self) -> CapabilityTable;

    fn actuator_table(&self) -> CapabilityTable;

    fn general_settings(&self) -> GeneralSettings;
}
