//! Functionality service — read access to the capability registries.

use smarthome_domain::id::{ActuatorFunctionalityId, SensorFunctionalityId};
use smarthome_domain::registry::CapabilityRegistry;

use crate::capabilities::Capabilities;

/// A listed functionality and the unit its readings or commands use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Functionality<Id> {
    pub id: Id,
    pub unit: Option<String>,
}

/// Application service listing what the configuration declares.
pub struct FunctionalityService {
    capabilities: Capabilities,
}

impl FunctionalityService {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// Sensor functionalities, sorted by id.
    #[must_use]
    pub fn sensor_functionalities(&self) -> Vec<Functionality<SensorFunctionalityId>> {
        describe(&self.capabilities.sensors)
    }

    /// Actuator functionalities, sorted by id.
    #[must_use]
    pub fn actuator_functionalities(&self) -> Vec<Functionality<ActuatorFunctionalityId>> {
        describe(&self.capabilities.actuators)
    }

    #[must_use]
    pub fn sensor_unit(&self, id: &SensorFunctionalityId) -> Option<&str> {
        self.capabilities.sensors.unit_for(id)
    }

    #[must_use]
    pub fn actuator_unit(&self, id: &ActuatorFunctionalityId) -> Option<&str> {
        self.capabilities.actuators.unit_for(id)
    }
}

fn describe<Id>(registry: &CapabilityRegistry<Id>) -> Vec<Functionality<Id>>
where
    Id: Clone + Ord + std::hash::Hash,
{
    registry
        .all_functionalities()
        .into_iter()
        .map(|id| Functionality {
            unit: registry.unit_for(&id).map(str::to_string),
            id,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::tests::FixedSource;

    #[test]
    fn should_list_sensor_functionalities_with_units() {
        let svc = FunctionalityService::new(Capabilities::load(&FixedSource));
        let listed = svc.sensor_functionalities();

        assert_eq!(listed.len(), 7);
        let wind = listed
            .iter()
            .find(|f| f.id.as_str() == "WindSpeedAndDirection")
            .unwrap();
        assert_eq!(wind.unit.as_deref(), Some("km/h;deg"));
    }

    #[test]
    fn should_expose_actuator_units() {
        let svc = FunctionalityService::new(Capabilities::load(&FixedSource));
        let blind = ActuatorFunctionalityId::new("BlindSetter").unwrap();
        assert_eq!(svc.actuator_unit(&blind), Some("%"));
        assert_eq!(svc.actuator_functionalities().len(), 4);
    }

    #[test]
    fn should_return_no_unit_for_unknown_functionality() {
        let svc = FunctionalityService::new(Capabilities::load(&FixedSource));
        let unknown = SensorFunctionalityId::new("Radiation").unwrap();
        assert!(svc.sensor_unit(&unknown).is_none());
    }
}
