//! Actuators — device capabilities that accept commands.
//!
//! Some kinds need construction parameters ([`ActuatorProperties`]): setters
//! are bounded by an integer or decimal range. A kind given properties it does
//! not understand refuses to be built.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;
use crate::error::ValidationError;
use crate::factory::DynamicFactory;
use crate::id::{ActuatorFunctionalityId, ActuatorId, DeviceId};

/// Inclusive integer bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerRange {
    lower: i64,
    upper: i64,
}

impl IntegerRange {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvertedRange`] when `upper < lower`.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(lower: i64, upper: i64) -> Result<Self, ValidationError> {
        if upper < lower {
            return Err(ValidationError::InvertedRange {
                lower: lower as f64,
                upper: upper as f64,
            });
        }
        Ok(Self { lower, upper })
    }

    #[must_use]
    pub fn lower(&self) -> i64 {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> i64 {
        self.upper
    }

    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        (self.lower..=self.upper).contains(&value)
    }
}

/// Inclusive decimal bounds plus the number of decimal places kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecimalRange {
    lower: f64,
    upper: f64,
    precision: u32,
}

impl DecimalRange {
    /// Most decimal places an `f64` represents reliably.
    pub const MAX_PRECISION: u32 = f64::DIGITS;

    /// # Errors
    ///
    /// Returns a [`ValidationError`] for non-finite limits, `upper < lower`
    /// or a precision above [`MAX_PRECISION`](Self::MAX_PRECISION).
    pub fn new(lower: f64, upper: f64, precision: u32) -> Result<Self, ValidationError> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(ValidationError::NonFiniteLimit);
        }
        if upper < lower {
            return Err(ValidationError::InvertedRange { lower, upper });
        }
        if precision > Self::MAX_PRECISION {
            return Err(ValidationError::PrecisionTooLarge {
                precision,
                max: Self::MAX_PRECISION,
            });
        }
        Ok(Self {
            lower,
            upper,
            precision,
        })
    }

    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    #[must_use]
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Round half away from zero to `precision` decimal places.
    #[must_use]
    pub fn round(&self, value: f64) -> f64 {
        let places = self.precision.min(Self::MAX_PRECISION);
        let factor = 10_f64.powi(i32::try_from(places).unwrap_or(0));
        (value * factor).round() / factor
    }
}

/// Construction parameters of an actuator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActuatorProperties {
    #[default]
    None,
    IntegerRange(IntegerRange),
    DecimalRange(DecimalRange),
}

impl ActuatorProperties {
    fn label(&self) -> &'static str {
        match self {
            Self::None => "no",
            Self::IntegerRange(_) => "integer range",
            Self::DecimalRange(_) => "decimal range",
        }
    }
}

/// Canonical construction parameters of an actuator.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorBlueprint {
    pub id: ActuatorId,
    pub functionality_id: ActuatorFunctionalityId,
    pub properties: ActuatorProperties,
    pub device_id: DeviceId,
}

/// State shared by every actuator kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorCore {
    id: ActuatorId,
    functionality_id: ActuatorFunctionalityId,
    properties: ActuatorProperties,
    device_id: DeviceId,
}

impl From<ActuatorBlueprint> for ActuatorCore {
    fn from(blueprint: ActuatorBlueprint) -> Self {
        Self {
            id: blueprint.id,
            functionality_id: blueprint.functionality_id,
            properties: blueprint.properties,
            device_id: blueprint.device_id,
        }
    }
}

/// An actuator attached to a device.
pub trait Actuator: fmt::Debug + Send + Sync {
    fn core(&self) -> &ActuatorCore;

    /// Implementation name this actuator was built from.
    fn kind(&self) -> &'static str;

    /// Validate a command value and return what should be sent to the device.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] when the value is not accepted.
    fn set_value(&self, value: f64) -> Result<f64, ValidationError>;

    fn id(&self) -> &ActuatorId {
        &self.core().id
    }

    fn functionality_id(&self) -> &ActuatorFunctionalityId {
        &self.core().functionality_id
    }

    fn device_id(&self) -> &DeviceId {
        &self.core().device_id
    }

    fn properties(&self) -> &ActuatorProperties {
        &self.core().properties
    }
}

/// Shared handle to an actuator of any kind.
pub type ActuatorRef = Arc<dyn Actuator>;

/// Factory producing [`ActuatorRef`]s from [`ActuatorBlueprint`]s.
pub type ActuatorFactory = DynamicFactory<ActuatorBlueprint, dyn Actuator>;

impl AggregateRoot for ActuatorRef {
    type Id = ActuatorId;

    const KIND: &'static str = "Actuator";

    fn identity(&self) -> &ActuatorId {
        self.id()
    }
}

fn unsupported(kind: &'static str, expected: &'static str) -> ValidationError {
    ValidationError::UnsupportedProperties { kind, expected }
}

fn out_of_range(kind: &'static str, value: f64) -> ValidationError {
    ValidationError::OutOfRange { kind, value }
}

/// On/off switch. Accepts `1` (on) and `0` (off).
#[derive(Debug, Clone)]
pub struct SwitchActuator {
    core: ActuatorCore,
}

impl SwitchActuator {
    const KIND: &'static str = "SwitchActuator";

    /// # Errors
    ///
    /// Rejects blueprints carrying range properties.
    pub fn new(blueprint: ActuatorBlueprint) -> Result<Self, ValidationError> {
        if blueprint.properties != ActuatorProperties::None {
            return Err(unsupported(Self::KIND, ActuatorProperties::None.label()));
        }
        Ok(Self {
            core: blueprint.into(),
        })
    }
}

impl Actuator for SwitchActuator {
    fn core(&self) -> &ActuatorCore {
        &self.core
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn set_value(&self, value: f64) -> Result<f64, ValidationError> {
        if value == 0.0 || value == 1.0 {
            Ok(value)
        } else {
            Err(out_of_range(Self::KIND, value))
        }
    }
}

/// Blind roller position, from 0 (closed) to 100 (fully open).
#[derive(Debug, Clone)]
pub struct BlindSetterActuator {
    core: ActuatorCore,
}

impl BlindSetterActuator {
    const KIND: &'static str = "BlindSetterActuator";

    /// # Errors
    ///
    /// Rejects blueprints carrying range properties.
    pub fn new(blueprint: ActuatorBlueprint) -> Result<Self, ValidationError> {
        if blueprint.properties != ActuatorProperties::None {
            return Err(unsupported(Self::KIND, ActuatorProperties::None.label()));
        }
        Ok(Self {
            core: blueprint.into(),
        })
    }
}

impl Actuator for BlindSetterActuator {
    fn core(&self) -> &ActuatorCore {
        &self.core
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn set_value(&self, value: f64) -> Result<f64, ValidationError> {
        if (0.0..=100.0).contains(&value) {
            Ok(value)
        } else {
            Err(out_of_range(Self::KIND, value))
        }
    }
}

/// Integer setter bounded by an [`IntegerRange`].
#[derive(Debug, Clone)]
pub struct IntegerSetterActuator {
    core: ActuatorCore,
    range: IntegerRange,
}

impl IntegerSetterActuator {
    const KIND: &'static str = "IntegerSetterActuator";

    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedProperties`] unless the
    /// blueprint carries an integer range.
    pub fn new(blueprint: ActuatorBlueprint) -> Result<Self, ValidationError> {
        let ActuatorProperties::IntegerRange(range) = blueprint.properties else {
            return Err(unsupported(Self::KIND, "integer range"));
        };
        Ok(Self {
            core: blueprint.into(),
            range,
        })
    }
}

impl Actuator for IntegerSetterActuator {
    fn core(&self) -> &ActuatorCore {
        &self.core
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn set_value(&self, value: f64) -> Result<f64, ValidationError> {
        if value.fract() != 0.0 || !value.is_finite() {
            return Err(out_of_range(Self::KIND, value));
        }
        // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
        if value < i64::MIN as f64 || value >= i64::MAX as f64 {
            return Err(out_of_range(Self::KIND, value));
        }
        if self.range.contains(value as i64) {
            Ok(value)
        } else {
            Err(out_of_range(Self::KIND, value))
        }
    }
}

/// Decimal setter bounded by a [`DecimalRange`], rounding to its precision.
#[derive(Debug, Clone)]
pub struct DecimalSetterActuator {
    core: ActuatorCore,
    range: DecimalRange,
}

impl DecimalSetterActuator {
    const KIND: &'static str = "DecimalSetterActuator";

    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedProperties`] unless the
    /// blueprint carries a decimal range.
    pub fn new(blueprint: ActuatorBlueprint) -> Result<Self, ValidationError> {
        let ActuatorProperties::DecimalRange(range) = blueprint.properties else {
            return Err(unsupported(Self::KIND, "decimal range"));
        };
        // Deserialized ranges bypass `DecimalRange::new`.
        let range = DecimalRange::new(range.lower, range.upper, range.precision)?;
        Ok(Self {
            core: blueprint.into(),
            range,
        })
    }
}

impl Actuator for DecimalSetterActuator {
    fn core(&self) -> &ActuatorCore {
        &self.core
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn set_value(&self, value: f64) -> Result<f64, ValidationError> {
        let rounded = self.range.round(value);
        if (self.range.lower..=self.range.upper).contains(&rounded) {
            Ok(rounded)
        } else {
            Err(out_of_range(Self::KIND, value))
        }
    }
}

/// Factory knowing every actuator kind shipped with the crate.
#[must_use]
pub fn builtin_factory() -> ActuatorFactory {
    let mut factory = ActuatorFactory::new();
    factory
        .register(SwitchActuator::KIND, |blueprint| {
            Ok(Arc::new(SwitchActuator::new(blueprint)?) as ActuatorRef)
        })
        .register(BlindSetterActuator::KIND, |blueprint| {
            Ok(Arc::new(BlindSetterActuator::new(blueprint)?) as ActuatorRef)
        })
        .register(IntegerSetterActuator::KIND, |blueprint| {
            Ok(Arc::new(IntegerSetterActuator::new(blueprint)?) as ActuatorRef)
        })
        .register(DecimalSetterActuator::KIND, |blueprint| {
            Ok(Arc::new(DecimalSetterActuator::new(blueprint)?) as ActuatorRef)
        });
    factory
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blueprint(properties: ActuatorProperties) -> ActuatorBlueprint {
        ActuatorBlueprint {
            id: ActuatorId::new("Actuator001").unwrap(),
            functionality_id: ActuatorFunctionalityId::new("Setter").unwrap(),
            properties,
            device_id: DeviceId::new("Device001").unwrap(),
        }
    }

    #[test]
    fn should_reject_inverted_integer_range() {
        assert!(matches!(
            IntegerRange::new(10, 1),
            Err(ValidationError::InvertedRange { .. })
        ));
    }

    #[test]
    fn should_reject_non_finite_decimal_limits() {
        assert_eq!(
            DecimalRange::new(f64::NAN, 1.0, 1),
            Err(ValidationError::NonFiniteLimit)
        );
    }

    #[test]
    fn should_reject_precision_beyond_f64_digits() {
        assert_eq!(
            DecimalRange::new(0.0, 1.0, 400),
            Err(ValidationError::PrecisionTooLarge {
                precision: 400,
                max: DecimalRange::MAX_PRECISION,
            })
        );
        assert!(DecimalRange::new(0.0, 1.0, DecimalRange::MAX_PRECISION).is_ok());
    }

    #[test]
    fn should_refuse_decimal_setter_with_deserialized_oversized_precision() {
        let range: DecimalRange =
            serde_json::from_str(r#"{"lower":0.0,"upper":1.0,"precision":400}"#).unwrap();
        let result = DecimalSetterActuator::new(blueprint(ActuatorProperties::DecimalRange(range)));
        assert!(matches!(
            result,
            Err(ValidationError::PrecisionTooLarge { .. })
        ));
    }

    #[test]
    fn should_reject_integer_values_beyond_i64() {
        let range = IntegerRange::new(0, i64::MAX).unwrap();
        let actuator = builtin_factory()
            .create(
                Some("IntegerSetterActuator"),
                blueprint(ActuatorProperties::IntegerRange(range)),
            )
            .unwrap();
        assert!(actuator.set_value(1e19).is_err());
        assert!(actuator.set_value(2_f64.powi(63)).is_err());
        assert_eq!(actuator.set_value(1e18), Ok(1e18));
    }

    #[test]
    fn should_round_half_up_to_precision() {
        let range = DecimalRange::new(0.0, 100.0, 1).unwrap();
        assert!((range.round(21.25) - 21.3).abs() < 1e-9);
        assert!((range.round(21.24) - 21.2).abs() < 1e-9);
    }

    #[test]
    fn should_create_switch_without_properties() {
        let actuator = builtin_factory()
            .create(Some("SwitchActuator"), blueprint(ActuatorProperties::None))
            .unwrap();
        assert_eq!(actuator.identity().as_str(), "Actuator001");
        assert_eq!(actuator.set_value(1.0), Ok(1.0));
        assert!(actuator.set_value(2.0).is_err());
    }

    #[test]
    fn should_return_none_when_integer_setter_lacks_range() {
        let factory = builtin_factory();
        assert!(factory
            .create(Some("IntegerSetterActuator"), blueprint(ActuatorProperties::None))
            .is_none());
    }

    #[test]
    fn should_return_none_when_switch_given_range() {
        let range = IntegerRange::new(0, 10).unwrap();
        let result = builtin_factory().try_create(
            Some("SwitchActuator"),
            blueprint(ActuatorProperties::IntegerRange(range)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn should_accept_values_inside_integer_range() {
        let range = IntegerRange::new(-5, 5).unwrap();
        let actuator = builtin_factory()
            .create(
                Some("IntegerSetterActuator"),
                blueprint(ActuatorProperties::IntegerRange(range)),
            )
            .unwrap();
        assert_eq!(actuator.set_value(5.0), Ok(5.0));
        assert!(actuator.set_value(6.0).is_err());
        assert!(actuator.set_value(1.5).is_err());
    }

    #[test]
    fn should_round_before_checking_decimal_range() {
        let range = DecimalRange::new(0.0, 10.0, 2).unwrap();
        let actuator = builtin_factory()
            .create(
                Some("DecimalSetterActuator"),
                blueprint(ActuatorProperties::DecimalRange(range)),
            )
            .unwrap();
        let applied = actuator.set_value(3.14159).unwrap();
        assert!((applied - 3.14).abs() < 1e-9);
        assert!(actuator.set_value(10.5).is_err());
    }

    #[test]
    fn should_bound_blind_setter_to_percentage() {
        let actuator = builtin_factory()
            .create(Some("BlindSetterActuator"), blueprint(ActuatorProperties::None))
            .unwrap();
        assert_eq!(actuator.set_value(0.0), Ok(0.0));
        assert!(actuator.set_value(100.1).is_err());
    }
}
