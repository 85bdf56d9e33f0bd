//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SmartHomeError`] via `#[from]`. Resolution misses (unknown functionality,
//! unknown implementation) are not errors at the registry or factory level;
//! they are `Option`s that services turn into [`CapabilityError`] when they
//! need to report them.

/// Base error returned by application services and repository ports.
#[derive(Debug, thiserror::Error)]
pub enum SmartHomeError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Failure raised by a persistence backend.
    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// A value object or aggregate refused its construction arguments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("range upper limit {upper} is below lower limit {lower}")]
    InvertedRange { lower: f64, upper: f64 },

    #[error("range limits must be finite numbers")]
    NonFiniteLimit,

    #[error("precision {precision} exceeds the supported {max} decimal places")]
    PrecisionTooLarge { precision: u32, max: u32 },

    #[error("room {0} must be positive")]
    NonPositiveDimension(&'static str),

    #[error("room height must not be negative")]
    NegativeHeight,

    #[error("{kind} requires {expected} properties")]
    UnsupportedProperties {
        kind: &'static str,
        expected: &'static str,
    },

    #[error("value {value} is outside the accepted range of {kind}")]
    OutOfRange { kind: &'static str, value: f64 },
}

/// Lookup of an aggregate that does not exist.
#[derive(Debug, thiserror::Error)]
#[error("{entity} `{id}` not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// The request contradicts the current state of the stored aggregates.
#[derive(Debug, thiserror::Error)]
pub enum ConflictError {
    #[error("{entity} `{id}` already exists")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("device `{0}` is deactivated")]
    DeviceInactive(String),

    /// A reservation was taken but the aggregate changed before the write.
    #[error("{entity} `{id}` was modified concurrently")]
    StaleReservation { entity: &'static str, id: String },
}

/// A functionality could not be resolved to a concrete sensor or actuator.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("functionality `{0}` is not listed in the capability configuration")]
    NotListed(String),

    #[error("functionality `{functionality}` cannot be instantiated")]
    NotConstructible { functionality: String },
}
