//! Application services — use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod actuator_service;
pub mod device_service;
pub mod functionality_service;
pub mod house_service;
pub mod room_service;
pub mod sensor_service;
pub mod value_service;

#[cfg(test)]
mod test_support;
