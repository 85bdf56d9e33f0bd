//! # smarthome-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Repository` — save, update, reserve and query any aggregate
//!   - `HouseRepository`, `RoomRepository`, `DeviceRepository`,
//!     `SensorRepository`, `ActuatorRepository` — aggregate specific finders
//!   - `ValueRepository`, `InstantValueRepository` — time-series readings
//!   - `CapabilitySource` — raw functionality configuration
//! - Assemble the capability registries and factories at startup
//!   ([`capabilities::Capabilities`])
//! - Provide **driving/inbound ports** as use-case structs:
//!   - `HouseService`, `RoomService`, `DeviceService`
//!   - `SensorService`, `ActuatorService`, `FunctionalityService`
//!   - `ValueService` — record readings, query windows, peak power
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `smarthome-domain` only. Never imports adapter crates. Adapters
//! depend on *this* crate, not the reverse.

pub mod capabilities;
pub mod ports;
pub mod services;
