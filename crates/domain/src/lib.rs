//! # smarthome-domain
//!
//! Pure domain model for the smarthome system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define the spatial aggregates (**houses**, **rooms**, **devices**)
//! - Define **sensors** and **actuators** as trait objects whose concrete kind
//!   is chosen at runtime from configuration
//! - Define the **capability registry** (functionality → implementation, unit,
//!   service method) and the **dynamic factory** that instantiates kinds by name
//! - Define recorded **values** in their three temporal shapes
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod time;

pub mod actuator;
pub mod device;
pub mod factory;
pub mod house;
pub mod location;
pub mod reading;
pub mod registry;
pub mod room;
pub mod sensor;
pub mod value;
