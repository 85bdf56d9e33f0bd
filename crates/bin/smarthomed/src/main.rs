//! # smarthomed — smarthome daemon
//!
//! Composition root that wires all adapters together.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Load the capability file and build registries and factories
//! - Select the storage backend, initializing the `SQLite` pool and running
//!   migrations when needed
//! - Construct application services, injecting repositories via port traits
//! - Load the demo house when enabled and log a summary
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod bootstrap;
mod config;
mod services;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use smarthome_adapter_config_toml::TomlCapabilitySource;
use smarthome_adapter_storage_memory::MemoryStorage;
use smarthome_adapter_storage_sqlite_sqlx::SqliteStorage;
use smarthome_adapter_storage_sqlite_sqlx::pool::Config as DatabaseConfig;
use smarthome_app::capabilities::Capabilities;
use smarthome_app::ports::Storage;

use crate::config::{Config, StorageBackend};
use crate::services::Services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let source = TomlCapabilitySource::load(&config.capabilities.path);
    let capabilities = Capabilities::load(&source);

    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage");
            run(&config, &MemoryStorage::new(), &capabilities).await
        }
        StorageBackend::Sqlite => {
            tracing::info!(url = config.database_url(), "using sqlite storage");
            let db = DatabaseConfig {
                database_url: config.database_url().to_string(),
            }
            .build()
            .await
            .context("failed to open database")?;
            let storage = SqliteStorage::new(db.pool().clone(), capabilities.clone());
            run(&config, &storage, &capabilities).await
        }
    }
}

async fn run<S: Storage>(
    config: &Config,
    storage: &S,
    capabilities: &Capabilities,
) -> anyhow::Result<()> {
    let services = Services::new(storage, capabilities);

    if config.bootstrap.demo_data {
        bootstrap::load_demo_data(&services)
            .await
            .context("failed to load demo data")?;
    }

    let houses = services.houses.list_houses().await?;
    let mut rooms = 0;
    let mut devices = 0;
    for house in &houses {
        rooms += services.rooms.list_rooms_in_house(&house.id).await?.len();
        devices += services.devices.list_devices_in_house(&house.id).await?.len();
    }

    tracing::info!(
        sensor_functionalities = services.functionalities.sensor_functionalities().len(),
        actuator_functionalities = services.functionalities.actuator_functionalities().len(),
        houses = houses.len(),
        rooms,
        devices,
        "smarthomed ready"
    );
    Ok(())
}
