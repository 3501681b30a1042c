pub mod cli;
pub mod domain;
pub mod infra;
pub mod services;

// Shared by unit and integration tests
pub mod test_support;

pub use cli::{App, Backends};
pub use domain::{ContainerEngine, CookbookCatalog, Instance, KitchenConfig, KitchenDriver, RegistryApi};
pub use infra::Settings;
pub use services::{Orchestrator, TestOptions};
