pub mod docker_adapter;
pub mod ecr_registry;
pub mod files;
pub mod kitchen_cli;
pub mod knife_catalog;
pub mod process;
pub mod settings;
pub mod telemetry;

pub use docker_adapter::DockerAdapter;
pub use ecr_registry::EcrRegistry;
pub use kitchen_cli::KitchenCli;
pub use knife_catalog::KnifeCatalog;
pub use settings::Settings;
