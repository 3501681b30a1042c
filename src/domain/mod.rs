mod container;
mod error;
pub mod exec;
pub mod kitchen;
mod output;
pub mod registry;
pub mod semver;
mod state;
pub mod traits;

pub use container::{ContainerDetails, NetworkSettings, PortBinding, SERVICE_PORT};
pub use error::EngineError;
pub use exec::{ExecContext, RenderError};
pub use kitchen::{DriverConfig, Instance, KitchenConfig, Platform, STATE_DIR, Suite};
pub use output::CommandOutput;
pub use registry::{Credentials, LIFECYCLE_POLICY, RegistryAuth, RepositoryStatus};
pub use semver::BumpKind;
pub use state::InstanceState;
pub use traits::{ContainerEngine, CookbookCatalog, KitchenAction, KitchenDriver, RegistryApi};
