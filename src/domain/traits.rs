use super::{CommandOutput, ContainerDetails, EngineError, RegistryAuth, RepositoryStatus};
use anyhow::Result;
use std::fmt::{self, Debug};

/// Container engine operations (docker CLI semantics).
///
/// Image operations report the engine's own pass/fail through
/// `CommandOutput::success`; `Err` is reserved for not being able to run
/// the engine at all. Container operations surface a missing container as
/// `EngineError::ContainerNotFound`.
pub trait ContainerEngine: Send + Sync + Debug {
    /// Authenticate against a registry
    fn login(&self, auth: &RegistryAuth) -> Result<CommandOutput, EngineError>;

    fn pull(&self, image: &str) -> Result<CommandOutput, EngineError>;

    fn tag(&self, source: &str, target: &str) -> Result<CommandOutput, EngineError>;

    /// Snapshot a container's filesystem into `image`
    fn commit(&self, container_id: &str, image: &str) -> Result<CommandOutput, EngineError>;

    fn push(&self, image: &str) -> Result<CommandOutput, EngineError>;

    /// Remove a local image (`rmi`)
    fn remove_image(&self, image: &str) -> Result<CommandOutput, EngineError>;

    fn start_container(&self, container_id: &str) -> Result<(), EngineError>;

    fn stop_container(&self, container_id: &str) -> Result<(), EngineError>;

    /// Force-remove a container, running or not
    fn remove_container(&self, container_id: &str) -> Result<(), EngineError>;

    fn inspect_container(&self, container_id: &str) -> Result<ContainerDetails, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KitchenAction {
    Create,
    Converge,
    Destroy,
    Verify,
    Login,
}

impl KitchenAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Converge => "converge",
            Self::Destroy => "destroy",
            Self::Verify => "verify",
            Self::Login => "login",
        }
    }
}

impl fmt::Display for KitchenAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The test-kitchen command line
pub trait KitchenDriver: Send + Sync + Debug {
    /// `kitchen <action> [instance]`; `None` targets the whole fleet
    fn run(&self, action: KitchenAction, instance: Option<&str>) -> Result<CommandOutput>;

    /// `kitchen exec <instance> -c <command>`
    fn exec(&self, instance: &str, command: &str) -> Result<CommandOutput>;
}

/// Cloud registry control plane (ECR)
pub trait RegistryApi: Send + Sync + Debug {
    /// Fetch a fresh short-lived login
    fn authorization(&self) -> Result<RegistryAuth>;

    fn create_repository(&self, repository: &str) -> Result<RepositoryStatus>;

    fn put_lifecycle_policy(&self, repository: &str, policy: &str) -> Result<()>;
}

/// Where released cookbook versions are looked up (chef server via knife)
pub trait CookbookCatalog: Send + Sync + Debug {
    /// Latest published version, `0.0.0` when never published
    fn cookbook_version(&self, cookbook: &str) -> Result<String>;
}
