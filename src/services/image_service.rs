use crate::domain::{CommandOutput, ContainerEngine, LIFECYCLE_POLICY, RegistryApi, RepositoryStatus};
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Moves images between the local engine and the registry.
///
/// Every pull and push logs in again: registry tokens are short-lived and
/// nothing is cached between calls.
pub struct ImageService {
    engine: Arc<dyn ContainerEngine>,
    registry: Arc<dyn RegistryApi>,
}

impl ImageService {
    pub fn new(engine: Arc<dyn ContainerEngine>, registry: Arc<dyn RegistryApi>) -> Self {
        Self { engine, registry }
    }

    fn login(&self) -> Result<()> {
        let auth = self.registry.authorization()?;
        let output = self.engine.login(&auth)?;
        if !output.success {
            bail!("docker login to {} failed: {}", auth.server, output.message());
        }
        debug!("Logged in to {}", auth.server);
        Ok(())
    }

    fn report(output: CommandOutput, what: &str) -> bool {
        if !output.success {
            warn!("Failed to {what}: {}", output.message());
        }
        output.success
    }

    /// Public base images pull fine without a registry login, so a failed
    /// login only logs
    pub fn pull(&self, image: &str) -> Result<bool> {
        debug!("Pulling {image}");
        if let Err(e) = self.login() {
            warn!("Registry login failed, pulling anyway: {e:#}");
        }
        let output = self.engine.pull(image)?;
        Ok(Self::report(output, &format!("pull {image}")))
    }

    /// Refreshes `source` (best effort) then tags it as `target`
    pub fn tag(&self, source: &str, target: &str) -> Result<bool> {
        if !self.pull(source)? {
            debug!("Tagging the local copy of {source}");
        }
        let output = self.engine.tag(source, target)?;
        Ok(Self::report(output, &format!("tag {source} as {target}")))
    }

    pub fn commit(&self, container_id: &str, image: &str) -> Result<bool> {
        let output = self.engine.commit(container_id, image)?;
        Ok(Self::report(output, &format!("commit {container_id} to {image}")))
    }

    /// Publishes `image`, making sure `repository` exists and carries the
    /// retention policy first
    pub fn push(&self, repository: &str, image: &str) -> Result<bool> {
        self.login().context("logging in to the registry")?;

        match self.registry.create_repository(repository)? {
            RepositoryStatus::Created => info!("Created repository {repository}"),
            RepositoryStatus::AlreadyExists => info!("Repository {repository} already exists"),
        }

        if let Err(e) = self.registry.put_lifecycle_policy(repository, LIFECYCLE_POLICY) {
            warn!("Could not set the lifecycle policy on {repository}, you should upgrade your aws cli: {e:#}");
        }

        let output = self.engine.push(image)?;
        Ok(Self::report(output, &format!("push {image}")))
    }

    pub fn remove(&self, image: &str) -> Result<bool> {
        debug!("Deleting {image}");
        let output = self.engine.remove_image(image)?;
        Ok(Self::report(output, &format!("remove {image}")))
    }
}
