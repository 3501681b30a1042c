use crate::domain::{Instance, InstanceState};
use crate::infra::files::{load_yaml_if_exists, write_yaml};
use anyhow::Result;
use std::path::PathBuf;

/// Per-instance state files under the cookbook's `.kitchen/` directory.
///
/// Each CLI invocation starts from nothing, so every read goes to disk.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn state_path(&self, instance: &Instance) -> PathBuf {
        self.root.join(instance.state_file())
    }

    /// `Ok(None)` when the instance was never created; a file that exists but
    /// does not parse (or lacks `container_id`) is an error
    pub fn read_state(&self, instance: &Instance) -> Result<Option<InstanceState>> {
        load_yaml_if_exists(&self.state_path(instance))
    }

    /// Replaces the whole file; merge with [`Self::read_state`] first to keep fields
    pub fn write_state(&self, instance: &Instance, state: &InstanceState) -> Result<()> {
        write_yaml(&self.state_path(instance), state)
    }

    pub fn container_id(&self, instance: &Instance) -> Result<Option<String>> {
        Ok(self.read_state(instance)?.map(|state| state.container_id))
    }

    pub fn port(&self, instance: &Instance) -> Result<Option<u16>> {
        Ok(self.read_state(instance)?.and_then(|state| state.port))
    }
}
