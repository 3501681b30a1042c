use crate::domain::{ContainerEngine, EngineError, ExecContext, Instance, SERVICE_PORT};
use crate::services::{KitchenService, StateStore};
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Works around resolv.conf being unreadable for non-root users after the
/// engine rewrites it on start
pub const POST_START_COMMAND: &str = "sudo chmod 644 /etc/resolv.conf";

/// Lifecycle of one instance's container: start, shutdown, delete, address
pub struct InstanceService {
    engine: Arc<dyn ContainerEngine>,
    store: Arc<StateStore>,
    kitchen: Arc<KitchenService>,
}

impl InstanceService {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        store: Arc<StateStore>,
        kitchen: Arc<KitchenService>,
    ) -> Self {
        Self {
            engine,
            store,
            kitchen,
        }
    }

    pub fn container_id(&self, instance: &Instance) -> Result<Option<String>> {
        self.store.container_id(instance)
    }

    /// Container id on record, or an error naming the instance
    pub fn require_container_id(&self, instance: &Instance) -> Result<String> {
        match self.container_id(instance)? {
            Some(id) => Ok(id),
            None => bail!("{} has no container, run `kim create` first", instance.name),
        }
    }

    pub fn port(&self, instance: &Instance) -> Result<Option<u16>> {
        self.store.port(instance)
    }

    /// Current engine address; `None` when never created or gone
    pub fn ip(&self, instance: &Instance) -> Result<Option<String>> {
        let Some(container_id) = self.container_id(instance)? else {
            return Ok(None);
        };

        match self.engine.inspect_container(&container_id) {
            Ok(details) => Ok(details.ip_address().map(str::to_string)),
            Err(EngineError::ContainerNotFound(id)) => {
                debug!("Address of {}: container {id} not found", instance.name);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Starts the container and records its ssh host port.
    ///
    /// Returns `false` when the instance was never created. A container that
    /// vanished behind kitchen's back gets the instance destroyed instead.
    pub fn start(&self, instance: &Instance) -> Result<bool> {
        let Some(container_id) = self.container_id(instance)? else {
            debug!("{} has no container yet", instance.name);
            return Ok(false);
        };

        match self.start_container(instance, &container_id) {
            Ok(()) => {}
            Err(e) if is_not_found(&e) => {
                debug!("Start {}: {e:#}", instance.name);
                info!("Container of {} is gone, destroying the instance", instance.name);
                if let Err(e) = self.kitchen.destroy(Some(&instance.name)) {
                    warn!("Destroying {} failed: {e:#}", instance.name);
                }
                return Ok(true);
            }
            Err(e) => return Err(e),
        }

        if !self.exec(instance, POST_START_COMMAND)? {
            warn!("`{POST_START_COMMAND}` failed on {}", instance.name);
        }
        Ok(true)
    }

    fn start_container(&self, instance: &Instance, container_id: &str) -> Result<()> {
        self.engine.start_container(container_id)?;

        let mut state = self
            .store
            .read_state(instance)?
            .with_context(|| format!("state of {} disappeared during start", instance.name))?;

        let details = self.engine.inspect_container(container_id)?;
        let port = details.host_port(SERVICE_PORT).with_context(|| {
            format!("{} has no host port bound to {SERVICE_PORT}", instance.name)
        })?;

        state.port = Some(port);
        self.store.write_state(instance, &state)?;
        info!("{} started, ssh on host port {port}", instance.name);
        Ok(())
    }

    /// Already stopped, never created or gone all count as success
    pub fn shutdown(&self, instance: &Instance) -> Result<bool> {
        let Some(container_id) = self.container_id(instance)? else {
            debug!("Shutdown {}: nothing to stop", instance.name);
            return Ok(true);
        };

        match self.engine.stop_container(&container_id) {
            Ok(()) => Ok(true),
            Err(EngineError::ContainerNotFound(id)) => {
                debug!("Shutdown {}: container {id} not found", instance.name);
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Force-removes the container; `false` when there is none on record
    pub fn delete(&self, instance: &Instance) -> Result<bool> {
        let Some(container_id) = self.container_id(instance)? else {
            return Ok(false);
        };

        match self.engine.remove_container(&container_id) {
            Ok(()) => Ok(true),
            Err(EngineError::ContainerNotFound(id)) => {
                debug!("Delete {}: container {id} not found", instance.name);
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Facts `command` can interpolate. The engine is only asked for the
    /// address when `command` uses `{container_ipaddress}`.
    pub fn exec_context(&self, instance: &Instance, command: &str) -> Result<ExecContext> {
        let container_ipaddress = if ExecContext::mentions(command, "container_ipaddress") {
            self.ip(instance)?
        } else {
            None
        };

        Ok(ExecContext {
            instance: instance.name.clone(),
            suite: instance.suite.name.clone(),
            container_id: self.container_id(instance)?,
            container_ipaddress,
            instance_conf_file: instance.state_file().to_string_lossy().into_owned(),
        })
    }

    /// Runs `command` on the instance through kitchen, placeholders filled in
    pub fn exec(&self, instance: &Instance, command: &str) -> Result<bool> {
        let context = self.exec_context(instance, command)?;
        self.kitchen.exec(command, &context)
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<EngineError>()
        .is_some_and(EngineError::is_not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstanceState, Platform, Suite};
    use crate::test_support::{MockEngine, MockKitchen};

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<StateStore>,
        engine: Arc<MockEngine>,
        kitchen: Arc<MockKitchen>,
        service: InstanceService,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::new(dir.path()));
        let engine = Arc::new(MockEngine::new());
        let kitchen = Arc::new(MockKitchen::new());
        let service = InstanceService::new(
            engine.clone(),
            store.clone(),
            Arc::new(KitchenService::new(kitchen.clone())),
        );
        Fixture {
            _dir: dir,
            store,
            engine,
            kitchen,
            service,
        }
    }

    fn instance() -> Instance {
        Instance::new(Platform::new("buster", None), Suite::new("default"))
    }

    #[test]
    fn test_start_without_state_file_reports_false() {
        let f = fixture();
        assert!(!f.service.start(&instance()).unwrap());
        assert!(f.engine.get_commands().is_empty());
    }

    #[test]
    fn test_start_records_port_and_fixes_resolv_conf() {
        let f = fixture();
        let mut state = InstanceState::new("123abc");
        state
            .extra
            .insert("hostname".into(), "localhost".into());
        f.store.write_state(&instance(), &state).unwrap();
        f.engine.add_container("123abc", "192.168.10.0", 12345);

        assert!(f.service.start(&instance()).unwrap());

        let state = f.store.read_state(&instance()).unwrap().unwrap();
        assert_eq!(state.port, Some(12345));
        assert!(state.extra.contains_key("hostname"));
        assert!(f.engine.is_running("123abc"));
        assert_eq!(
            f.kitchen.get_commands(),
            vec![format!("exec:default-buster:{POST_START_COMMAND}")]
        );
    }

    #[test]
    fn test_start_of_vanished_container_destroys_instance() {
        let f = fixture();
        f.store
            .write_state(&instance(), &InstanceState::new("gone"))
            .unwrap();

        assert!(f.service.start(&instance()).unwrap());
        assert_eq!(f.kitchen.get_commands(), vec!["destroy:default-buster"]);
    }

    #[test]
    fn test_start_surfaces_other_engine_errors() {
        let f = fixture();
        f.store
            .write_state(&instance(), &InstanceState::new("123abc"))
            .unwrap();
        f.engine.add_container("123abc", "10.0.0.2", 2222);
        f.engine.set_fail_on("start");

        assert!(f.service.start(&instance()).is_err());
        assert!(f.kitchen.get_commands().is_empty());
    }

    #[test]
    fn test_start_tolerates_failing_post_start_command() {
        let f = fixture();
        f.store
            .write_state(&instance(), &InstanceState::new("123abc"))
            .unwrap();
        f.engine.add_container("123abc", "10.0.0.2", 2222);
        f.kitchen.set_fail_on("exec");

        assert!(f.service.start(&instance()).unwrap());
    }

    #[test]
    fn test_shutdown_delete_ip_tolerate_missing_container() {
        let f = fixture();
        f.store
            .write_state(&instance(), &InstanceState::new("gone"))
            .unwrap();

        assert!(f.service.shutdown(&instance()).unwrap());
        assert!(f.service.delete(&instance()).unwrap());
        assert_eq!(f.service.ip(&instance()).unwrap(), None);
    }

    #[test]
    fn test_operations_without_state_file() {
        let f = fixture();
        assert!(f.service.shutdown(&instance()).unwrap());
        assert!(!f.service.delete(&instance()).unwrap());
        assert_eq!(f.service.ip(&instance()).unwrap(), None);
        assert!(f.service.require_container_id(&instance()).is_err());
    }

    #[test]
    fn test_shutdown_and_delete_running_container() {
        let f = fixture();
        f.store
            .write_state(&instance(), &InstanceState::new("123abc"))
            .unwrap();
        f.engine.add_container("123abc", "10.0.0.2", 2222);
        f.engine.set_running("123abc", true);

        assert_eq!(f.service.ip(&instance()).unwrap().as_deref(), Some("10.0.0.2"));
        assert!(f.service.shutdown(&instance()).unwrap());
        assert!(!f.engine.is_running("123abc"));
        assert!(f.service.delete(&instance()).unwrap());
        assert!(!f.engine.container_exists("123abc"));
    }

    #[test]
    fn test_exec_context_reflects_instance_facts() {
        let f = fixture();
        f.store
            .write_state(&instance(), &InstanceState::new("123abc"))
            .unwrap();
        f.engine.add_container("123abc", "10.0.0.2", 2222);

        let context = f
            .service
            .exec_context(&instance(), "ping {container_ipaddress}")
            .unwrap();
        assert_eq!(context.instance, "default-buster");
        assert_eq!(context.suite, "default");
        assert_eq!(context.container_id.as_deref(), Some("123abc"));
        assert_eq!(context.container_ipaddress.as_deref(), Some("10.0.0.2"));
        assert_eq!(context.instance_conf_file, ".kitchen/default-buster.yml");
    }

    #[test]
    fn test_exec_skips_address_lookup_when_unused() {
        let f = fixture();
        f.store
            .write_state(&instance(), &InstanceState::new("123abc"))
            .unwrap();
        f.engine.add_container("123abc", "10.0.0.2", 2222);
        f.engine.set_fail_on("inspect");

        assert!(f.service.exec(&instance(), "uptime").unwrap());
        assert!(!f.engine.get_commands().iter().any(|c| c.starts_with("inspect")));
        assert!(f.service.exec(&instance(), "ping {container_ipaddress}").is_err());
    }
}
