use crate::domain::{
    CommandOutput, ContainerDetails, ContainerEngine, CookbookCatalog, Credentials,
    EngineError, KitchenAction, KitchenDriver, NetworkSettings, PortBinding, RegistryApi,
    RegistryAuth, RepositoryStatus, SERVICE_PORT,
};
use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

pub const MOCK_REGISTRY: &str = "registry.test";

/// Records every call as `operation:arg[:arg]` and fails the ones named
/// through `set_fail_on` (an operation name or a full recorded prefix)
#[derive(Debug, Default)]
struct Recorder {
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<HashSet<String>>,
}

impl Recorder {
    fn record(&self, operation: &str, args: &[&str]) -> bool {
        let mut entry = operation.to_string();
        for arg in args {
            entry.push(':');
            entry.push_str(arg);
        }

        let fail = self.fail_on.read().unwrap().iter().any(|rule| {
            rule == operation || entry == *rule || entry.starts_with(&format!("{rule}:"))
        });
        self.commands.write().unwrap().push(entry);
        fail
    }

    fn set_fail_on(&self, rule: &str) {
        self.fail_on.write().unwrap().insert(rule.to_string());
    }

    fn commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
pub struct MockContainer {
    pub id: String,
    pub running: bool,
    pub ip_address: String,
    pub host_port: u16,
}

/// In-memory container engine: images are a set, containers a map by id
#[derive(Debug, Default)]
pub struct MockEngine {
    recorder: Recorder,
    images: RwLock<HashSet<String>>,
    containers: RwLock<HashMap<String, MockContainer>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&self, image: &str) {
        self.images.write().unwrap().insert(image.to_string());
    }

    pub fn has_image(&self, image: &str) -> bool {
        self.images.read().unwrap().contains(image)
    }

    /// Adds a stopped container publishing `22/tcp` on `host_port`
    pub fn add_container(&self, id: &str, ip_address: &str, host_port: u16) {
        self.containers.write().unwrap().insert(
            id.to_string(),
            MockContainer {
                id: id.to_string(),
                running: false,
                ip_address: ip_address.to_string(),
                host_port,
            },
        );
    }

    pub fn set_running(&self, id: &str, running: bool) {
        if let Some(container) = self.containers.write().unwrap().get_mut(id) {
            container.running = running;
        }
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.containers
            .read()
            .unwrap()
            .get(id)
            .is_some_and(|c| c.running)
    }

    pub fn container_exists(&self, id: &str) -> bool {
        self.containers.read().unwrap().contains_key(id)
    }

    pub fn set_fail_on(&self, rule: &str) {
        self.recorder.set_fail_on(rule);
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.recorder.commands()
    }

    fn image_op(&self, operation: &str, args: &[&str], succeeds: bool) -> CommandOutput {
        if self.recorder.record(operation, args) {
            return CommandOutput::failed(1, format!("mock failure on {operation}"));
        }
        if succeeds {
            CommandOutput::ok("")
        } else {
            CommandOutput::failed(1, format!("{operation}: no such image {}", args[0]))
        }
    }

    fn container_op<F>(&self, operation: &str, id: &str, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut HashMap<String, MockContainer>),
    {
        if self.recorder.record(operation, &[id]) {
            return Err(EngineError::CommandFailed {
                command: format!("docker {operation} {id}"),
                output: CommandOutput::failed(1, format!("mock failure on {operation}")),
            });
        }

        let mut containers = self.containers.write().unwrap();
        if !containers.contains_key(id) {
            return Err(EngineError::ContainerNotFound(id.to_string()));
        }
        f(&mut containers);
        Ok(())
    }
}

impl ContainerEngine for MockEngine {
    fn login(&self, auth: &RegistryAuth) -> Result<CommandOutput, EngineError> {
        Ok(self.image_op("login", &[auth.server.as_str()], true))
    }

    fn pull(&self, image: &str) -> Result<CommandOutput, EngineError> {
        let known = self.has_image(image);
        Ok(self.image_op("pull", &[image], known))
    }

    fn tag(&self, source: &str, target: &str) -> Result<CommandOutput, EngineError> {
        let output = self.image_op("tag", &[source, target], self.has_image(source));
        if output.success {
            self.add_image(target);
        }
        Ok(output)
    }

    fn commit(&self, container_id: &str, image: &str) -> Result<CommandOutput, EngineError> {
        let exists = self.container_exists(container_id);
        let output = self.image_op("commit", &[container_id, image], exists);
        if output.success {
            self.add_image(image);
        }
        Ok(output)
    }

    fn push(&self, image: &str) -> Result<CommandOutput, EngineError> {
        let known = self.has_image(image);
        Ok(self.image_op("push", &[image], known))
    }

    fn remove_image(&self, image: &str) -> Result<CommandOutput, EngineError> {
        let output = self.image_op("rmi", &[image], self.has_image(image));
        if output.success {
            self.images.write().unwrap().remove(image);
        }
        Ok(output)
    }

    fn start_container(&self, container_id: &str) -> Result<(), EngineError> {
        self.container_op("start", container_id, |containers| {
            if let Some(c) = containers.get_mut(container_id) {
                c.running = true;
            }
        })
    }

    fn stop_container(&self, container_id: &str) -> Result<(), EngineError> {
        self.container_op("stop", container_id, |containers| {
            if let Some(c) = containers.get_mut(container_id) {
                c.running = false;
            }
        })
    }

    fn remove_container(&self, container_id: &str) -> Result<(), EngineError> {
        self.container_op("rm", container_id, |containers| {
            containers.remove(container_id);
        })
    }

    fn inspect_container(&self, container_id: &str) -> Result<ContainerDetails, EngineError> {
        let mut details = None;
        self.container_op("inspect", container_id, |containers| {
            let c = &containers[container_id];
            let binding = PortBinding {
                host_ip: "0.0.0.0".to_string(),
                host_port: c.host_port.to_string(),
            };
            details = Some(ContainerDetails {
                id: c.id.clone(),
                network_settings: NetworkSettings {
                    ip_address: c.ip_address.clone(),
                    ports: Some(HashMap::from([(
                        SERVICE_PORT.to_string(),
                        Some(vec![binding]),
                    )])),
                },
            });
        })?;
        details.ok_or_else(|| EngineError::ContainerNotFound(container_id.to_string()))
    }
}

/// Test-kitchen stand-in: records `action[:instance]` and
/// `exec:instance:command`
#[derive(Debug, Default)]
pub struct MockKitchen {
    recorder: Recorder,
}

impl MockKitchen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on(&self, rule: &str) {
        self.recorder.set_fail_on(rule);
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.recorder.commands()
    }

    fn outcome(failed: bool) -> CommandOutput {
        CommandOutput {
            success: !failed,
            exit_code: Some(if failed { 1 } else { 0 }),
            ..Default::default()
        }
    }
}

impl KitchenDriver for MockKitchen {
    fn run(&self, action: KitchenAction, instance: Option<&str>) -> Result<CommandOutput> {
        let args: Vec<&str> = instance.into_iter().collect();
        Ok(Self::outcome(self.recorder.record(action.as_str(), &args)))
    }

    fn exec(&self, instance: &str, command: &str) -> Result<CommandOutput> {
        Ok(Self::outcome(self.recorder.record("exec", &[instance, command])))
    }
}

/// Registry stand-in keeping repositories and their policies in memory
#[derive(Debug, Default)]
pub struct MockRegistry {
    recorder: Recorder,
    repositories: RwLock<HashSet<String>>,
    policies: RwLock<HashMap<String, String>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on(&self, rule: &str) {
        self.recorder.set_fail_on(rule);
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.recorder.commands()
    }

    pub fn authorizations(&self) -> usize {
        self.get_commands()
            .iter()
            .filter(|c| c.as_str() == "authorization")
            .count()
    }

    pub fn add_repository(&self, repository: &str) {
        self.repositories
            .write()
            .unwrap()
            .insert(repository.to_string());
    }

    pub fn has_repository(&self, repository: &str) -> bool {
        self.repositories.read().unwrap().contains(repository)
    }

    pub fn policy(&self, repository: &str) -> Option<String> {
        self.policies.read().unwrap().get(repository).cloned()
    }
}

impl RegistryApi for MockRegistry {
    fn authorization(&self) -> Result<RegistryAuth> {
        if self.recorder.record("authorization", &[]) {
            bail!("Mock failure on: authorization");
        }
        Ok(RegistryAuth {
            server: MOCK_REGISTRY.to_string(),
            credentials: Credentials {
                username: "AWS".to_string(),
                password: "token".to_string(),
            },
        })
    }

    fn create_repository(&self, repository: &str) -> Result<RepositoryStatus> {
        if self.recorder.record("create_repository", &[repository]) {
            bail!("Mock failure on: create_repository");
        }
        if self
            .repositories
            .write()
            .unwrap()
            .insert(repository.to_string())
        {
            Ok(RepositoryStatus::Created)
        } else {
            Ok(RepositoryStatus::AlreadyExists)
        }
    }

    fn put_lifecycle_policy(&self, repository: &str, policy: &str) -> Result<()> {
        if self.recorder.record("put_lifecycle_policy", &[repository]) {
            bail!("Mock failure on: put_lifecycle_policy");
        }
        self.policies
            .write()
            .unwrap()
            .insert(repository.to_string(), policy.to_string());
        Ok(())
    }
}

/// Catalog that always reports the same published version
#[derive(Debug)]
pub struct MockCatalog {
    version: String,
    lookups: RwLock<Vec<String>>,
}

impl MockCatalog {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            lookups: RwLock::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.read().unwrap().clone()
    }
}

impl CookbookCatalog for MockCatalog {
    fn cookbook_version(&self, cookbook: &str) -> Result<String> {
        self.lookups.write().unwrap().push(cookbook.to_string());
        Ok(self.version.clone())
    }
}
