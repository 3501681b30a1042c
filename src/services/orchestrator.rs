use crate::domain::{Instance, KitchenConfig};
use crate::infra::Settings;
use crate::infra::files::load_yaml;
use crate::services::{ImageService, InstanceService, KitchenService, TemplateService};
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run on every instance between converge and verify; the embedded rubygems
/// is too old for some verifier gems
pub const GEM_UPDATE_COMMAND: &str =
    "sudo /opt/chef/embedded/bin/gem update --no-document --system 3.0.0";

pub const DEFAULT_SUITE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOptions {
    pub suite: String,
    /// Refresh base images instead of using the scoped ones
    pub from_scratch: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            suite: DEFAULT_SUITE.to_string(),
            from_scratch: false,
        }
    }
}

/// Fleet-level workflows over every instance of `.kitchen.yml`.
///
/// Instances are handled one after the other and the first failure aborts
/// the whole command.
pub struct Orchestrator {
    settings: Arc<Settings>,
    images: Arc<ImageService>,
    templates: Arc<TemplateService>,
    instances: Arc<InstanceService>,
    kitchen: Arc<KitchenService>,
}

impl Orchestrator {
    pub fn new(
        settings: Arc<Settings>,
        images: Arc<ImageService>,
        templates: Arc<TemplateService>,
        instances: Arc<InstanceService>,
        kitchen: Arc<KitchenService>,
    ) -> Self {
        Self {
            settings,
            images,
            templates,
            instances,
            kitchen,
        }
    }

    pub fn has_active_config(&self) -> bool {
        self.settings.kitchen_path().exists()
    }

    pub fn active_config(&self) -> Result<KitchenConfig> {
        load_yaml(&self.settings.kitchen_path())
    }

    fn require_active_config(&self) -> Result<KitchenConfig> {
        if !self.has_active_config() {
            bail!(".kitchen.yml does not exist, please run the test command first!");
        }
        self.active_config()
    }

    /// Starts every created instance; instances without a container are skipped
    pub fn start_all(&self) -> Result<()> {
        self.active_config()?.for_each_instance(|instance| {
            if !self.instances.start(instance)? {
                debug!("{} is not created yet, not starting it", instance.name);
            }
            Ok(())
        })
    }

    pub fn shutdown_all(&self) -> Result<()> {
        self.active_config()?.for_each_instance(|instance| {
            if !self.instances.shutdown(instance)? {
                bail!("Failed to shut down {}", instance.name);
            }
            Ok(())
        })
    }

    /// Snapshots every instance into its scoped image and publishes it
    pub fn commit(&self) -> Result<()> {
        self.active_config()?.for_each_instance(|instance| {
            let image = self.scoped_image(instance);
            let published = self
                .commit_instance(instance, &image)
                .with_context(|| format!("Failed pushing {image}"))?;
            if !published {
                bail!("Failed pushing {image}");
            }
            Ok(())
        })
    }

    fn scoped_image(&self, instance: &Instance) -> String {
        self.settings
            .image(&instance.platform.name, &instance.suite.name)
    }

    fn commit_instance(&self, instance: &Instance, image: &str) -> Result<bool> {
        let repository = self
            .settings
            .repository(&instance.platform.name, &instance.suite.name);

        if !self.instances.shutdown(instance)? {
            return Ok(false);
        }
        let container_id = self.instances.require_container_id(instance)?;

        Ok(self.images.commit(&container_id, image)?
            && self.images.push(&repository, image)?
            && self.images.remove(image)?)
    }

    pub fn create(&self) -> Result<()> {
        if !self.kitchen.create(None)? {
            bail!("Create failed");
        }
        Ok(())
    }

    pub fn converge(&self) -> Result<()> {
        if !self.kitchen.converge(None)? {
            bail!("Converge failed");
        }
        Ok(())
    }

    pub fn verify(&self) -> Result<()> {
        if !self.kitchen.verify(None)? {
            bail!("Verify failed");
        }
        Ok(())
    }

    /// Nothing to destroy before `.kitchen.yml` was ever generated
    pub fn destroy(&self, instance: Option<&str>) -> Result<()> {
        if !self.has_active_config() {
            info!("No .kitchen.yml, nothing to destroy");
            return Ok(());
        }
        if !self.kitchen.destroy(instance)? {
            bail!("Destroy failed");
        }
        Ok(())
    }

    /// Runs `command` on every instance, then fails if any of them failed.
    /// An instance the command cannot be rendered for counts as a failure.
    pub fn exec_all(&self, command: &str) -> Result<()> {
        let config = self.require_active_config()?;

        let mut failures = 0;
        config.for_each_instance(|instance| {
            match self.instances.exec(instance, command) {
                Ok(true) => {}
                Ok(false) => {
                    warn!("`{command}` failed on {}", instance.name);
                    failures += 1;
                }
                Err(e) => {
                    warn!("`{command}` could not run on {}: {e:#}", instance.name);
                    failures += 1;
                }
            }
            Ok(())
        })?;

        if failures > 0 {
            bail!("Fail executing {command}");
        }
        Ok(())
    }

    pub fn login(&self, name: &str) -> Result<()> {
        let config = self.active_config()?;
        let Some(instance) = config.find_instance(name) else {
            bail!("No instance named {name} in .kitchen.yml");
        };
        if !self.kitchen.login(&instance.name)? {
            bail!("Failed login to {}", instance.name);
        }
        Ok(())
    }

    /// Full cycle: generate, start what exists, create, converge, verify
    pub fn test(&self, options: &TestOptions) -> Result<()> {
        if self.settings.template_path().exists() {
            self.templates
                .generate(&options.suite, options.from_scratch)?;
        }

        self.start_all()?;
        if !(self.kitchen.create(None)? && self.kitchen.converge(None)?) {
            bail!("Kitchen converge failed");
        }

        self.active_config()?.for_each_instance(|instance| {
            match self.instances.exec(instance, GEM_UPDATE_COMMAND) {
                Ok(true) => {}
                Ok(false) => warn!("Updating rubygems failed on {}", instance.name),
                Err(e) => warn!("Updating rubygems failed on {}: {e:#}", instance.name),
            }
            Ok(())
        })?;

        if !self.kitchen.verify(None)? {
            bail!("Kitchen test failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstanceState;
    use crate::infra::files::write_yaml;
    use crate::services::StateStore;
    use crate::test_support::{MockEngine, MockKitchen, MockRegistry};
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        settings: Arc<Settings>,
        store: Arc<StateStore>,
        engine: Arc<MockEngine>,
        kitchen: Arc<MockKitchen>,
        registry: Arc<MockRegistry>,
        orchestrator: Orchestrator,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("lrqdo_docker");
        fs::create_dir_all(&workdir).unwrap();
        let settings = Arc::new(Settings::new(Some("registry.test".into()), None, &workdir).unwrap());

        let engine = Arc::new(MockEngine::new());
        let kitchen = Arc::new(MockKitchen::new());
        let registry = Arc::new(MockRegistry::new());
        let store = Arc::new(StateStore::new(&workdir));

        let images = Arc::new(ImageService::new(engine.clone(), registry.clone()));
        let kitchen_service = Arc::new(KitchenService::new(kitchen.clone()));
        let templates = Arc::new(TemplateService::new(settings.clone(), images.clone()));
        let instances = Arc::new(InstanceService::new(
            engine.clone(),
            store.clone(),
            kitchen_service.clone(),
        ));
        let orchestrator = Orchestrator::new(
            settings.clone(),
            images,
            templates,
            instances,
            kitchen_service,
        );

        Fixture {
            _dir: dir,
            settings,
            store,
            engine,
            kitchen,
            registry,
            orchestrator,
        }
    }

    fn write_kitchen_yml(f: &Fixture, platforms: &[&str]) -> KitchenConfig {
        let config = KitchenConfig::new(
            platforms
                .iter()
                .map(|name| crate::domain::Platform::new(*name, Some("base:latest")))
                .collect(),
            vec![crate::domain::Suite::new("default")],
        );
        write_yaml(&f.settings.kitchen_path(), &config).unwrap();
        config
    }

    fn create_instance(f: &Fixture, instance: &Instance, container_id: &str) {
        f.store
            .write_state(instance, &InstanceState::new(container_id))
            .unwrap();
        f.engine.add_container(container_id, "10.0.0.2", 2222);
    }

    #[test]
    fn test_start_all_skips_uncreated_instances() {
        let f = fixture();
        let config = write_kitchen_yml(&f, &["buster", "bullseye"]);
        let instances = config.instances();
        create_instance(&f, &instances[1], "b2");

        f.orchestrator.start_all().unwrap();

        assert!(f.engine.is_running("b2"));
        assert_eq!(f.engine.get_commands().first().unwrap(), "start:b2");
    }

    #[test]
    fn test_shutdown_all_stops_every_container() {
        let f = fixture();
        let config = write_kitchen_yml(&f, &["buster", "bullseye"]);
        for (instance, id) in config.instances().iter().zip(["a1", "b2"]) {
            create_instance(&f, instance, id);
            f.engine.set_running(id, true);
        }

        f.orchestrator.shutdown_all().unwrap();

        assert!(!f.engine.is_running("a1"));
        assert!(!f.engine.is_running("b2"));
    }

    #[test]
    fn test_commit_publishes_every_instance() {
        let f = fixture();
        let config = write_kitchen_yml(&f, &["buster"]);
        create_instance(&f, &config.instances()[0], "a1");

        f.orchestrator.commit().unwrap();

        let image = f.settings.image("buster", "default");
        let commands = f.engine.get_commands();
        assert!(commands.contains(&"stop:a1".to_string()));
        assert!(commands.contains(&format!("commit:a1:{image}")));
        assert!(commands.contains(&format!("push:{image}")));
        assert_eq!(commands.last().unwrap(), &format!("rmi:{image}"));
        assert!(f.registry.has_repository(&f.settings.repository("buster", "default")));
    }

    #[test]
    fn test_commit_aborts_on_first_failure() {
        let f = fixture();
        let config = write_kitchen_yml(&f, &["buster", "bullseye"]);
        for (instance, id) in config.instances().iter().zip(["a1", "b2"]) {
            create_instance(&f, instance, id);
        }
        f.engine.set_fail_on("push");

        let err = f.orchestrator.commit().unwrap_err();
        assert!(err.to_string().starts_with("Failed pushing"));
        assert!(!f.engine.get_commands().contains(&"stop:b2".to_string()));
    }

    #[test]
    fn test_destroy_without_kitchen_yml_is_a_no_op() {
        let f = fixture();
        f.orchestrator.destroy(None).unwrap();
        assert!(f.kitchen.get_commands().is_empty());

        write_kitchen_yml(&f, &["buster"]);
        f.orchestrator.destroy(Some("default-buster")).unwrap();
        assert_eq!(f.kitchen.get_commands(), vec!["destroy:default-buster"]);
    }

    #[test]
    fn test_fleet_actions_fail_when_kitchen_fails() {
        let f = fixture();
        f.kitchen.set_fail_on("create");
        f.kitchen.set_fail_on("verify");

        assert_eq!(f.orchestrator.create().unwrap_err().to_string(), "Create failed");
        assert_eq!(f.orchestrator.verify().unwrap_err().to_string(), "Verify failed");
        f.orchestrator.converge().unwrap();
    }

    #[test]
    fn test_exec_all_requires_kitchen_yml() {
        let f = fixture();
        assert!(f.orchestrator.exec_all("ls /").is_err());
        assert!(f.kitchen.get_commands().is_empty());
    }

    #[test]
    fn test_exec_all_counts_failures() {
        let f = fixture();
        let config = write_kitchen_yml(&f, &["buster", "bullseye"]);
        for (instance, id) in config.instances().iter().zip(["a1", "b2"]) {
            create_instance(&f, instance, id);
        }
        f.kitchen.set_fail_on("exec:default-buster");

        let err = f.orchestrator.exec_all("echo {instance}").unwrap_err();
        assert_eq!(err.to_string(), "Fail executing echo {instance}");
        assert_eq!(
            f.kitchen.get_commands(),
            vec![
                "exec:default-buster:echo default-buster",
                "exec:default-bullseye:echo default-bullseye"
            ]
        );
    }

    #[test]
    fn test_exec_all_counts_unrenderable_instances() {
        let f = fixture();
        let config = write_kitchen_yml(&f, &["buster", "bullseye"]);
        // buster was never created, so it has no address
        create_instance(&f, &config.instances()[1], "b2");

        let err = f
            .orchestrator
            .exec_all("ping -c1 {container_ipaddress}")
            .unwrap_err();
        assert_eq!(err.to_string(), "Fail executing ping -c1 {container_ipaddress}");
        assert_eq!(
            f.kitchen.get_commands(),
            vec!["exec:default-bullseye:ping -c1 10.0.0.2"]
        );
    }

    #[test]
    fn test_login_targets_named_instance() {
        let f = fixture();
        write_kitchen_yml(&f, &["buster", "bullseye"]);

        f.orchestrator.login("default-bullseye").unwrap();
        assert_eq!(f.kitchen.get_commands(), vec!["login:default-bullseye"]);
        assert!(f.orchestrator.login("default-jessie").is_err());
    }

    #[test]
    fn test_test_runs_the_full_cycle() {
        let f = fixture();
        f.engine.add_image("debian:buster");
        fs::write(
            f.settings.template_path(),
            "platforms:\n  - name: buster\n    driver_config:\n      image: debian:buster\nsuites:\n  - name: default\n",
        )
        .unwrap();

        f.orchestrator.test(&TestOptions::default()).unwrap();

        assert!(f.settings.kitchen_path().exists());
        let commands = f.kitchen.get_commands();
        assert_eq!(commands.first().unwrap(), "create");
        assert_eq!(commands[1], "converge");
        assert_eq!(
            commands[2],
            format!("exec:default-buster:{GEM_UPDATE_COMMAND}")
        );
        assert_eq!(commands.last().unwrap(), "verify");
    }

    #[test]
    fn test_test_stops_when_converge_fails() {
        let f = fixture();
        write_kitchen_yml(&f, &["buster"]);
        f.kitchen.set_fail_on("converge");

        let err = f.orchestrator.test(&TestOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Kitchen converge failed");
        assert!(!f.kitchen.get_commands().contains(&"verify".to_string()));
    }
}
