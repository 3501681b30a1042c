use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yml::Mapping;
use std::path::PathBuf;

/// Directory (relative to the cookbook) holding one state file per instance
pub const STATE_DIR: &str = ".kitchen";

/// Shape shared by `.kitchen.template.yml` and the generated `.kitchen.yml`.
///
/// Only `platforms` and `suites` are interpreted; every other key (driver,
/// provisioner, verifier...) is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenConfig {
    pub platforms: Vec<Platform>,
    pub suites: Vec<Suite>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    #[serde(default)]
    pub driver_config: DriverConfig,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suite {
    pub name: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl Platform {
    pub fn new(name: impl Into<String>, image: Option<&str>) -> Self {
        Self {
            name: name.into(),
            driver_config: DriverConfig {
                image: image.map(str::to_string),
                extra: Mapping::new(),
            },
            extra: Mapping::new(),
        }
    }

    /// Image reference the driver boots this platform from
    pub fn image(&self) -> Option<&str> {
        self.driver_config.image.as_deref()
    }

    pub fn set_image(&mut self, image: impl Into<String>) {
        self.driver_config.image = Some(image.into());
    }
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Mapping::new(),
        }
    }
}

impl KitchenConfig {
    pub fn new(platforms: Vec<Platform>, suites: Vec<Suite>) -> Self {
        Self {
            platforms,
            suites,
            extra: Mapping::new(),
        }
    }

    /// Keeps the first suite called `name` and drops every other one.
    /// An unknown name leaves the suite list empty.
    pub fn retain_suite(&mut self, name: &str) {
        let selected = self.suites.iter().position(|suite| suite.name == name);
        self.suites = match selected {
            Some(index) => vec![self.suites.swap_remove(index)],
            None => Vec::new(),
        };
    }

    /// Instances in fleet order: suites outer, platforms inner, source order
    pub fn instances(&self) -> Vec<Instance> {
        self.suites
            .iter()
            .flat_map(|suite| {
                self.platforms
                    .iter()
                    .map(move |platform| Instance::new(platform.clone(), suite.clone()))
            })
            .collect()
    }

    /// Applies `f` to every instance in fleet order, stopping at the first error
    pub fn for_each_instance<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Instance) -> Result<()>,
    {
        for instance in self.instances() {
            f(&instance)?;
        }
        Ok(())
    }

    pub fn find_instance(&self, name: &str) -> Option<Instance> {
        self.instances()
            .into_iter()
            .find(|instance| instance.name == name)
    }
}

/// One (suite, platform) pair. Built fresh on every enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub platform: Platform,
    pub suite: Suite,
    pub name: String,
    state_file: PathBuf,
}

impl Instance {
    pub fn new(platform: Platform, suite: Suite) -> Self {
        let name = format!("{}-{}", suite.name, platform.name);
        let state_file = PathBuf::from(STATE_DIR).join(format!("{name}.yml"));
        Self {
            platform,
            suite,
            name,
            state_file,
        }
    }

    /// State file path, relative to the cookbook directory
    pub fn state_file(&self) -> &PathBuf {
        &self.state_file
    }
}
