use crate::domain::STATE_DIR;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

pub const REGISTRY_ENV: &str = "KIM_DOCKER_REGISTRY";
pub const IMAGE_PREFIX_ENV: &str = "KIM_IMAGE_PREFIX";
pub const DEFAULT_IMAGE_PREFIX: &str = "ci/cookbooks";

pub const TEMPLATE_FILE: &str = ".kitchen.template.yml";
pub const KITCHEN_FILE: &str = ".kitchen.yml";
pub const METADATA_TEMPLATE_FILE: &str = "metadata.template";
pub const METADATA_FILE: &str = "metadata.rb";

/// Process-wide configuration, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Registry host images are published to
    pub registry: String,
    pub image_prefix: String,
    /// Cookbook name: last segment of `workdir`
    pub project: String,
    pub workdir: PathBuf,
}

impl Settings {
    pub fn new(
        registry: Option<String>,
        image_prefix: Option<String>,
        workdir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let registry = match registry.map(|r| r.trim().to_string()) {
            Some(registry) if !registry.is_empty() => registry,
            _ => bail!("Please specify the Docker registry with the {REGISTRY_ENV} envvar"),
        };
        let image_prefix = image_prefix
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE_PREFIX.to_string());

        let workdir = workdir.into();
        let project = project_name(&workdir)?;

        Ok(Self {
            registry,
            image_prefix,
            project,
            workdir,
        })
    }

    /// Registry repository for one (platform, suite) pair
    pub fn repository(&self, platform: &str, suite: &str) -> String {
        format!(
            "{}-{}-{}-{}",
            self.image_prefix, self.project, platform, suite
        )
    }

    /// Fully qualified scoped image, always tagged `latest`
    pub fn image(&self, platform: &str, suite: &str) -> String {
        format!("{}/{}:latest", self.registry, self.repository(platform, suite))
    }

    pub fn template_path(&self) -> PathBuf {
        self.workdir.join(TEMPLATE_FILE)
    }

    pub fn kitchen_path(&self) -> PathBuf {
        self.workdir.join(KITCHEN_FILE)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.workdir.join(STATE_DIR)
    }

    pub fn metadata_template_path(&self) -> PathBuf {
        self.workdir.join(METADATA_TEMPLATE_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.workdir.join(METADATA_FILE)
    }
}

/// Final path segment of the cookbook directory
pub fn project_name(workdir: &Path) -> Result<String> {
    let name = workdir
        .components()
        .next_back()
        .and_then(|component| match component {
            std::path::Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .with_context(|| format!("cannot derive a cookbook name from {:?}", workdir))?;
    Ok(name.to_string())
}
