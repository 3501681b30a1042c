use crate::domain::KitchenConfig;
use crate::infra::Settings;
use crate::infra::files::{load_yaml, write_yaml};
use crate::services::ImageService;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Turns `.kitchen.template.yml` into the `.kitchen.yml` kitchen runs from
pub struct TemplateService {
    settings: Arc<Settings>,
    images: Arc<ImageService>,
}

impl TemplateService {
    pub fn new(settings: Arc<Settings>, images: Arc<ImageService>) -> Self {
        Self { settings, images }
    }

    pub fn load_template(&self) -> Result<KitchenConfig> {
        load_yaml(&self.settings.template_path())
    }

    /// Restricts `template` to `suite` and points every platform at its
    /// scoped image, making that image available locally: pulled when it was
    /// already published, otherwise tagged from the platform's base image.
    ///
    /// With `from_scratch` the base images are only refreshed and platforms
    /// keep their original references. Registry failures never abort.
    pub fn expand(
        &self,
        mut template: KitchenConfig,
        suite: &str,
        from_scratch: bool,
    ) -> KitchenConfig {
        for platform in &mut template.platforms {
            let base = platform.image().map(str::to_string);

            if from_scratch {
                match base {
                    Some(base) => self.best_effort(&format!("pull {base}"), || self.images.pull(&base)),
                    None => warn!("Platform {} has no base image to refresh", platform.name),
                }
                continue;
            }

            let scoped = self.settings.image(&platform.name, suite);
            platform.set_image(scoped.clone());

            let pulled = self.images.pull(&scoped).unwrap_or_else(|e| {
                warn!("Failed to pull {scoped}: {e:#}");
                false
            });
            if pulled {
                continue;
            }

            match base {
                Some(base) => self.best_effort(&format!("tag {base} as {scoped}"), || {
                    self.images.tag(&base, &scoped)
                }),
                None => warn!(
                    "{scoped} is not published and platform {} has no base image",
                    platform.name
                ),
            }
        }

        template.retain_suite(suite);
        template
    }

    /// Expands the template and writes the result over `.kitchen.yml`
    pub fn generate(&self, suite: &str, from_scratch: bool) -> Result<KitchenConfig> {
        info!("Generating .kitchen.yml for suite {suite} (from scratch: {from_scratch})");
        let template = self.load_template()?;
        let config = self.expand(template, suite, from_scratch);
        write_yaml(&self.settings.kitchen_path(), &config)?;
        Ok(config)
    }

    fn best_effort<F>(&self, what: &str, f: F)
    where
        F: FnOnce() -> Result<bool>,
    {
        match f() {
            Ok(true) => {}
            Ok(false) => warn!("Failed to {what}"),
            Err(e) => warn!("Failed to {what}: {e:#}"),
        }
    }
}
