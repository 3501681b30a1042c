use crate::domain::semver::{self, BumpKind};
use crate::domain::CookbookCatalog;
use crate::infra::Settings;
use crate::infra::files::write_atomic;
use anyhow::{Context, Result};
use std::fs;
use std::sync::Arc;
use tracing::info;

pub const VERSION_PLACEHOLDER: &str = "{{VERSION}}";

/// Writes `metadata.rb` from `metadata.template` with the next cookbook version
pub struct MetadataService {
    settings: Arc<Settings>,
    catalog: Arc<dyn CookbookCatalog>,
}

impl MetadataService {
    pub fn new(settings: Arc<Settings>, catalog: Arc<dyn CookbookCatalog>) -> Self {
        Self { settings, catalog }
    }

    /// Returns the version written
    pub fn generate(&self, kind: BumpKind) -> Result<String> {
        let cookbook = &self.settings.project;
        let current = self
            .catalog
            .cookbook_version(cookbook)
            .with_context(|| format!("looking up the published version of {cookbook}"))?;
        let next = semver::increment(&current, kind);
        info!("Bumping {cookbook} from {current} to {next} ({kind})");

        let template_path = self.settings.metadata_template_path();
        let template = fs::read_to_string(&template_path)
            .with_context(|| format!("reading {:?}", template_path))?;

        let rendered = template.replace(VERSION_PLACEHOLDER, &next);
        write_atomic(&self.settings.metadata_path(), rendered.as_bytes())?;
        Ok(next)
    }
}
