use crate::cli::{Cli, Commands};
use crate::domain::{BumpKind, ContainerEngine, CookbookCatalog, KitchenDriver, RegistryApi};
use crate::infra::{DockerAdapter, EcrRegistry, KitchenCli, KnifeCatalog, Settings};
use crate::services::{
    ImageService, InstanceService, KitchenService, MetadataService, Orchestrator, StateStore,
    TemplateService, TestOptions,
};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// External tools every command goes through
pub struct Backends {
    pub engine: Arc<dyn ContainerEngine>,
    pub kitchen: Arc<dyn KitchenDriver>,
    pub registry: Arc<dyn RegistryApi>,
    pub catalog: Arc<dyn CookbookCatalog>,
}

impl Backends {
    /// Real binaries on `PATH`; kitchen runs inside `workdir`
    pub fn system(engine: &str, kitchen: &str, region: &str, workdir: &Path) -> Self {
        Self {
            engine: Arc::new(DockerAdapter::new(engine)),
            kitchen: Arc::new(KitchenCli::new(kitchen, workdir)),
            registry: Arc::new(EcrRegistry::new(region)),
            catalog: Arc::new(KnifeCatalog::new()),
        }
    }
}

pub struct App {
    settings: Arc<Settings>,
    orchestrator: Orchestrator,
    metadata: MetadataService,
}

impl App {
    pub fn new(settings: Settings, backends: Backends) -> Self {
        let settings = Arc::new(settings);
        let store = Arc::new(StateStore::new(&settings.workdir));

        let images = Arc::new(ImageService::new(backends.engine.clone(), backends.registry));
        let kitchen = Arc::new(KitchenService::new(backends.kitchen));
        let templates = Arc::new(TemplateService::new(settings.clone(), images.clone()));
        let instances = Arc::new(InstanceService::new(
            backends.engine,
            store,
            kitchen.clone(),
        ));

        let orchestrator =
            Orchestrator::new(settings.clone(), images, templates, instances, kitchen);
        let metadata = MetadataService::new(settings.clone(), backends.catalog);

        Self {
            settings,
            orchestrator,
            metadata,
        }
    }

    /// Settings from flags and environment, system backends
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let workdir = match &cli.workdir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to read the current directory")?,
        };
        let workdir = canonical(workdir)?;
        let settings = Settings::new(cli.registry.clone(), cli.image_prefix.clone(), workdir)?;
        debug!("Settings: {:?}", settings);

        let backends = Backends::system(&cli.engine, &cli.kitchen, &cli.region, &settings.workdir);
        Ok(Self::new(settings, backends))
    }

    pub fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Commit => self.orchestrator.commit(),
            Commands::Converge => self.orchestrator.converge(),
            Commands::Create => self.orchestrator.create(),
            Commands::Destroy { instance } => self.orchestrator.destroy(instance.as_deref()),
            Commands::Exec { command } => {
                if command.trim().is_empty() {
                    bail!("No command given to exec");
                }
                self.orchestrator.exec_all(&command)
            }
            Commands::GenerateMetadataFile { kind } => {
                let kind: BumpKind = kind.parse()?;
                let version = self.metadata.generate(kind)?;
                info!("Generated metadata.rb for {} {version}", self.settings.project);
                Ok(())
            }
            Commands::Login { instance } => self.orchestrator.login(&instance),
            Commands::Shutdown => self.orchestrator.shutdown_all(),
            Commands::Start => self.orchestrator.start_all(),
            Commands::Test {
                suite,
                from_scratch,
            } => self.orchestrator.test(&TestOptions {
                suite,
                from_scratch,
            }),
            Commands::Verify => self.orchestrator.verify(),
        }
    }
}

fn canonical(dir: PathBuf) -> Result<PathBuf> {
    dir.canonicalize()
        .with_context(|| format!("Working directory {:?} is not accessible", dir))
}
