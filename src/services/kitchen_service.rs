use crate::domain::{ExecContext, KitchenAction, KitchenDriver};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs test-kitchen subcommands against the fleet or a single instance
pub struct KitchenService {
    driver: Arc<dyn KitchenDriver>,
}

impl KitchenService {
    pub fn new(driver: Arc<dyn KitchenDriver>) -> Self {
        Self { driver }
    }

    fn run(&self, action: KitchenAction, instance: Option<&str>) -> Result<bool> {
        info!(
            "Running kitchen {action} {}",
            instance.unwrap_or("(all instances)")
        );
        let output = self.driver.run(action, instance)?;
        if !output.success {
            warn!("kitchen {action} exited with {:?}", output.exit_code);
        }
        Ok(output.success)
    }

    pub fn create(&self, instance: Option<&str>) -> Result<bool> {
        self.run(KitchenAction::Create, instance)
    }

    pub fn converge(&self, instance: Option<&str>) -> Result<bool> {
        self.run(KitchenAction::Converge, instance)
    }

    pub fn destroy(&self, instance: Option<&str>) -> Result<bool> {
        self.run(KitchenAction::Destroy, instance)
    }

    pub fn verify(&self, instance: Option<&str>) -> Result<bool> {
        self.run(KitchenAction::Verify, instance)
    }

    pub fn login(&self, instance: &str) -> Result<bool> {
        self.run(KitchenAction::Login, Some(instance))
    }

    /// Renders the placeholders of `command` for one instance and runs it there
    pub fn exec(&self, command: &str, context: &ExecContext) -> Result<bool> {
        let rendered = context.render(command)?;
        info!("Running kitchen exec {} -c '{rendered}'", context.instance);
        let output = self.driver.exec(&context.instance, &rendered)?;
        Ok(output.success)
    }
}
