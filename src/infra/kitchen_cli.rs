use crate::domain::{CommandOutput, KitchenAction, KitchenDriver};
use crate::infra::process::run_inherited;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_KITCHEN: &str = "kitchen";

/// `KitchenDriver` that shells out to test-kitchen with the terminal attached.
/// Every command runs in the cookbook directory so kitchen sees the same
/// `.kitchen.yml` and `.kitchen/` state as kim.
#[derive(Debug, Clone)]
pub struct KitchenCli {
    binary: String,
    workdir: PathBuf,
}

impl KitchenCli {
    pub fn new(binary: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            workdir: workdir.into(),
        }
    }
}

impl KitchenDriver for KitchenCli {
    fn run(&self, action: KitchenAction, instance: Option<&str>) -> Result<CommandOutput> {
        let mut args = vec![action.as_str()];
        args.extend(instance);

        run_inherited(&self.binary, &args, &self.workdir)
            .with_context(|| format!("running {} {action} in {:?}", self.binary, self.workdir))
    }

    fn exec(&self, instance: &str, command: &str) -> Result<CommandOutput> {
        run_inherited(
            &self.binary,
            ["exec", instance, "-c", command],
            &self.workdir,
        )
        .with_context(|| format!("running {} exec on {instance}", self.binary))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    // `sh <action>` reads a script named after the action from the current
    // directory, standing in for the kitchen binary
    fn cookbook_with_script(action: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(action), "pwd -P > ran_in\n").unwrap();
        dir
    }

    #[test]
    fn test_actions_run_in_the_cookbook_directory() {
        let dir = cookbook_with_script("create");
        let kitchen = KitchenCli::new("sh", dir.path());

        let output = kitchen.run(KitchenAction::Create, None).unwrap();
        assert!(output.success);

        let ran_in = fs::read_to_string(dir.path().join("ran_in")).unwrap();
        assert_eq!(
            std::path::Path::new(ran_in.trim()),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_exec_runs_in_the_cookbook_directory() {
        let dir = cookbook_with_script("exec");
        let kitchen = KitchenCli::new("sh", dir.path());

        assert!(kitchen.exec("default-buster", "uptime").unwrap().success);
        assert!(dir.path().join("ran_in").exists());
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let kitchen = KitchenCli::new("kim-no-such-kitchen", dir.path());
        assert!(kitchen.run(KitchenAction::Verify, None).is_err());
    }
}
