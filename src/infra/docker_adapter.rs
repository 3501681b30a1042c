use crate::domain::{CommandOutput, ContainerDetails, ContainerEngine, EngineError, RegistryAuth};
use crate::infra::process::{command_line, run_captured, run_with_stdin};

pub const DEFAULT_ENGINE: &str = "docker";

/// `ContainerEngine` backed by the docker (or compatible) CLI
#[derive(Debug, Clone)]
pub struct DockerAdapter {
    binary: String,
}

impl DockerAdapter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput, EngineError> {
        run_captured(&self.binary, args).map_err(|source| EngineError::Spawn {
            command: command_line(&self.binary, args),
            source,
        })
    }

    /// Runs a container-scoped command, mapping "no such container" to
    /// `ContainerNotFound`
    fn run_on_container(
        &self,
        args: &[&str],
        container_id: &str,
    ) -> Result<CommandOutput, EngineError> {
        let output = self.run(args)?;
        if output.success {
            return Ok(output);
        }
        if is_not_found(&output.stderr) {
            return Err(EngineError::ContainerNotFound(container_id.to_string()));
        }
        Err(EngineError::CommandFailed {
            command: command_line(&self.binary, args),
            output,
        })
    }
}

impl Default for DockerAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE)
    }
}

impl ContainerEngine for DockerAdapter {
    fn login(&self, auth: &RegistryAuth) -> Result<CommandOutput, EngineError> {
        let args = [
            "login",
            "--username",
            auth.credentials.username.as_str(),
            "--password-stdin",
            auth.server.as_str(),
        ];
        run_with_stdin(&self.binary, args, &auth.credentials.password).map_err(|source| {
            EngineError::Spawn {
                command: command_line(&self.binary, args),
                source,
            }
        })
    }

    fn pull(&self, image: &str) -> Result<CommandOutput, EngineError> {
        self.run(&["pull", image])
    }

    fn tag(&self, source: &str, target: &str) -> Result<CommandOutput, EngineError> {
        self.run(&["tag", source, target])
    }

    fn commit(&self, container_id: &str, image: &str) -> Result<CommandOutput, EngineError> {
        self.run(&["commit", container_id, image])
    }

    fn push(&self, image: &str) -> Result<CommandOutput, EngineError> {
        self.run(&["push", image])
    }

    fn remove_image(&self, image: &str) -> Result<CommandOutput, EngineError> {
        self.run(&["rmi", image])
    }

    fn start_container(&self, container_id: &str) -> Result<(), EngineError> {
        self.run_on_container(&["start", container_id], container_id)
            .map(|_| ())
    }

    fn stop_container(&self, container_id: &str) -> Result<(), EngineError> {
        self.run_on_container(&["stop", container_id], container_id)
            .map(|_| ())
    }

    fn remove_container(&self, container_id: &str) -> Result<(), EngineError> {
        self.run_on_container(&["rm", "--force", container_id], container_id)
            .map(|_| ())
    }

    fn inspect_container(&self, container_id: &str) -> Result<ContainerDetails, EngineError> {
        let output = self.run_on_container(&["container", "inspect", container_id], container_id)?;
        parse_inspect(&output.stdout, container_id)
    }
}

fn is_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no such container") || stderr.contains("no such object")
}

/// `inspect` prints a JSON array with one entry per requested object
fn parse_inspect(stdout: &str, container_id: &str) -> Result<ContainerDetails, EngineError> {
    let mut entries: Vec<ContainerDetails> = serde_json::from_str(stdout)
        .map_err(|e| EngineError::Malformed(format!("inspect {container_id}: {e}")))?;

    if entries.is_empty() {
        return Err(EngineError::ContainerNotFound(container_id.to_string()));
    }
    Ok(entries.swap_remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_not_found_messages() {
        assert!(is_not_found(
            "Error response from daemon: No such container: 123abc"
        ));
        assert!(is_not_found("Error: No such object: 123abc"));
        assert!(is_not_found(
            "Error: no such container 123abc: no such container"
        ));
        assert!(!is_not_found(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock"
        ));
    }

    #[test]
    fn test_parse_inspect_takes_first_entry() {
        let stdout = r#"[{"Id": "123abc", "NetworkSettings": {"IPAddress": "10.0.0.2", "Ports": {}}}]"#;
        let details = parse_inspect(stdout, "123abc").unwrap();
        assert_eq!(details.id, "123abc");
        assert_eq!(details.ip_address(), Some("10.0.0.2"));
    }

    #[test]
    fn test_parse_inspect_empty_array_is_not_found() {
        let err = parse_inspect("[]", "gone").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_inspect_garbage_is_malformed() {
        let err = parse_inspect("not json", "abc").unwrap_err();
        assert!(matches!(err, EngineError::Malformed(_)));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let engine = DockerAdapter::new("kim-no-such-engine");
        let err = engine.pull("alpine:latest").unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }
}
