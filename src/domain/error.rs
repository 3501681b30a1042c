use super::CommandOutput;

/// Failures at the container-engine seam.
///
/// `ContainerNotFound` is split out so lifecycle operations can treat a
/// vanished container as already stopped/removed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("`{command}` failed ({}): {}", exit_label(.output), .output.message())]
    CommandFailed {
        command: String,
        output: CommandOutput,
    },

    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected engine output: {0}")]
    Malformed(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ContainerNotFound(_))
    }
}

fn exit_label(output: &CommandOutput) -> String {
    match output.exit_code {
        Some(code) => format!("exit {code}"),
        None => "killed by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = EngineError::CommandFailed {
            command: "docker stop abc".into(),
            output: CommandOutput::failed(125, "daemon unreachable\n"),
        };
        assert_eq!(
            err.to_string(),
            "`docker stop abc` failed (exit 125): daemon unreachable"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_is_flagged() {
        assert!(EngineError::ContainerNotFound("abc".into()).is_not_found());
    }
}
