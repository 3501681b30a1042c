/// One verb as shown in the usage listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub args: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "commit",
        args: "",
        description: "Commit base containers declared in .kitchen.yml to the registry",
        example: "",
    },
    CommandSpec {
        name: "converge",
        args: "",
        description: "Run kitchen converge",
        example: "",
    },
    CommandSpec {
        name: "create",
        args: "",
        description: "Run kitchen create",
        example: "",
    },
    CommandSpec {
        name: "destroy",
        args: "[INSTANCE]",
        description: "Run kitchen destroy",
        example: "default-buster",
    },
    CommandSpec {
        name: "exec",
        args: "COMMAND",
        description: "Run a command with the variables replaced on each instance in .kitchen.yml",
        example: "\"ls /\"",
    },
    CommandSpec {
        name: "generate_metadata_file",
        args: "[patch|minor|major]",
        description: "Generate metadata.rb from metadata.template",
        example: "minor",
    },
    CommandSpec {
        name: "login",
        args: "INSTANCE",
        description: "Login to instance",
        example: "default-buster",
    },
    CommandSpec {
        name: "shutdown",
        args: "",
        description: "Shutdown docker containers declared in .kitchen.yml",
        example: "",
    },
    CommandSpec {
        name: "start",
        args: "",
        description: "Start docker containers declared in .kitchen.yml",
        example: "",
    },
    CommandSpec {
        name: "test",
        args: "[--suite SUITE] [--from-scratch]",
        description: "Generate .kitchen.yml from the template (if it exists), pull docker images, then run kitchen test",
        example: "--suite community --from-scratch",
    },
    CommandSpec {
        name: "verify",
        args: "",
        description: "Run kitchen verify",
        example: "",
    },
];

/// The command listing appended to `--help` and to usage errors
pub fn usage(program: &str) -> String {
    let mut out = String::from(
        "Kitchen Image Manager (KIM): drives test-kitchen and manages the pre-built\n\
         docker images it boots from (template based)\n\nCommands:\n",
    );

    for spec in COMMANDS {
        let synopsis = format!("{} {}", spec.name, spec.args);
        out.push_str(&format!("  {}\n", synopsis.trim_end()));
        out.push_str(&format!("    Description: {}\n", spec.description));
        let example = format!("{program} {} {}", spec.name, spec.example);
        out.push_str(&format!("    Example: {}\n\n", example.trim_end()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        for (i, spec) in COMMANDS.iter().enumerate() {
            assert!(
                COMMANDS[i + 1..].iter().all(|other| other.name != spec.name),
                "duplicate command {}",
                spec.name
            );
        }
    }

    #[test]
    fn test_usage_lists_every_command() {
        let usage = usage("kim");
        for spec in COMMANDS {
            assert!(usage.contains(spec.description), "{} missing", spec.name);
        }
        assert!(usage.contains("Example: kim exec \"ls /\""));
        assert!(usage.contains("  commit\n"));
    }
}
