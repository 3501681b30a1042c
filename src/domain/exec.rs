use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `{name}` with a lowercase identifier. Shell syntax such as `${HOME}` or
/// `awk '{print $1}'` does not match and is left alone.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("placeholder regex"));

/// Values `kim exec` can interpolate into a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecContext {
    pub instance: String,
    pub suite: String,
    pub container_id: Option<String>,
    pub container_ipaddress: Option<String>,
    pub instance_conf_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("unknown placeholder {{{0}}}")]
    Unknown(String),
    #[error("placeholder {{{placeholder}}} has no value for instance {instance}")]
    Missing {
        placeholder: String,
        instance: String,
    },
}

impl ExecContext {
    /// Whether `template` refers to `placeholder` at all
    pub fn mentions(template: &str, placeholder: &str) -> bool {
        PLACEHOLDER
            .captures_iter(template)
            .any(|caps| &caps[1] == placeholder)
    }

    fn lookup(&self, placeholder: &str) -> Result<&str, RenderError> {
        let value = match placeholder {
            "instance" => Some(self.instance.as_str()),
            "suite" => Some(self.suite.as_str()),
            "container_id" => self.container_id.as_deref(),
            "container_ipaddress" => self.container_ipaddress.as_deref(),
            "platform_file" | "instance_conf_file" => Some(self.instance_conf_file.as_str()),
            other => return Err(RenderError::Unknown(other.to_string())),
        };

        value.ok_or_else(|| RenderError::Missing {
            placeholder: placeholder.to_string(),
            instance: self.instance.clone(),
        })
    }

    /// Substitutes every placeholder in `template`, failing on the first one
    /// that is unknown or has no value
    pub fn render(&self, template: &str) -> Result<String, RenderError> {
        let mut failure = None;
        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
            match self.lookup(&caps[1]) {
                Ok(value) => value.to_string(),
                Err(err) => {
                    failure.get_or_insert(err);
                    String::new()
                }
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(rendered.into_owned()),
        }
    }
}
