use serde::{Deserialize, Serialize};
use serde_yml::Mapping;

/// Runtime facts kitchen records for one instance under `.kitchen/`.
///
/// The file is written by `kitchen create`; `start` rewrites it with the
/// freshly bound `port`. Keys this tool does not know about are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    pub container_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl InstanceState {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            port: None,
            extra: Mapping::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}
