use serde::Deserialize;
use std::collections::HashMap;

/// Port the kitchen transport (ssh) listens on inside each instance
pub const SERVICE_PORT: &str = "22/tcp";

/// Subset of `docker container inspect` output this tool reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDetails {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub network_settings: NetworkSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkSettings {
    #[serde(default, rename = "IPAddress")]
    pub ip_address: String,
    /// Unpublished ports map to `null`; the whole map is `null` on some engines
    #[serde(default)]
    pub ports: Option<HashMap<String, Option<Vec<PortBinding>>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PortBinding {
    #[serde(rename = "HostIp", default)]
    pub host_ip: String,
    #[serde(rename = "HostPort")]
    pub host_port: String,
}

impl ContainerDetails {
    /// Address on the engine network; empty strings mean "not attached"
    pub fn ip_address(&self) -> Option<&str> {
        let ip = self.network_settings.ip_address.trim();
        (!ip.is_empty()).then_some(ip)
    }

    /// First host port bound to `container_port` (e.g. `22/tcp`)
    pub fn host_port(&self, container_port: &str) -> Option<u16> {
        self.network_settings
            .ports
            .as_ref()?
            .get(container_port)?
            .as_ref()?
            .iter()
            .find_map(|binding| binding.host_port.parse().ok())
    }
}
