// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerConfig, PortMapping, ImageSummary, RegistryAuth, RuntimeMetadata.

use crate::types::{ImageId, ImageRef};
use std::collections::HashMap;

/// Label set on every container tinyci starts.
pub const MANAGED_LABEL: &str = "tinyci.managed";
/// Label carrying the image repository (`namespace/name`) of a deployed container.
pub const REPO_LABEL: &str = "tinyci.repo";
/// Label distinguishing test-runner containers from deployed services.
pub const ROLE_LABEL: &str = "tinyci.role";

/// What to create a container from.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// The engine generates a name when absent.
    pub name: Option<String>,
    pub image: ImageRef,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub ports: Vec<PortMapping>,
    /// Replaces the image's `CMD`.
    pub command: Option<Vec<String>>,
}

impl ContainerConfig {
    /// Unnamed container with no ports, env or labels.
    pub fn for_image(image: ImageRef) -> Self {
        Self {
            name: None,
            image,
            env: HashMap::new(),
            labels: HashMap::new(),
            ports: Vec::new(),
            command: None,
        }
    }

    pub fn label(mut self, key: &str, value: impl Into<String>) -> Self {
        self.labels.insert(key.to_string(), value.into());
        self
    }
}

/// A container port, optionally published on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    /// Parse a port mapping string like "5000", "8080:80" or "8080:80/udp".
    pub fn parse(spec: &str) -> Option<Self> {
        let (port_part, protocol) = match spec.split_once('/') {
            Some((ports, "udp")) => (ports, Protocol::Udp),
            Some((ports, "tcp")) => (ports, Protocol::Tcp),
            Some(_) => return None,
            None => (spec, Protocol::Tcp),
        };

        match port_part.split_once(':') {
            None => Some(Self {
                host_port: None,
                container_port: port_part.parse().ok()?,
                protocol,
            }),
            Some((host, container)) => Some(Self {
                host_port: Some(host.parse().ok()?),
                container_port: container.parse().ok()?,
                protocol,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// A local image of some repository.
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub id: ImageId,
    /// `repository:tag` references pointing at the image.
    pub tags: Vec<String>,
    /// Seconds since the epoch; retention orders by this.
    pub created: i64,
}

/// Credentials for pushing to and pulling from a registry.
#[derive(Clone)]
pub struct RegistryAuth {
    pub username: String,
    /// Password or access token.
    pub password: String,
    /// Registry host; the engine's default registry when absent.
    pub server: Option<String>,
}

impl std::fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .finish()
    }
}

/// Identity of the engine behind the socket.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// `docker` or `podman`.
    pub name: String,
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
}
