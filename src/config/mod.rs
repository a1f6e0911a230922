// ABOUTME: Configuration types and parsing for tinyci.yml.
// ABOUTME: Handles YAML parsing, defaults, path resolution and registry credentials.

mod deserialize;
mod env_value;
mod init;
mod timeouts;

pub use env_value::EnvValue;
pub use init::init_config;
pub use timeouts::TimeoutsConfig;

use crate::error::{Error, Result};
use crate::runtime::RuntimeConfig;
use crate::runtime::traits::{PortMapping, RegistryAuth};
use deserialize::{deserialize_name_segment, deserialize_ports};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "tinyci.yml";
pub const CONFIG_FILENAME_ALT: &str = "tinyci.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".tinyci/config.yml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Registry namespace for published images (`<namespace>/<repo>:<sha>`).
    #[serde(deserialize_with = "deserialize_name_segment")]
    pub namespace: String,

    #[serde(default = "default_deployments_dir")]
    pub deployments_dir: PathBuf,

    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,

    #[serde(
        default = "default_test_image_prefix",
        deserialize_with = "deserialize_name_segment"
    )]
    pub test_image_prefix: String,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    #[serde(default = "default_keep_images")]
    pub keep_images: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep_images: default_keep_images(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(default = "default_ports", deserialize_with = "deserialize_ports")]
    pub ports: Vec<String>,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            ports: default_ports(),
            stop_timeout: default_stop_timeout(),
        }
    }
}

impl DeployConfig {
    /// Port mappings; entries were validated when the config was parsed.
    pub fn port_mappings(&self) -> Vec<PortMapping> {
        self.ports
            .iter()
            .filter_map(|p| PortMapping::parse(p))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub username: String,

    #[serde(skip_serializing)]
    pub password: EnvValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

fn default_deployments_dir() -> PathBuf {
    PathBuf::from("./deployments")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("./templates")
}

fn default_test_image_prefix() -> String {
    "tinyci".to_string()
}

fn default_keep_images() -> usize {
    3
}

fn default_ports() -> Vec<String> {
    vec!["5000:5000".to_string()]
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let base = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self::load_with_base(path, base)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load_with_base(path, dir);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn load_with_base(path: &Path, base: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = base.to_path_buf();
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retention.keep_images == 0 {
            return Err(Error::InvalidConfig(
                "retention.keep_images must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Minimal configuration used as the `init` scaffold.
    pub fn template(namespace: &str) -> Self {
        Config {
            namespace: namespace.to_string(),
            deployments_dir: default_deployments_dir(),
            templates_dir: default_templates_dir(),
            test_image_prefix: default_test_image_prefix(),
            retention: RetentionConfig::default(),
            deploy: DeployConfig::default(),
            registry: None,
            timeouts: TimeoutsConfig::default(),
            runtime: RuntimeConfig::default(),
            base_dir: PathBuf::new(),
        }
    }

    /// Directory the configuration was loaded from.
    pub fn pipeline_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn deployments_dir(&self) -> PathBuf {
        self.base_dir.join(&self.deployments_dir)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.base_dir.join(&self.templates_dir)
    }

    /// Resolve registry credentials, reading the password from the environment if needed.
    pub fn registry_auth(&self) -> Result<Option<RegistryAuth>> {
        self.registry
            .as_ref()
            .map(|r| {
                Ok(RegistryAuth {
                    username: r.username.clone(),
                    password: r.password.resolve()?,
                    server: r.server.clone(),
                })
            })
            .transpose()
    }
}
