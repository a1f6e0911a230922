// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Writes a commented tinyci.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::deserialize::validate_name_segment;
use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, namespace: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let namespace = namespace.unwrap_or("my-namespace");
    validate_name_segment(namespace).map_err(Error::InvalidConfig)?;

    let yaml = generate_template_yaml(&Config::template(namespace));
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"namespace: {}
deployments_dir: {}
templates_dir: {}
retention:
  keep_images: {}
deploy:
  ports: ["{}"]
  stop_timeout: {}s
# registry:
#   username: deploy
#   password: {{ env: TINYCI_REGISTRY_PASSWORD }}
"#,
        config.namespace,
        config.deployments_dir.display(),
        config.templates_dir.display(),
        config.retention.keep_images,
        config.deploy.ports.join("\", \""),
        config.deploy.stop_timeout.as_secs(),
    )
}
