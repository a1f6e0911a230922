// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Speaks the Docker-compatible API exposed by both Docker and Podman.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerOps, ContainerSummary, ImageError,
    ImageOps, ImageSummary, RegistryAuth, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::{RuntimeEndpoint, RuntimeType};
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::models::{ContainerCreateBody, HostConfig, PortBinding};
use bollard::query_parameters::{
    BuildImageOptions, CreateContainerOptions, CreateImageOptions, ListContainersOptions,
    ListImagesOptions, PushImageOptions, RemoveContainerOptions, RemoveImageOptions,
    StartContainerOptions, StopContainerOptions, WaitContainerOptions,
};
use bytes::Bytes;
use futures::StreamExt;
use http_body_util::{Either, Full};
use std::collections::HashMap;
use std::time::Duration;

/// HTTP status and message of an API error response, if that is what `e` is.
fn api_status(e: &bollard::errors::Error) -> Option<(u16, String)> {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.clone())),
        _ => None,
    }
}

/// Map a container API error, turning 404 into `NotFound` and 304 into `on_not_modified`.
fn container_error(
    e: bollard::errors::Error,
    on_not_modified: fn(String) -> ContainerError,
) -> ContainerError {
    match api_status(&e) {
        Some((404, message)) => ContainerError::NotFound(message),
        Some((304, message)) => on_not_modified(message),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

type PortBindings = HashMap<String, Option<Vec<PortBinding>>>;

/// Exposed port keys (`5000/tcp`) and the host bindings of the published ones.
fn port_table(config: &ContainerConfig) -> (Vec<String>, PortBindings) {
    let mut exposed = Vec::with_capacity(config.ports.len());
    let mut bindings = PortBindings::new();
    for port in &config.ports {
        let key = format!("{}/{}", port.container_port, port.protocol.as_str());
        if let Some(host_port) = port.host_port {
            let binding = PortBinding {
                host_ip: None,
                host_port: Some(host_port.to_string()),
            };
            bindings.insert(key.clone(), Some(vec![binding]));
        }
        exposed.push(key);
    }
    (exposed, bindings)
}

fn summarize(c: bollard::models::ContainerSummary) -> ContainerSummary {
    let name = c
        .names
        .and_then(|names| names.into_iter().next())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_default();

    ContainerSummary {
        id: ContainerId::new(c.id.unwrap_or_default()),
        name,
        image: c.image.unwrap_or_default(),
        state: c
            .state
            .map(|s| format!("{:?}", s).to_lowercase())
            .unwrap_or_default(),
        created: c.created.unwrap_or_default(),
        labels: c.labels.unwrap_or_default(),
    }
}

fn credentials(auth: Option<&RegistryAuth>) -> Option<DockerCredentials> {
    auth.map(|a| DockerCredentials {
        username: Some(a.username.clone()),
        password: Some(a.password.clone()),
        serveraddress: a.server.clone(),
        ..Default::default()
    })
}

/// Container runtime implementation using bollard.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to the runtime socket described by `endpoint`.
    pub fn connect(endpoint: &RuntimeEndpoint) -> Result<Self, RuntimeInfoError> {
        let client =
            Docker::connect_with_unix(&endpoint.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, endpoint.runtime_type))
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }
}

impl Sealed for BollardRuntime {}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        Ok(RuntimeMetadata {
            name: self.runtime_type.to_string(),
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn build_image(&self, context: Vec<u8>, tag: &ImageRef) -> Result<(), ImageError> {
        let image_name = tag.to_string();
        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: Some(image_name.clone()),
            ..Default::default()
        };

        let body = Either::Left(Full::new(Bytes::from(context)));
        let mut stream = self.client.build_image(options, None, Some(body));

        while let Some(result) = stream.next().await {
            let output =
                result.map_err(|e| ImageError::BuildFailed(format!("{}: {}", image_name, e)))?;
            if let Some(detail) = output.error_detail {
                let message = detail.message.unwrap_or_else(|| "unknown error".to_string());
                return Err(ImageError::BuildFailed(format!("{}: {}", image_name, message)));
            }
            if let Some(line) = output.stream {
                let line = line.trim_end();
                if !line.is_empty() {
                    tracing::debug!(image = %image_name, "{}", line);
                }
            }
        }

        Ok(())
    }

    async fn pull_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<(), ImageError> {
        let image_name = reference.to_string();
        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        // Pull returns a stream of progress updates - consume it
        let mut stream = self.client.create_image(Some(opts), None, credentials(auth));
        while let Some(result) = stream.next().await {
            result.map_err(|e| ImageError::PullFailed(format!("{}: {}", image_name, e)))?;
        }

        Ok(())
    }

    async fn push_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<(), ImageError> {
        let image_name = reference.to_string();
        let opts = PushImageOptions {
            tag: reference.tag().map(str::to_string),
            ..Default::default()
        };

        let mut stream = self
            .client
            .push_image(&reference.repository(), Some(opts), credentials(auth));
        while let Some(result) = stream.next().await {
            let info =
                result.map_err(|e| ImageError::PushFailed(format!("{}: {}", image_name, e)))?;
            if let Some(status) = info.status {
                tracing::info!(image = %image_name, "{}", status);
            }
        }

        Ok(())
    }

    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        let image_name = reference.to_string();
        match self.client.inspect_image(&image_name).await {
            Ok(_) => Ok(true),
            Err(e) if matches!(api_status(&e), Some((404, _))) => Ok(false),
            Err(e) => Err(ImageError::Runtime(format!(
                "failed to inspect {}: {}",
                image_name, e
            ))),
        }
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageSummary>, ImageError> {
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("reference".to_string(), vec![repository.to_string()]);

        let opts = ListImagesOptions {
            filters: Some(filters),
            ..Default::default()
        };

        let images = self
            .client
            .list_images(Some(opts))
            .await
            .map_err(|e| ImageError::Runtime(format!("failed to list {}: {}", repository, e)))?;

        Ok(images
            .into_iter()
            .map(|image| ImageSummary {
                id: ImageId::new(image.id),
                tags: image.repo_tags,
                created: image.created,
            })
            .collect())
    }

    async fn remove_image(&self, image: &str, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(image, Some(opts), None)
            .await
            .map_err(|e| match api_status(&e) {
                Some((404, _)) => ImageError::NotFound(image.to_string()),
                Some((409, _)) => ImageError::InUse(image.to_string()),
                _ => ImageError::Runtime(format!("failed to remove {}: {}", image, e)),
            })?;

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let (exposed_ports, port_bindings) = port_table(config);
        let env: Vec<String> = config
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let body = ContainerCreateBody {
            image: Some(config.image.to_string()),
            env: (!env.is_empty()).then_some(env),
            labels: (!config.labels.is_empty()).then(|| config.labels.clone()),
            cmd: config.command.clone(),
            exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
            host_config: Some(HostConfig {
                port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
                ..Default::default()
            }),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: config.name.clone(),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(|e| match api_status(&e) {
                Some((404, message)) => ContainerError::ImageNotFound(message),
                Some((409, message)) => ContainerError::AlreadyExists(message),
                _ => ContainerError::Runtime(e.to_string()),
            })?;

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(|e| container_error(e, ContainerError::AlreadyRunning))
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(|e| container_error(e, ContainerError::NotRunning))
    }

    async fn wait_container(&self, id: &ContainerId) -> Result<i64, ContainerError> {
        let mut stream = self
            .client
            .wait_container(id.as_str(), None::<WaitContainerOptions>);

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // Non-zero exits surface as a wait error carrying the code.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(container_error(e, ContainerError::Runtime)),
            None => Err(ContainerError::Runtime(format!(
                "no exit status reported for {}",
                id.short()
            ))),
        }
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(|e| container_error(e, ContainerError::Runtime))?;

        Ok(())
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in &filters.labels {
            filter_map
                .entry("label".to_string())
                .or_default()
                .push(format!("{}={}", key, value));
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        // Podman can report transient states bollard does not know while
        // containers shut down; those listings are retried.
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => return Ok(containers.into_iter().map(summarize).collect()),
                Err(e) => {
                    let message = e.to_string();
                    let transient = message.contains("unknown variant `stopping`")
                        || message.contains("unknown variant `stopped`");
                    if !transient || attempts == 3 {
                        return Err(ContainerError::Runtime(message));
                    }
                    tracing::debug!(attempts, "retrying container listing: {}", message);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
        }
    }
}
