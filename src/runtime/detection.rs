// ABOUTME: Local runtime detection for Docker and Podman.
// ABOUTME: Honors explicit config, otherwise probes Podman sockets first, then Docker.

use super::types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
use std::path::Path;

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("configured socket does not exist: {0}")]
    SocketMissing(String),
}

/// Resolve the runtime endpoint, preferring explicit configuration.
///
/// An explicit `socket` must exist on disk. With only `runtime` set the
/// standard socket for that runtime is used.
pub fn resolve(config: &RuntimeConfig) -> Result<RuntimeEndpoint, DetectionError> {
    match (config.runtime, config.socket.as_deref()) {
        (Some(runtime_type), socket) => {
            let socket_path = socket
                .map(str::to_string)
                .unwrap_or_else(|| default_socket_path(runtime_type));
            if !Path::new(&socket_path).exists() {
                return Err(DetectionError::SocketMissing(socket_path));
            }
            Ok(RuntimeEndpoint {
                runtime_type,
                socket_path,
            })
        }
        (None, Some(socket)) => {
            if !Path::new(socket).exists() {
                return Err(DetectionError::SocketMissing(socket.to_string()));
            }
            let runtime_type = if socket.contains("podman") {
                RuntimeType::Podman
            } else {
                RuntimeType::Docker
            };
            Ok(RuntimeEndpoint {
                runtime_type,
                socket_path: socket.to_string(),
            })
        }
        (None, None) => detect_local(),
    }
}

/// Detect container runtime on the local system.
///
/// Detection order:
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
pub fn detect_local() -> Result<RuntimeEndpoint, DetectionError> {
    if let Some(uid) = get_uid() {
        let rootless_socket = format!("/run/user/{}/podman/podman.sock", uid);
        if Path::new(&rootless_socket).exists() {
            return Ok(RuntimeEndpoint {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless_socket,
            });
        }
    }

    if Path::new(ROOTFUL_PODMAN).exists() {
        return Ok(RuntimeEndpoint {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    if Path::new(DOCKER_SOCKET).exists() {
        return Ok(RuntimeEndpoint {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

fn default_socket_path(runtime: RuntimeType) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => ROOTFUL_PODMAN.to_string(),
    }
}
