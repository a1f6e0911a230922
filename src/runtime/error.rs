// ABOUTME: Errors raised while locating and connecting to the container engine.
// ABOUTME: SNAFU context selectors tag which phase failed.

use snafu::Snafu;

use super::detection::DetectionError;
use super::traits::RuntimeInfoError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("no usable container engine: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("container engine unavailable: {source}"))]
    Connection { source: RuntimeInfoError },
}

/// Coarse classification of a [`RuntimeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    NoRuntimeFound,
    /// The configured socket path does not exist.
    SocketMissing,
    ConnectionFailed,
    /// The engine answered but refused the request.
    RuntimeOperation,
}

impl RuntimeError {
    pub fn kind(&self) -> RuntimeErrorKind {
        use RuntimeErrorKind as K;
        match self {
            RuntimeError::Detection {
                source: DetectionError::NoRuntimeFound,
            } => K::NoRuntimeFound,
            RuntimeError::Detection {
                source: DetectionError::SocketMissing(_),
            } => K::SocketMissing,
            RuntimeError::Connection {
                source: RuntimeInfoError::ConnectionFailed(_),
            } => K::ConnectionFailed,
            RuntimeError::Connection {
                source: RuntimeInfoError::Runtime(_),
            } => K::RuntimeOperation,
        }
    }
}
