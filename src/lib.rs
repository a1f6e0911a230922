// ABOUTME: Library root for tinyci - the CI/CD pipeline engine.
// ABOUTME: The main binary in main.rs is a thin driver around `pipeline::Orchestrator`.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod git;
pub mod pipeline;
pub mod project;
pub mod publish;
pub mod retention;
pub mod runtime;
pub mod testrunner;
#[cfg(test)]
mod test_log;
pub mod types;
