// ABOUTME: Runs a project's test suite inside a throwaway container.
// ABOUTME: Builds a test image from a per-ecosystem template, runs it and reports the exit code.

mod dockerfile;
mod error;

pub use dockerfile::DockerfileSwap;
pub use error::TestRunError;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diagnostics::{Diagnostics, Warning};
use crate::project::ProjectType;
use crate::runtime::build_context;
use crate::runtime::traits::{ContainerConfig, ContainerOps, ImageError, ImageOps, ROLE_LABEL};
use crate::types::{ImageRef, RepoName};

/// Builds and runs test images.
#[derive(Debug, Clone)]
pub struct TestRunner {
    prefix: String,
    templates_dir: PathBuf,
    build_timeout: Duration,
    run_timeout: Duration,
}

impl TestRunner {
    pub fn new(
        prefix: impl Into<String>,
        templates_dir: impl Into<PathBuf>,
        build_timeout: Duration,
        run_timeout: Duration,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            templates_dir: templates_dir.into(),
            build_timeout,
            run_timeout,
        }
    }

    /// Image the tests for `repo` are built into.
    pub fn image_for(&self, repo: &RepoName) -> ImageRef {
        ImageRef::new(
            None,
            &format!("{}-testrunner-{}", self.prefix, repo.image_name()),
            Some("latest"),
        )
    }

    /// Run the test suite of the working copy at `project_dir`.
    ///
    /// Returns the container's exit code; interpreting it is up to the caller.
    /// The test image, the container and the Dockerfile swap are always
    /// cleaned up, with failures recorded in `diag`.
    pub async fn run_tests<R>(
        &self,
        runtime: &R,
        repo: &RepoName,
        project_type: ProjectType,
        project_dir: &Path,
        diag: &mut Diagnostics,
    ) -> Result<i64, TestRunError>
    where
        R: ImageOps + ContainerOps + ?Sized,
    {
        let template_name = project_type
            .template_name()
            .ok_or(TestRunError::UnsupportedProject(project_type))?;
        let template = self.templates_dir.join(template_name).join("Dockerfile");
        if !template.is_file() {
            return Err(TestRunError::TemplateMissing(template));
        }

        let swap =
            DockerfileSwap::install(project_dir, &template).map_err(|source| {
                TestRunError::Dockerfile {
                    path: project_dir.join("Dockerfile"),
                    source,
                }
            })?;
        tracing::debug!(
            template = %template.display(),
            replaced_existing = swap.had_original(),
            "installed test Dockerfile"
        );

        let image = self.image_for(repo);
        let outcome = self.build_and_run(runtime, &image, project_dir, diag).await;

        match runtime.remove_image(&image.to_string(), true).await {
            Ok(()) | Err(ImageError::NotFound(_)) => {}
            Err(e) => diag.warn(Warning::image_removal(format!(
                "failed to remove test image {}: {}",
                image, e
            ))),
        }

        if let Err(e) = swap.restore() {
            diag.warn(Warning::dockerfile_restore(format!(
                "failed to restore Dockerfile in {}: {}",
                project_dir.display(),
                e
            )));
        }

        outcome
    }

    async fn build_and_run<R>(
        &self,
        runtime: &R,
        image: &ImageRef,
        project_dir: &Path,
        diag: &mut Diagnostics,
    ) -> Result<i64, TestRunError>
    where
        R: ImageOps + ContainerOps + ?Sized,
    {
        let context = build_context::archive(project_dir).map_err(TestRunError::Context)?;

        tracing::info!(image = %image, "building test image");
        tokio::time::timeout(self.build_timeout, runtime.build_image(context, image))
            .await
            .map_err(|_| TestRunError::Timeout {
                operation: "test image build",
                after: self.build_timeout,
            })?
            .map_err(TestRunError::Build)?;

        let config = ContainerConfig::for_image(image.clone()).label(ROLE_LABEL, "test");
        let id = runtime
            .create_container(&config)
            .await
            .map_err(TestRunError::Run)?;

        let waited = match runtime.start_container(&id).await {
            Ok(()) => {
                tracing::info!(container = %id.short(), "running tests");
                match tokio::time::timeout(self.run_timeout, runtime.wait_container(&id)).await {
                    Ok(result) => result.map_err(TestRunError::Run),
                    Err(_) => Err(TestRunError::Timeout {
                        operation: "test run",
                        after: self.run_timeout,
                    }),
                }
            }
            Err(e) => Err(TestRunError::Run(e)),
        };

        if let Err(e) = runtime.remove_container(&id, true).await {
            diag.warn(Warning::container_removal(format!(
                "failed to remove test container {}: {}",
                id.short(),
                e
            )));
        }

        let code = waited?;
        tracing::info!(exit_code = code, "tests finished");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeRuntime;
    use std::fs;
    use std::io::Read;

    const TEMPLATE: &str = "FROM python:3.12\nCOPY . /app\nRUN pip install -r requirements.txt\nCMD [\"pytest\"]\n";

    struct Fixture {
        _root: tempfile::TempDir,
        project: PathBuf,
        runner: TestRunner,
        repo: RepoName,
    }

    fn fixture() -> Fixture {
        crate::test_log::init();
        let root = tempfile::tempdir().unwrap();
        let templates = root.path().join("templates");
        fs::create_dir_all(templates.join("python")).unwrap();
        fs::write(templates.join("python/Dockerfile"), TEMPLATE).unwrap();

        let project = root.path().join("Shop-API");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("requirements.txt"), "flask\n").unwrap();

        let runner = TestRunner::new(
            "tinyci",
            templates,
            Duration::from_secs(5),
            Duration::from_secs(5),
        );
        Fixture {
            _root: root,
            project,
            runner,
            repo: RepoName::new("Shop-API").unwrap(),
        }
    }

    fn dockerfile_in_context(context: &[u8]) -> String {
        let mut archive = tar::Archive::new(context);
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().to_string_lossy() == "Dockerfile" {
                let mut s = String::new();
                entry.read_to_string(&mut s).unwrap();
                return s;
            }
        }
        panic!("no Dockerfile in build context");
    }

    #[tokio::test]
    async fn passing_run_restores_dockerfile_and_cleans_up() {
        let fx = fixture();
        let original = b"FROM gunicorn\nEXPOSE 5000\n".to_vec();
        fs::write(fx.project.join("Dockerfile"), &original).unwrap();
        let runtime = FakeRuntime::new();
        let mut diag = Diagnostics::default();

        let code = fx
            .runner
            .run_tests(&runtime, &fx.repo, ProjectType::Python, &fx.project, &mut diag)
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(fs::read(fx.project.join("Dockerfile")).unwrap(), original);
        assert!(!diag.has_warnings());

        let state = runtime.state();
        let (tag, context) = &state.build_contexts[0];
        assert_eq!(tag, "tinyci-testrunner-shop-api:latest");
        assert_eq!(dockerfile_in_context(context), TEMPLATE);
        assert!(state.images.is_empty());
        assert!(state.containers.is_empty());
    }

    #[tokio::test]
    async fn failing_tests_report_exit_code() {
        let fx = fixture();
        let runtime = FakeRuntime::new();
        runtime.state().test_exit_code = 2;
        let mut diag = Diagnostics::default();

        let code = fx
            .runner
            .run_tests(&runtime, &fx.repo, ProjectType::Python, &fx.project, &mut diag)
            .await
            .unwrap();

        assert_eq!(code, 2);
        assert!(!fx.project.join("Dockerfile").exists());
        assert!(runtime.state().containers.is_empty());
    }

    #[tokio::test]
    async fn build_failure_skips_run_and_restores() {
        let fx = fixture();
        fs::write(fx.project.join("Dockerfile"), "FROM alpine\n").unwrap();
        let runtime = FakeRuntime::new();
        runtime.state().fail_build = true;
        let mut diag = Diagnostics::default();

        let err = fx
            .runner
            .run_tests(&runtime, &fx.repo, ProjectType::Python, &fx.project, &mut diag)
            .await
            .unwrap_err();

        assert!(matches!(err, TestRunError::Build(_)));
        assert_eq!(
            fs::read_to_string(fx.project.join("Dockerfile")).unwrap(),
            "FROM alpine\n"
        );
        assert!(!runtime.calls().iter().any(|c| c.starts_with("create")));
    }

    #[tokio::test]
    async fn run_timeout_removes_container() {
        let mut fx = fixture();
        fx.runner.run_timeout = Duration::from_millis(20);
        let runtime = FakeRuntime::new();
        runtime.state().wait_delay = Some(Duration::from_secs(30));
        let mut diag = Diagnostics::default();

        let err = fx
            .runner
            .run_tests(&runtime, &fx.repo, ProjectType::Python, &fx.project, &mut diag)
            .await
            .unwrap_err();

        assert!(matches!(err, TestRunError::Timeout { operation: "test run", .. }));
        assert!(runtime.state().containers.is_empty());
        assert!(runtime.state().images.is_empty());
    }

    #[tokio::test]
    async fn unsupported_project_touches_nothing() {
        let fx = fixture();
        let runtime = FakeRuntime::new();
        let mut diag = Diagnostics::default();

        let err = fx
            .runner
            .run_tests(&runtime, &fx.repo, ProjectType::Unsupported, &fx.project, &mut diag)
            .await
            .unwrap_err();

        assert!(matches!(err, TestRunError::UnsupportedProject(ProjectType::Unsupported)));
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_template_is_reported() {
        let fx = fixture();
        let runtime = FakeRuntime::new();
        let mut diag = Diagnostics::default();

        let err = fx
            .runner
            .run_tests(&runtime, &fx.repo, ProjectType::Go, &fx.project, &mut diag)
            .await
            .unwrap_err();

        assert!(matches!(err, TestRunError::TemplateMissing(path) if path.ends_with("go/Dockerfile")));
    }

    #[tokio::test]
    async fn image_removal_failure_is_a_warning() {
        let fx = fixture();
        let runtime = FakeRuntime::new();
        runtime.state().fail_remove_image = true;
        let mut diag = Diagnostics::default();

        let code = fx
            .runner
            .run_tests(&runtime, &fx.repo, ProjectType::Python, &fx.project, &mut diag)
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(diag.warnings().len(), 1);
    }
}
