// ABOUTME: Temporarily replaces a working copy's Dockerfile with a test template.
// ABOUTME: The original is put back on restore or when the guard is dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Holds the original Dockerfile bytes while a test template sits in its place.
#[derive(Debug)]
pub struct DockerfileSwap {
    path: PathBuf,
    original: Option<Vec<u8>>,
    restored: bool,
}

impl DockerfileSwap {
    /// Move any existing `Dockerfile` in `project_dir` aside and copy `template` in.
    pub fn install(project_dir: &Path, template: &Path) -> io::Result<Self> {
        let path = project_dir.join("Dockerfile");
        let replacement = fs::read(template)?;

        let original = match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        if original.is_some() {
            fs::remove_file(&path)?;
        }

        let swap = Self {
            path,
            original,
            restored: false,
        };
        fs::write(&swap.path, replacement)?;
        Ok(swap)
    }

    pub fn had_original(&self) -> bool {
        self.original.is_some()
    }

    /// Remove the template and rewrite the original, reporting failure.
    pub fn restore(mut self) -> io::Result<()> {
        self.restored = true;
        self.put_back()
    }

    fn put_back(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        if let Some(original) = &self.original {
            fs::write(&self.path, original)?;
        }
        Ok(())
    }
}

impl Drop for DockerfileSwap {
    fn drop(&mut self) {
        if !self.restored
            && let Err(e) = self.put_back()
        {
            tracing::warn!(path = %self.path.display(), "failed to restore Dockerfile: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.Dockerfile");
        fs::write(&template, "FROM python:3.12\nRUN pytest\n").unwrap();
        let project = dir.path().join("project");
        fs::create_dir(&project).unwrap();
        (dir, project)
    }

    #[test]
    fn install_then_restore_puts_original_back() {
        let (dir, project) = setup();
        let original = b"FROM scratch\n# keep \xff bytes\n".to_vec();
        fs::write(project.join("Dockerfile"), &original).unwrap();

        let swap = DockerfileSwap::install(&project, &dir.path().join("template.Dockerfile"))
            .unwrap();
        assert!(swap.had_original());
        assert_eq!(
            fs::read_to_string(project.join("Dockerfile")).unwrap(),
            "FROM python:3.12\nRUN pytest\n"
        );

        swap.restore().unwrap();
        assert_eq!(fs::read(project.join("Dockerfile")).unwrap(), original);
    }

    #[test]
    fn drop_without_restore_puts_original_back() {
        let (dir, project) = setup();
        fs::write(project.join("Dockerfile"), "FROM alpine\n").unwrap();

        {
            let _swap =
                DockerfileSwap::install(&project, &dir.path().join("template.Dockerfile"))
                    .unwrap();
        }

        assert_eq!(
            fs::read_to_string(project.join("Dockerfile")).unwrap(),
            "FROM alpine\n"
        );
    }

    #[test]
    fn template_is_removed_when_no_original_existed() {
        let (dir, project) = setup();

        let swap = DockerfileSwap::install(&project, &dir.path().join("template.Dockerfile"))
            .unwrap();
        assert!(!swap.had_original());
        assert!(project.join("Dockerfile").exists());

        swap.restore().unwrap();
        assert!(!project.join("Dockerfile").exists());
    }

    #[test]
    fn missing_template_leaves_original_untouched() {
        let (dir, project) = setup();
        fs::write(project.join("Dockerfile"), "FROM alpine\n").unwrap();

        let result = DockerfileSwap::install(&project, &dir.path().join("nope"));
        assert!(result.is_err());
        assert_eq!(
            fs::read_to_string(project.join("Dockerfile")).unwrap(),
            "FROM alpine\n"
        );
    }
}
