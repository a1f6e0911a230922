// ABOUTME: Build ecosystem detection for a working copy.
// ABOUTME: Maps marker files to a closed set of project types.

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Build ecosystem of a working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectType {
    Maven,
    DotNet,
    Python,
    Go,
    Unsupported,
}

impl ProjectType {
    /// Directory under the templates dir holding this type's test Dockerfile.
    pub fn template_name(&self) -> Option<&'static str> {
        match self {
            ProjectType::Maven => Some("maven"),
            ProjectType::DotNet => Some("dotnet"),
            ProjectType::Python => Some("python"),
            ProjectType::Go => Some("go"),
            ProjectType::Unsupported => None,
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectType::Maven => "MAVEN",
            ProjectType::DotNet => "DOTNET",
            ProjectType::Python => "PYTHON",
            ProjectType::Go => "GO",
            ProjectType::Unsupported => "UNSUPPORTED",
        };
        f.write_str(s)
    }
}

/// Classify `dir` by its top-level marker files.
///
/// Checked in order: `pom.xml`, any `*.csproj` or `*.cs`, `requirements.txt`
/// or `setup.py`, `go.mod`. Unreadable directories are `Unsupported`.
pub fn detect(dir: &Path) -> ProjectType {
    if dir.join("pom.xml").is_file() {
        return ProjectType::Maven;
    }
    if has_dotnet_sources(dir) {
        return ProjectType::DotNet;
    }
    if dir.join("requirements.txt").is_file() || dir.join("setup.py").is_file() {
        return ProjectType::Python;
    }
    if dir.join("go.mod").is_file() {
        return ProjectType::Go;
    }
    ProjectType::Unsupported
}

fn has_dotnet_sources(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == "csproj" || ext == "cs")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_directory_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect(dir.path()), ProjectType::Unsupported);
    }

    #[test]
    fn missing_directory_is_unsupported() {
        assert_eq!(
            detect(Path::new("/nonexistent/tinyci/project")),
            ProjectType::Unsupported
        );
    }

    #[test]
    fn nested_sources_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/Program.cs"), "class P {}").unwrap();
        assert_eq!(detect(dir.path()), ProjectType::Unsupported);
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ProjectType::DotNet).unwrap(),
            "\"DOTNET\""
        );
        assert_eq!(ProjectType::Python.to_string(), "PYTHON");
    }
}
