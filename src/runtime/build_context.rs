// ABOUTME: Packs a project directory into a tar build context.
// ABOUTME: Walks the tree in sorted order, leaving out .git and anything .dockerignore excludes.

use std::fs;
use std::io;
use std::path::Path;

/// Directory names never sent to the image builder.
const EXCLUDED: &[&str] = &[".git"];

/// Files the builder always needs, whatever `.dockerignore` says.
const ALWAYS_SENT: &[&str] = &["Dockerfile", ".dockerignore"];

/// Archive `dir` as an uncompressed tar stream suitable for `build_image`.
///
/// Patterns from `dir/.dockerignore` are honoured. Symlinks are stored as
/// links rather than followed.
pub fn archive(dir: &Path) -> io::Result<Vec<u8>> {
    let ignore = match fs::read_to_string(dir.join(".dockerignore")) {
        Ok(text) => DockerIgnore::parse(&text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => DockerIgnore::default(),
        Err(e) => return Err(e),
    };

    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    append_dir(&mut builder, &ignore, dir, "")?;
    builder.into_inner()
}

fn append_dir(
    builder: &mut tar::Builder<Vec<u8>>,
    ignore: &DockerIgnore,
    dir: &Path,
    prefix: &str,
) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if prefix.is_empty() && EXCLUDED.iter().any(|x| name == *x) {
            continue;
        }

        let path = entry.path();
        let archived = if prefix.is_empty() {
            name.into_owned()
        } else {
            format!("{prefix}/{name}")
        };
        let excluded = ignore.excludes(&archived)
            && !(prefix.is_empty() && ALWAYS_SENT.contains(&archived.as_str()));

        if entry.file_type()?.is_dir() {
            if excluded && !ignore.has_exceptions() {
                continue;
            }
            if !excluded {
                builder.append_dir(&archived, &path)?;
            }
            append_dir(builder, ignore, &path, &archived)?;
        } else if !excluded {
            builder.append_path_with_name(&path, &archived)?;
        }
    }

    Ok(())
}

/// Parsed `.dockerignore` rules, evaluated in order with the last match winning.
#[derive(Debug, Default)]
struct DockerIgnore {
    rules: Vec<Rule>,
}

#[derive(Debug)]
struct Rule {
    segments: Vec<String>,
    exception: bool,
}

impl DockerIgnore {
    fn parse(text: &str) -> Self {
        let rules = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let (exception, pattern) = match line.strip_prefix('!') {
                    Some(rest) => (true, rest.trim()),
                    None => (false, line),
                };
                let segments: Vec<String> = pattern
                    .split('/')
                    .filter(|s| !s.is_empty() && *s != ".")
                    .map(str::to_owned)
                    .collect();
                (!segments.is_empty()).then_some(Rule {
                    segments,
                    exception,
                })
            })
            .collect();
        Self { rules }
    }

    fn has_exceptions(&self) -> bool {
        self.rules.iter().any(|r| r.exception)
    }

    /// Whether `relative` (slash separated, no leading slash) is left out.
    ///
    /// A rule matching a parent directory also covers everything under it.
    fn excludes(&self, relative: &str) -> bool {
        let parts: Vec<&str> = relative.split('/').collect();
        let mut excluded = false;
        for rule in &self.rules {
            if (1..=parts.len()).any(|n| match_segments(&rule.segments, &parts[..n])) {
                excluded = !rule.exception;
            }
        }
        excluded
    }
}

fn match_segments(pattern: &[String], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((first, rest)) if first == "**" => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((first, rest)) => match path.split_first() {
            Some((head, tail)) => {
                match_segment(first.as_bytes(), head.as_bytes()) && match_segments(rest, tail)
            }
            None => false,
        },
    }
}

/// Single path component match supporting `*` and `?`.
fn match_segment(pattern: &[u8], name: &[u8]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some((b'*', rest)) => (0..=name.len()).any(|skip| match_segment(rest, &name[skip..])),
        Some((b'?', rest)) => !name.is_empty() && match_segment(rest, &name[1..]),
        Some((c, rest)) => name.first() == Some(c) && match_segment(rest, &name[1..]),
    }
}
