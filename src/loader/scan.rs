//! Filesystem enumeration of module files matching glob patterns.

use crate::error::ConfigError;
use crate::naming::module_base_name;
use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// A module file found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleListing {
    /// `/`-separated path, as matched against the pattern.
    pub path: String,
    /// File stem.
    pub name: String,
}

/// Compile a path glob. `*` stays within one segment; `**` spans directories.
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher, ConfigError> {
    let normalized = normalize_pattern(pattern);
    GlobBuilder::new(&normalized)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| ConfigError::Glob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// List files matching any of `patterns`, in pattern order then file-name order. Each file is listed once.
/// Patterns whose literal base directory does not exist contribute nothing.
pub fn list_modules(patterns: &[String]) -> Result<Vec<ModuleListing>, ConfigError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for pattern in patterns {
        let matcher = compile_pattern(pattern)?;
        let base = pattern_base(pattern);
        if !base.exists() {
            tracing::debug!(pattern = %pattern, base = %base.display(), "module root missing");
            continue;
        }
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry.map_err(|e| ConfigError::Scan(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = normalize_path(entry.path());
            if !matcher.is_match(&path) || !seen.insert(path.clone()) {
                continue;
            }
            let name = module_base_name(&path).to_string();
            out.push(ModuleListing { path, name });
        }
    }
    Ok(out)
}

/// `/`-joined path without `.` components.
pub fn normalize_path(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::CurDir => {}
            Component::Prefix(p) => out.push_str(&p.as_os_str().to_string_lossy()),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

fn normalize_pattern(pattern: &str) -> String {
    let mut p = pattern.replace('\\', "/");
    while let Some(rest) = p.strip_prefix("./") {
        p = rest.to_string();
    }
    p
}

/// Literal directory prefix of a pattern: the segments before the first one holding a glob metacharacter.
fn pattern_base(pattern: &str) -> PathBuf {
    let normalized = normalize_pattern(pattern);
    let literal: Vec<&str> = normalized
        .split('/')
        .take_while(|seg| !seg.contains(GLOB_META))
        .collect();
    let base = literal.join("/");
    if base.is_empty() {
        if normalized.starts_with('/') {
            PathBuf::from("/")
        } else {
            PathBuf::from(".")
        }
    } else {
        PathBuf::from(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_stops_at_first_glob_segment() {
        assert_eq!(pattern_base("src/models/**/*.rs"), PathBuf::from("src/models"));
        assert_eq!(pattern_base("./app/routes/*.rs"), PathBuf::from("app/routes"));
        assert_eq!(pattern_base("**/*.rs"), PathBuf::from("."));
        assert_eq!(pattern_base("/srv/app/models/**/*.rs"), PathBuf::from("/srv/app/models"));
    }

    #[test]
    fn double_star_spans_directories_single_star_does_not() {
        let deep = compile_pattern("src/routes/**/*.rs").unwrap();
        assert!(deep.is_match("src/routes/users.rs"));
        assert!(deep.is_match("src/routes/users/index.rs"));
        let shallow = compile_pattern("src/routes/*.rs").unwrap();
        assert!(shallow.is_match("src/routes/users.rs"));
        assert!(!shallow.is_match("src/routes/users/index.rs"));
    }

    #[test]
    fn invalid_glob_is_a_config_error() {
        assert!(matches!(compile_pattern("src/[oops"), Err(ConfigError::Glob { .. })));
    }

    #[test]
    fn normalizes_current_dir_components() {
        assert_eq!(normalize_path(Path::new("./src/models/User.rs")), "src/models/User.rs");
        assert_eq!(normalize_path(Path::new("/srv/./app")), "/srv/app");
    }
}
