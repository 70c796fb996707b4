//! Path-to-dependency-name convention for route, model and controller modules.

use crate::error::NameResolutionError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// First offset (from the end of the path) inspected for a namespace token: the file's parent directory.
const FIRST_OFFSET: usize = 2;
/// Last offset inspected, inclusive.
const LAST_OFFSET: usize = 5;

/// Architectural role of a module, identified by a namespace token in its path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Routes,
    Models,
    Controllers,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Routes, Role::Models, Role::Controllers];

    /// Directory name that marks the role.
    pub fn token(self) -> &'static str {
        match self {
            Role::Routes => "routes",
            Role::Models => "models",
            Role::Controllers => "controllers",
        }
    }

    /// Models and controllers are registered under a singular suffix; routes stay plural.
    pub fn is_singular(self) -> bool {
        matches!(self, Role::Models | Role::Controllers)
    }

    /// Key suffix: the token capitalized, with one trailing character dropped when singular.
    pub fn suffix(self) -> String {
        let token = self.token();
        let mut chars = token.chars();
        let mut out = String::with_capacity(token.len());
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
        }
        let rest = chars.as_str();
        if self.is_singular() {
            let mut rest_chars = rest.chars();
            rest_chars.next_back();
            out.push_str(rest_chars.as_str());
        } else {
            out.push_str(rest);
        }
        out
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Role {
    type Err = NameResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.token() == s)
            .ok_or_else(|| NameResolutionError { path: s.to_string() })
    }
}

/// Resolved registration name plus the role it was derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedName {
    pub key: String,
    pub role: Role,
}

/// Dependency key for a module at `module_path` whose base name is `base_name`.
/// e.g. "app/models/User.rs" + "User" -> "UserModel", "app/routes/users/index.rs" + "index" -> "usersindexRoutes"
pub fn resolve_dependency_name(module_path: &str, base_name: &str) -> Result<String, NameResolutionError> {
    resolve_with_role(module_path, base_name).map(|r| r.key)
}

/// Like [`resolve_dependency_name`], also reporting which namespace token matched.
///
/// Walks backward from the file's parent directory up to the fifth segment from the end.
/// Segments skipped before the token are concatenated in walk order (deepest first) as the root prefix.
pub fn resolve_with_role(module_path: &str, base_name: &str) -> Result<ResolvedName, NameResolutionError> {
    let segments: Vec<&str> = module_path.split('/').collect();
    let mut skipped: Vec<&str> = Vec::new();

    for offset in FIRST_OFFSET..=LAST_OFFSET {
        let Some(idx) = segments.len().checked_sub(offset) else {
            continue;
        };
        let segment = segments[idx];
        match segment.parse::<Role>() {
            Ok(role) => {
                let root_prefix = skipped.concat();
                let key = format!("{}{}{}", root_prefix, base_name, role.suffix());
                tracing::trace!(path = %module_path, key = %key, "resolved dependency name");
                return Ok(ResolvedName { key, role });
            }
            Err(_) => skipped.push(segment),
        }
    }

    Err(NameResolutionError {
        path: module_path.to_string(),
    })
}

/// Base name of a module file: its stem, without directories or extension.
pub fn module_base_name(module_path: &str) -> &str {
    Path::new(module_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(module_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_follow_role() {
        assert_eq!(Role::Models.suffix(), "Model");
        assert_eq!(Role::Controllers.suffix(), "Controller");
        assert_eq!(Role::Routes.suffix(), "Routes");
    }

    #[test]
    fn resolves_direct_children() {
        assert_eq!(resolve_dependency_name("app/models/User.rs", "User").unwrap(), "UserModel");
        assert_eq!(
            resolve_dependency_name("app/controllers/User.rs", "User").unwrap(),
            "UserController"
        );
        assert_eq!(resolve_dependency_name("routes/health.rs", "health").unwrap(), "healthRoutes");
    }

    #[test]
    fn prefix_is_collected_deepest_first() {
        assert_eq!(
            resolve_dependency_name("app/routes/users/index.rs", "index").unwrap(),
            "usersindexRoutes"
        );
        assert_eq!(
            resolve_dependency_name("app/models/billing/v2/Invoice.rs", "Invoice").unwrap(),
            "v2billingInvoiceModel"
        );
    }

    #[test]
    fn token_beyond_window_fails() {
        let err = resolve_dependency_name("app/models/a/b/c/d/User.rs", "User").unwrap_err();
        assert_eq!(err.to_string(), "Cant determine dep name for: app/models/a/b/c/d/User.rs");
    }

    #[test]
    fn token_at_last_offset_resolves() {
        let key = resolve_dependency_name("app/models/a/b/c/User.rs", "User").unwrap();
        assert_eq!(key, "cbaUserModel");
    }

    #[test]
    fn file_named_like_token_is_not_a_namespace() {
        assert!(resolve_dependency_name("app/lib/models", "models").is_err());
    }

    #[test]
    fn short_paths_fail_without_panicking() {
        assert!(resolve_dependency_name("User.rs", "User").is_err());
        assert!(resolve_dependency_name("", "").is_err());
    }

    #[test]
    fn base_name_is_file_stem() {
        assert_eq!(module_base_name("src/models/User.rs"), "User");
        assert_eq!(module_base_name("index"), "index");
    }
}
