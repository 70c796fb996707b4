//! AutoLoader: registers manifest modules under convention-derived keys, then resolves every route.

use crate::config::LoaderConfig;
use crate::container::{Container, Lifetime, Registration};
use crate::error::{ConfigError, StartupError};
use crate::loader::manifest::Manifest;
use crate::loader::scan::{compile_pattern, list_modules, normalize_path, ModuleListing};
use crate::naming::{resolve_dependency_name, Role};
use globset::GlobMatcher;
use std::collections::HashSet;
use std::path::Path;

/// One role root combined with one glob suffix.
#[derive(Clone, Debug)]
pub struct ScanTarget {
    pub role: Role,
    pub pattern: String,
    pub lifetime: Lifetime,
    matcher: GlobMatcher,
}

impl ScanTarget {
    fn new(role: Role, root: &str, glob: &str, lifetime: Lifetime) -> Result<Self, ConfigError> {
        let pattern = format!("{}{}", root, glob);
        let matcher = compile_pattern(&pattern)?;
        Ok(ScanTarget {
            role,
            pattern,
            lifetime,
            matcher,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

/// A manifest entry as registered in the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredModule {
    pub path: String,
    pub key: String,
    pub role: Role,
}

/// Result of a completed load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Loaded {
    pub registered: Vec<RegisteredModule>,
    /// Route keys in resolution order.
    pub routes: Vec<String>,
}

pub struct AutoLoader {
    config: LoaderConfig,
    manifest: Manifest,
    default_lifetime: Lifetime,
}

impl AutoLoader {
    pub fn new(config: LoaderConfig, manifest: Manifest) -> Self {
        AutoLoader {
            config,
            manifest,
            default_lifetime: Lifetime::Singleton,
        }
    }

    /// Lifetime for controllers and routes. Models are always singletons.
    pub fn default_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Per glob: models, controllers, routes.
    pub fn targets(&self) -> Result<Vec<ScanTarget>, ConfigError> {
        let mut targets = Vec::with_capacity(self.config.module_globs.len() * 3);
        for glob in &self.config.module_globs {
            targets.push(ScanTarget::new(Role::Models, &self.config.models_path, glob, Lifetime::Singleton)?);
            targets.push(ScanTarget::new(
                Role::Controllers,
                &self.config.controllers_path,
                glob,
                self.default_lifetime,
            )?);
            targets.push(ScanTarget::new(Role::Routes, &self.config.routes_path, glob, self.default_lifetime)?);
        }
        Ok(targets)
    }

    /// Register every manifest entry that falls under a target. Entries outside all targets are skipped.
    pub fn register(&self, container: &Container) -> Result<Vec<RegisteredModule>, StartupError> {
        let targets = self.targets()?;
        let mut registered = Vec::new();
        for entry in self.manifest.entries() {
            let path = normalize_path(Path::new(entry.path()));
            let Some(target) = targets.iter().find(|t| t.matches(&path)) else {
                tracing::debug!(path = %path, "module outside configured roots; skipped");
                continue;
            };
            let key = resolve_dependency_name(&path, entry.name())?;
            container.register(key.clone(), Registration::new(target.lifetime, entry.factory()))?;
            tracing::trace!(path = %path, key = %key, role = %target.role, "module registered");
            registered.push(RegisteredModule {
                path,
                key,
                role: target.role,
            });
        }
        Ok(registered)
    }

    /// Register all modules, then resolve each route module in manifest order so the whole
    /// graph behind it (controllers, models) is constructed. The first failure aborts the load.
    /// With no route modules the load completes immediately.
    pub fn load(&self, container: &Container) -> Result<Loaded, StartupError> {
        let span = tracing::info_span!("autoloader", scope = "supermodels.autoloader");
        let _enter = span.enter();
        tracing::trace!("autoloader starts");

        let registered = self.register(container)?;
        let routes: Vec<String> = registered
            .iter()
            .filter(|m| m.role == Role::Routes)
            .map(|m| m.key.clone())
            .collect();

        if routes.is_empty() {
            tracing::info!(modules = registered.len(), "no route modules to resolve");
            return Ok(Loaded { registered, routes });
        }

        for key in &routes {
            container.resolve(key)?;
            tracing::debug!(key = %key, "route module resolved");
        }
        tracing::info!(modules = registered.len(), routes = routes.len(), "modules loaded");
        Ok(Loaded { registered, routes })
    }

    /// Module files on disk, under the configured targets, that have no manifest entry.
    pub fn audit(&self) -> Result<Vec<ModuleListing>, ConfigError> {
        let patterns: Vec<String> = self.targets()?.into_iter().map(|t| t.pattern).collect();
        let known: HashSet<String> = self
            .manifest
            .entries()
            .iter()
            .map(|e| normalize_path(Path::new(e.path())))
            .collect();
        Ok(list_modules(&patterns)?
            .into_iter()
            .filter(|listing| !known.contains(&listing.path))
            .collect())
    }
}
