//! Explicit module manifest: each entry pairs a module path with the factory that builds it.

use crate::container::{factory_fn, Factory, ResolveContext};
use crate::error::FactoryError;
use crate::factory::ModelBinder;
use crate::naming::module_base_name;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct ModuleEntry {
    path: String,
    name: String,
    factory: Arc<dyn Factory>,
}

impl ModuleEntry {
    /// Entry named after the file stem of `path`.
    pub fn new(path: impl Into<String>, factory: Arc<dyn Factory>) -> Self {
        let path = path.into().replace('\\', "/");
        let name = module_base_name(&path).to_string();
        ModuleEntry { path, name, factory }
    }

    pub fn from_fn<F, T>(path: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ResolveContext<'_>) -> Result<T, FactoryError> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Self::new(path, factory_fn(f))
    }

    pub fn model(path: impl Into<String>, binder: ModelBinder) -> Self {
        Self::new(path, Arc::new(binder))
    }

    /// Override the base name used for the dependency key (defaults to the file stem).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> Arc<dyn Factory> {
        Arc::clone(&self.factory)
    }
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("path", &self.path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Manifest {
    entries: Vec<ModuleEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entry: ModuleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn push(&mut self, entry: ModuleEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ModuleEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = ModuleEntry>>(iter: I) -> Self {
        Manifest {
            entries: iter.into_iter().collect(),
        }
    }
}
