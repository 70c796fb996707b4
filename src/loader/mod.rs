//! Module discovery and registration: manifest, filesystem scan, autoloader.

mod autoloader;
mod manifest;
mod scan;

pub use autoloader::{AutoLoader, Loaded, RegisteredModule, ScanTarget};
pub use manifest::{Manifest, ModuleEntry};
pub use scan::{compile_pattern, list_modules, normalize_path, ModuleListing};
