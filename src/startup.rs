//! Startup sequence: connect, build the container, load modules.

use crate::config::AppConfig;
use crate::connection::Database;
use crate::container::Container;
use crate::error::StartupError;
use crate::loader::{AutoLoader, Loaded, Manifest};
use std::sync::Arc;

/// A fully wired application: every route module and its dependencies are constructed.
pub struct Ready {
    pub container: Arc<Container>,
    pub loaded: Loaded,
}

/// Connect the configured store, then register and load `manifest`.
pub async fn start(config: &AppConfig, manifest: Manifest) -> Result<Ready, StartupError> {
    let database = Database::connect(&config.database).await?;
    let container = Arc::new(Container::new(database));
    let loader = AutoLoader::new(config.loader.clone(), manifest);
    start_with(container, &loader)
}

/// Load `loader` into an existing container. Files under the module roots that are missing
/// from the manifest are reported but do not stop startup.
pub fn start_with(container: Arc<Container>, loader: &AutoLoader) -> Result<Ready, StartupError> {
    for listing in loader.audit()? {
        tracing::warn!(path = %listing.path, "module file has no manifest entry; not loaded");
    }
    let loaded = loader.load(&container)?;
    Ok(Ready { container, loaded })
}
