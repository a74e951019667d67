// Application state module
// Immutable per-process state shared across all connections

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::types::Config;
use crate::template::TemplateEngine;

/// Application state
///
/// Built once at startup and never mutated afterwards; every connection
/// shares it through an `Arc`.
pub struct AppState {
    pub config: Config,
    pub templates: TemplateEngine,

    // Cached config value for fast access without locks
    pub cached_access_log: Arc<AtomicBool>,
}

impl AppState {
    /// Create `AppState` from the loaded configuration
    ///
    /// Resolves the template directory to an absolute path. The directory
    /// is only required to exist once a template is rendered.
    pub fn new(config: &Config) -> std::io::Result<Self> {
        let templates = TemplateEngine::new(
            &config.templates.directory,
            config.templates.auto_reload,
        )?;

        Ok(Self {
            config: config.clone(),
            templates,
            cached_access_log: Arc::new(AtomicBool::new(config.logging.access_log)),
        })
    }
}
