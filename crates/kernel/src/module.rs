use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_db::DocumentStore;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub store: Arc<dyn DocumentStore>,
}

/// Core module trait that all bookshelf modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Path the module's router is mounted under.
    /// `None` mounts under `/api/{module_name}`, `"/"` merges at the root.
    fn mount_path(&self) -> Option<&'static str> {
        None
    }

    /// Initialize the module with the provided context.
    /// Called during application startup, before any route is served.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Start background tasks for this module
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources
    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Resolve the path a module is mounted under.
pub fn resolve_mount_path(module: &dyn Module) -> String {
    match module.mount_path() {
        Some(path) => path.to_string(),
        None => format!("/api/{}", module.name()),
    }
}
