//! Process lifecycle: open the store, initialize modules, serve, shut down.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use bookshelf_authz::TokenService;
use bookshelf_db::{DocumentStore, SqliteStore};
use bookshelf_kernel::settings::{DatabaseSettings, Settings};
use bookshelf_kernel::{InitCtx, ModuleRegistry};

use crate::modules;

/// Build the token service from the auth settings.
pub fn token_service(settings: &Settings) -> anyhow::Result<Arc<TokenService>> {
    let tokens = TokenService::new(&settings.auth.token_secret, settings.auth.token_ttl_hours)
        .context("invalid auth settings; set BOOKSHELF_AUTH__TOKEN_SECRET")?;
    Ok(Arc::new(tokens))
}

/// Open the SQLite document store described by the database settings.
pub async fn open_store(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = SqliteStore::open(&settings.path)
        .await
        .with_context(|| format!("failed to open document store '{}'", settings.path))?;
    Ok(Arc::new(store))
}

/// Register and initialize every module. Fails if any module cannot start,
/// including when the books collection cannot be ensured.
pub async fn init_modules(
    settings: &Settings,
    store: Arc<dyn DocumentStore>,
    tokens: Arc<TokenService>,
) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, tokens);

    let ctx = InitCtx { settings, store };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;
    Ok(registry)
}

/// Run the service until a termination signal arrives.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    run_until(settings, bookshelf_http::shutdown_signal()).await
}

/// Run the service until `shutdown` resolves, then release the store.
pub async fn run_until<F>(settings: Settings, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let tokens = token_service(&settings)?;
    let store = open_store(&settings.database).await?;

    let served = serve(&settings, store.clone(), tokens, shutdown).await;

    match store.close().await {
        Ok(()) => tracing::info!("document store closed"),
        Err(e) => tracing::error!(error = %e, "failed to close document store"),
    }

    served
}

async fn serve<F>(
    settings: &Settings,
    store: Arc<dyn DocumentStore>,
    tokens: Arc<TokenService>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = init_modules(settings, store, tokens).await?;
    tracing::info!("bootstrap complete, {} modules ready", registry.module_count());

    let served = bookshelf_http::start_server(&registry, settings, shutdown).await;

    if let Err(e) = registry.stop_all().await {
        tracing::error!(error = %e, "failed to stop modules cleanly");
    }
    served
}
