pub mod auth;
pub mod books;

use std::sync::Arc;

use bookshelf_authz::TokenService;
use bookshelf_kernel::ModuleRegistry;

/// Register all application modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, tokens: Arc<TokenService>) {
    registry.register(Arc::new(auth::AuthModule::new(tokens.clone())));
    registry.register(books::create_module(tokens));
}
