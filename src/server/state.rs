use std::sync::Arc;
use crate::server::auth::token::TokenService;
use crate::server::database::store::Store;

#[derive(Clone)]
pub(crate) struct AppState {
    store: Arc<dyn Store>,
    tokens: TokenService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}
