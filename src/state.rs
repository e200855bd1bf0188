use std::sync::Arc;

use crate::{
    cart::CartEngine,
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
    store::OrmStore,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub carts: CartEngine,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        let orm = orm_from_pool(&pool);
        let store = Arc::new(OrmStore::new(orm.clone()));
        Self {
            pool,
            orm,
            config: Arc::new(config),
            carts: CartEngine::new(store.clone(), store),
        }
    }
}
