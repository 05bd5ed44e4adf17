//! main file for the server

pub(crate) mod auth;
pub(crate) mod controller;
pub(crate) mod database;
pub(crate) mod model;
mod routes;
pub(crate) mod service;
pub(crate) mod state;
pub(crate) mod util;

use std::io;
use std::sync::Arc;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info, warn};
use crate::server::auth::token::TokenService;
use crate::server::database::memory::MemoryStore;
use crate::server::database::postgres::PgStore;
use crate::server::database::store::Store;
use crate::server::model::config::{ServerConfig, StoreBackend};
use crate::server::state::AppState;

async fn open_store(config: &ServerConfig) -> io::Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(config).await.map_err(|e| {
                error!("failed to connect to postgres, {:#}", e);
                io::Error::other(e)
            })?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("using the in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Run the server
pub(crate) async fn run(config: ServerConfig) -> io::Result<()> {
    let store = open_store(&config).await?;
    let state = web::Data::new(AppState::new(
        store,
        TokenService::new(&config.jwt_secret, config.token_ttl),
    ));
    info!("listening on {} with {} store", config.addr, config.store_backend);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
        .bind(config.addr)?
        .run()
        .await
}
