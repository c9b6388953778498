use std::io;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info, warn};

mod chat;
mod config;
mod db;
mod error;
mod flash;
mod handlers;
mod middleware;
mod models;
mod payment;
mod pricing;
mod session;
mod settlement;
mod shipping;
mod state;
mod store;
#[cfg(test)]
mod testing;

use crate::config::Config;
use crate::db::MongoStore;
use crate::payment::{PaymentGateway, RazorpayClient};
use crate::session::SessionKeys;
use crate::shipping::{ShippingProvider, ShiprocketClient};
use crate::state::AppState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok(); // Load environment variables from .env file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io::Error::other(e.to_string()))?;

    // Connect to the MongoDB database
    let database = db::connect(&config).await.map_err(|e| io::Error::other(e.to_string()))?;
    if let Err(e) = db::init(&database).await {
        error!("Database initialization failed: {}", e);
    }
    if let Some(seed) = &config.admin {
        match session::hash_password(&seed.password) {
            Ok(hash) => {
                if let Err(e) = db::seed_admin(&database, seed, hash).await {
                    error!("Could not seed admin account: {}", e);
                }
            }
            Err(e) => error!("Could not hash admin password: {}", e),
        }
    }
    let store = MongoStore::new(&database);

    let http = reqwest::Client::new();
    let payments: Option<Arc<dyn PaymentGateway>> = match &config.razorpay {
        Some(cfg) => RazorpayClient::new(http.clone(), cfg)
            .probe()
            .await
            .map(|client| Arc::new(client) as Arc<dyn PaymentGateway>),
        None => {
            warn!("Razorpay keys not set, payments disabled");
            None
        }
    };
    let shipping: Option<Arc<dyn ShippingProvider>> = match &config.shiprocket {
        Some(cfg) => ShiprocketClient::connect(http.clone(), cfg)
            .await
            .map(|client| Arc::new(client) as Arc<dyn ShippingProvider>),
        None => {
            warn!("Shiprocket credentials not set, shipments disabled");
            None
        }
    };

    let keys = SessionKeys::new(config.session_secret.clone(), config.session_ttl_hours);
    let static_dir = config.static_dir.clone();
    let state = web::Data::new(AppState {
        store: Arc::new(store),
        payments,
        shipping,
        webhook_secret: config.webhook_secret.clone(),
        sessions: keys.clone(),
        static_dir: static_dir.clone(),
    });

    info!("KropKart listening on {}:{}", config.bind_addr, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::AuthMiddleware::new(keys.clone()))
            .wrap(Logger::default())
            .service(actix_files::Files::new("/statics", static_dir.clone()))
            .configure(handlers::routes)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
