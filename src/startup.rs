use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::http::header;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::Settings;
use crate::routes::{get_stats, handle_subscribe, handle_unsubscribe, health_check};
use crate::store::{get_connection_pool, SubscriberStore};

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("Failed to open the database.")]
    Database(#[from] sqlx::Error),
    #[error("Failed to start the HTTP server.")]
    Io(#[from] std::io::Error),
}

pub struct Application {
    pub port: u16,
    pub server: Server,
    store: SubscriberStore,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, StartupError> {
        let db_pool = get_connection_pool(&config.database).await?;
        let store = SubscriberStore::new(db_pool);

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, store.clone(), config.application.allowed_origins)?;

        Ok(Self {
            port,
            server,
            store,
        })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn store(&self) -> SubscriberStore {
        self.store.clone()
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    store: SubscriberStore,
    allowed_origins: Vec<String>,
) -> Result<Server, std::io::Error> {
    let store = web::Data::new(store);

    let server = HttpServer::new(move || {
        let cors = allowed_origins.iter().fold(
            Cors::default()
                .allowed_methods(vec!["GET", "POST"])
                .allowed_header(header::CONTENT_TYPE)
                .max_age(3600),
            |cors, origin| cors.allowed_origin(origin),
        );

        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .wrap(cors)
            .route("/health", web::get().to(health_check))
            .route("/subscribe", web::post().to(handle_subscribe))
            .route("/unsubscribe", web::post().to(handle_unsubscribe))
            .route("/stats", web::get().to(get_stats))
            .app_data(store.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
