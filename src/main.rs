use std::sync::Arc;

use actix_web::{App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};

use event_manager::clock::{Clock, SystemClock};
use event_manager::config::Config;
use event_manager::db::{init_db_pool, run_migrations, Db};
use event_manager::service::auth::{jwt::JwksVerifier, Authenticator};
use event_manager::service::log::{init_logger, LoggerMiddleware};
use event_manager::service::processor::StripeClient;
use event_manager::{configure, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    init_logger();

    let config = Config::from_env().map_err(|err| {
        error!("invalid configuration: {err}");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;

    let db = match &config.database_url {
        Some(url) => {
            let pool = init_db_pool(url, config.db_max_connections)
                .await
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
            run_migrations(&pool)
                .await
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
            Db::Postgres(pool)
        }
        None => Db::memory(),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let authenticator = match &config.auth {
        Some(auth) => Authenticator::Jwks(JwksVerifier::new(auth, clock.clone())),
        None => {
            warn!("authentication disabled; requests run as the development user");
            Authenticator::Disabled
        }
    };

    let state = AppState {
        db,
        clock,
        payments: Arc::new(StripeClient::new(&config.stripe)),
        config: config.clone(),
    };

    info!("listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .configure(configure(state.clone(), authenticator.clone()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
