// storefront/src/main.rs

use intellibazar::config::{AppConfig, LogFormat};
use intellibazar::services::{seed, MailLogNotifier, Notifier};
use intellibazar::state::AppState;
use intellibazar::store::{MemoryStore, PgStore, Store};
use intellibazar::web;

use actix_web::{web as actix_data, App, HttpServer};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter) // RUST_LOG overrides the default level
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
  tracing::error!(error = %err, "{}", context);
  std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // The subscriber format comes from the config, so a config error is
  // reported through a default subscriber.
  let config = match AppConfig::from_env() {
    Ok(config) => {
      init_tracing(config.log_format);
      config
    }
    Err(e) => {
      init_tracing(LogFormat::Pretty);
      return Err(startup_error("Failed to load configuration", e));
    }
  };
  tracing::info!(
    host = %config.server_host,
    port = config.server_port,
    database = config.database_url.is_some(),
    paypal = config.paypal.is_some(),
    "Starting IntelliBazar server..."
  );

  let store: Arc<dyn Store> = match &config.database_url {
    Some(url) => {
      let pg = PgStore::connect(url.expose_secret())
        .await
        .map_err(|e| startup_error("Failed to connect to the database", e))?;
      pg.migrate().await.map_err(|e| startup_error("Failed to run migrations", e))?;
      tracing::info!("Connected to Postgres; migrations applied.");
      Arc::new(pg)
    }
    None => {
      tracing::warn!("DATABASE_URL not set; using the in-memory store. Data is lost on restart.");
      Arc::new(MemoryStore::new())
    }
  };

  let notifier: Arc<dyn Notifier> = Arc::new(MailLogNotifier::new(config.mail_sender.clone()));
  let server_address = config.bind_address();
  let seed_db = config.seed_db;
  let app_state = AppState::new(config, store, notifier);

  if seed_db {
    seed::run(&app_state.config, &app_state.auth(), &app_state.coupons())
      .await
      .map_err(|e| startup_error("Seeding failed", e))?;
  }
  if app_state.paypal.is_none() {
    tracing::warn!("PayPal credentials not set; only card and cash on delivery are available.");
  }

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .app_data(web::json_config())
      .app_data(web::query_config())
      .app_data(web::path_config())
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
