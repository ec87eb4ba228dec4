// apps/hospital_app/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use hospital_app::config::{AppConfig, LogFormat};
use hospital_app::services::mailer::LogMailer;
use hospital_app::store::{ClinicStore, MemoryStore, PgStore};
use hospital_app::{build_app_state, seed, web};

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  // Read .env before the subscriber so LOG_FORMAT and RUST_LOG apply to startup logs.
  dotenvy::dotenv().ok();
  init_tracing(LogFormat::parse(&std::env::var("LOG_FORMAT").unwrap_or_default()));

  tracing::info!("Starting hospital service...");

  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;

  let store: Arc<dyn ClinicStore> = match app_config.database_url.as_deref() {
    Some(url) => {
      let pg = PgStore::connect(url).await.context("Failed to connect to the database")?;
      pg.migrate().await.context("Failed to apply the database schema")?;
      Arc::new(pg)
    }
    None => {
      tracing::warn!("DATABASE_URL not set; running on the in-memory store. Data is lost on exit.");
      Arc::new(MemoryStore::new())
    }
  };

  if app_config.seed_db {
    seed::seed_demo_data(store.as_ref()).await.context("Failed to seed demo data")?;
  }

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = build_app_state(app_config, store, Arc::new(LogMailer)).context("Failed to build application state")?;
  tracing::info!("Pipelines registered.");

  tracing::info!("Attempting to bind server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  Ok(())
}
