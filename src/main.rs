use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pte_practice::config::Settings;
use pte_practice::db::{self, LogOnError};
use pte_practice::handlers;
use pte_practice::paths;
use pte_practice::state::AppState;

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pte_practice=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let settings = Settings::load();
  tracing::info!(
    "Data directory: {} (production: {})",
    settings.data_dir.display(),
    settings.production
  );

  let pool = db::init_db(&paths::db_path(&settings.data_dir)).expect("Failed to initialize database");

  {
    let conn = db::try_lock(&pool).expect("Database lock failed during startup");
    let seed = paths::questions_seed_path(&settings.data_dir);
    db::seed_questions_from_file(&conn, &seed).log_warn("Failed to seed questions");
  }

  for dir in [paths::audio_dir(&settings.data_dir), paths::recordings_dir(&settings.data_dir)] {
    std::fs::create_dir_all(&dir).log_warn(&format!("Could not create {}", dir.display()));
  }

  let bind_addr = settings.bind_addr();
  let port = settings.port;
  let state = AppState::new(pool, settings).expect("Failed to build HTTP client");
  let app = handlers::router(state);

  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", port);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
