//! One-shot seed loader. Idempotent: every entity is keyed on a
//! natural identifier, so re-running changes nothing.

use tracing_subscriber::EnvFilter;

use pharmacy_dispatch::config::Config;
use pharmacy_dispatch::db::Database;
use pharmacy_dispatch::error::AppError;
use pharmacy_dispatch::seed;
use pharmacy_dispatch::state::AppState;

fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let database = Database::open(&config.database_path)?;
    let state = AppState::new(database);

    seed::run(&state)?;

    Ok(())
}
