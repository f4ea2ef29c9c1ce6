use std::{env, sync::Arc};

use colored::Colorize;
use log::{error, info, warn};
use playslot_collab::{
    Collab, DatabaseError, HttpIdentityProvider, IdentityProvider, MemoryDatabase, PgDatabase,
    SharedDatabase,
};
use playslot_server::{run_server, ServerContext};
use thiserror::Error;

mod logging;

/// Used when no identity endpoint is configured. External logins will
/// fail against it, which is the intended dev-mode behavior.
const FALLBACK_IDENTITY_URL: &str = "http://localhost:9051/session-data";

#[derive(Debug, Error)]
enum SetupError {
    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),
}

impl SetupError {
    fn hint(&self) -> String {
        match self {
            SetupError::Database(_) => {
                "This is a database error. Make sure PLAYSLOT_DATABASE_URL points at a running Postgres instance, then try again.".to_string()
            }
        }
    }
}

async fn setup() -> Result<ServerContext, SetupError> {
    let database: SharedDatabase = match env::var("PLAYSLOT_DATABASE_URL") {
        Ok(url) => {
            info!("Connecting to database...");
            Arc::new(PgDatabase::new(&url).await?)
        }
        Err(_) => {
            warn!("PLAYSLOT_DATABASE_URL is not set, all data is kept in memory");
            Arc::new(MemoryDatabase::new())
        }
    };

    let identity_url = env::var("PLAYSLOT_IDENTITY_URL").unwrap_or_else(|_| {
        warn!("PLAYSLOT_IDENTITY_URL is not set, external logins will not work");
        FALLBACK_IDENTITY_URL.to_string()
    });

    let provider: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::new(&identity_url));

    let collab = Arc::new(Collab::new(database, provider));

    Ok(ServerContext { collab })
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    match setup().await {
        Ok(context) => {
            info!("Initialized successfully.");
            run_server(context).await;
        }
        Err(error) => {
            error!(
                "{} Read the error below to troubleshoot the issue.",
                "Playslot failed to start!".bold().red()
            );
            error!("{}", error);
            error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
        }
    }
}
