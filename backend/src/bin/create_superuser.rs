//! Create a staff account with full rights
//!
//! Usage: machirepo-createsuperuser <username> <email> <password>

use anyhow::{bail, Context};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use machirepo_backend::services::AuthService;
use machirepo_backend::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "machirepo_backend=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [username, email, password] = args.as_slice() else {
        bail!("usage: machirepo-createsuperuser <username> <email> <password>");
    };

    dotenvy::dotenv().ok();
    let config = Config::load().context("loading configuration")?;

    let db = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database.url)
        .await
        .context("connecting to database")?;

    let user = AuthService::new(db, &config)
        .create_superuser(username, email, password)
        .await
        .context("creating superuser")?;

    println!("Superuser \"{}\" created ({})", user.username, user.id);
    Ok(())
}
