use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signet_backend::{
    config::Config,
    db::connection::create_pool,
    store::{AuthStore, PgAuthStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "device_cleanup=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;
    let store = PgAuthStore::new(pool);

    let deleted = store
        .delete_expired_devices(Utc::now())
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    if deleted > 0 {
        tracing::info!("Deleted {} expired device records", deleted);
    }

    sqlx::query("VACUUM (ANALYZE) devices")
        .execute(store.pool())
        .await?;

    Ok(())
}
