use anyhow::{Context, Result};
use book_finder_api::{app::CatalogApplication, config::Config};
use log::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_server=info,book_finder_api=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load configuration")?;
    info!("📖 Serving catalog from {}", config.catalog_source);

    CatalogApplication::new(&config)
        .run()
        .await
        .context("catalog service failed")
}
