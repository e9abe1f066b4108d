use log::info;
use serenity_catalog_api::{
    app::{search_index, Application},
    config::Config,
    db::PgStore,
    error::{ApiError, Result},
    scripts::rebuild_index,
    services::FullTextSearch,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenv::dotenv().ok();

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Default to info level if RUST_LOG is not set
                "serenity_catalog_api=info,actix_web=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loading configuration...");
    let config = Config::load()?;

    match std::env::args().nth(1).as_deref() {
        None | Some("serve") => Application::new(&config).run().await,
        Some("rebuild-index") => {
            let store = PgStore::connect(&config.database_url).await?;
            let full_text = FullTextSearch::new(search_index(&config).await?);
            let stats = rebuild_index(&store, &full_text).await?;
            info!(
                "Rebuilt search index: {} books, {} failed batches",
                stats.books, stats.failed_batches
            );
            Ok(())
        }
        Some(other) => Err(ApiError::InvalidInput(format!(
            "Unknown command '{}', expected 'serve' or 'rebuild-index'",
            other
        ))),
    }
}
