use std::sync::Arc;

use anyhow::Context as _;
use tracing::info;
use tracing_subscriber::EnvFilter;

use movie_catalog::cache::{CacheStore, ResponseCache, spawn_sweeper};
use movie_catalog::catalog::{self, Catalog, MovieStore};
use movie_catalog::config::Settings;
use movie_catalog::metadata::{MetadataLookup, TmdbClient, Unconfigured};
use movie_catalog::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("movie_catalog=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let metadata: Arc<dyn MetadataLookup> = match &settings.metadata {
        Some(m) => Arc::new(
            TmdbClient::new(&m.base_url, m.api_key.clone(), m.read_access_token.clone())
                .context("failed to build metadata client")?,
        ),
        None => {
            info!("API_URL not set, favorites are disabled");
            Arc::new(Unconfigured)
        }
    };

    let store = Arc::new(CacheStore::new(settings.cache_ttl));
    let sweeper = settings
        .cache_sweep
        .map(|interval| spawn_sweeper(Arc::clone(&store), interval));
    info!(ttl = ?settings.cache_ttl, sweep = ?settings.cache_sweep, "response cache ready");

    let catalog = Arc::new(Catalog::new(MovieStore::new(), metadata));
    let router = Arc::new(catalog::router(catalog, ResponseCache::new(store)));

    let addr = settings.bind_addr();
    let server = Server::bind(&addr).await?;
    info!("Server running on http://{}", server.local_addr());

    server
        .serve(router, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("server stopped");
    Ok(())
}
