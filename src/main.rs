//! Relay entry point: environment configuration, logging, store selection, serving.

// std
use std::sync::Arc;
// crates.io
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
// self
use mizu_relay::{
	config::ProxyConfig,
	flows::Relay,
	server,
	store::{CacheStore, FileStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// A missing .env file is fine; real environments export the variables directly.
	dotenvy::dotenv().ok();
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let config = ProxyConfig::from_env()?;

	if config.credentials.is_none() {
		tracing::warn!(
			"SC_CLIENT_ID/SC_CLIENT_SECRET are not set; every upstream call will be refused."
		);
	}

	let store: Arc<dyn CacheStore> = match &config.cache_path {
		Some(path) => Arc::new(FileStore::open(path)?),
		None => Arc::new(MemoryStore::default()),
	};
	let relay = Relay::new(store, &config)?;
	let listener = TcpListener::bind(config.bind_addr).await?;

	server::serve(listener, relay).await?;

	Ok(())
}
