use std::net::SocketAddr;
use std::sync::Arc;

use control_service::FaultRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,engagement=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "4000".into())
        .parse()?;
    let addr = SocketAddr::new(host.parse()?, port);

    let repo = Arc::new(datastore::InMemoryRepository::new());
    let app = server::build_app(repo, FaultRegistry::default());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}/api", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
