mod config;
mod formatter;
mod proxy;
mod resolver;
mod routes;
mod segment;
mod source;

use config::Config;
use resolver::TranscriptResolver;
use routes::{build_router, AppState};
use source::{ClientPool, RelaySource, TranscriptSource, YoutubeSource};
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        log::error!("Transcript API stopped: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&filters)
        .init();
}

async fn run() -> Result<(), BoxError> {
    let config = Config::from_env()?;

    match &config.proxy {
        Some(proxy) if proxy.has_credentials() => {
            log::info!("Routing upstream requests through proxy {} (authenticated)", proxy)
        }
        Some(proxy) => log::info!("Routing upstream requests through proxy {}", proxy),
        None => log::info!("No proxy configured, connecting to upstream directly"),
    }

    let clients = ClientPool::new(config.proxy.as_ref(), config.connect_timeout)?;
    let source: Arc<dyn TranscriptSource> = match &config.relay_url {
        Some(url) => {
            log::info!("Relaying caption lookups to {}", url);
            Arc::new(RelaySource::new(url.clone(), clients))
        }
        None => Arc::new(YoutubeSource::new(clients)),
    };

    let state = AppState {
        resolver: Arc::new(TranscriptResolver::new(source, config.proxy.clone())),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    log::info!("Transcript API listening on {}", listener.local_addr()?);
    log::info!("Example: /transcript?video_id=dQw4w9WgXcQ&lang=ru");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Transcript API shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Ctrl-C received, shutting down");
}
