mod catalog;
mod config;
mod error;
mod generator;
mod genre;
mod history;
mod intent;
mod model;
mod reply;
mod search;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog::Catalog;
use config::Config;
use generator::OpenAiGenerator;
use history::ChatHistoryStore;
use mcp_common::openai::{OpenAiClient, OpenAiClientConfig};
use mcp_common::redis::RedisCache;
use reply::ReplyComposer;
use server::PodcastRecommenderServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries MCP JSON-RPC in stdio mode
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting podcast-recommender MCP server");

    let config = Config::from_env()?;
    info!(
        model = %config.model,
        generation_timeout_ms = config.generation_timeout.as_millis(),
        stream = config.stream_completions,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    };
    info!(
        entries = catalog.len(),
        genres = catalog.genres().len(),
        "catalog ready"
    );
    let catalog = Arc::new(catalog);

    let openai_config = OpenAiClientConfig::from_env();
    info!(
        base_url = %openai_config.base_url,
        timeout_ms = openai_config.default_timeout.as_millis(),
        max_retries = openai_config.max_retries,
        api_key = openai_config.api_key.is_some(),
        "openai client configured"
    );
    let openai = Arc::new(OpenAiClient::new(openai_config)?);
    let generator = OpenAiGenerator::new(openai, config.model.clone(), config.stream_completions);
    let composer = Arc::new(ReplyComposer::new(
        Arc::clone(&catalog),
        generator,
        config.generation_timeout,
    ));

    // Chat history is optional; without Redis turns are answered but not saved
    let redis_cache = RedisCache::new(config.redis_url.as_deref());
    match redis_cache.ping().await {
        Ok(()) => info!("redis connected, chat history enabled"),
        Err(e) => info!(reason = %e, "redis unavailable, chat history disabled"),
    }
    let history = Arc::new(ChatHistoryStore::new(redis_cache));

    let server = PodcastRecommenderServer::new(catalog, composer, history);

    if let Some(addr) = &config.http_listen_addr {
        let service = StreamableHttpService::new(
            move || Ok(server.clone()),
            LocalSessionManager::default().into(),
            Default::default(),
        );
        let router = axum::Router::new().nest_service("/mcp", service);
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving streamable HTTP on /mcp");
        axum::serve(listener, router).await?;
    } else if let Some(addr) = &config.tcp_listen_addr {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
