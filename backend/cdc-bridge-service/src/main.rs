use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use cdc_bridge_service::canal::CanalConnector;
use cdc_bridge_service::config::BridgeConfig;
use cdc_bridge_service::context::StreamContext;
use cdc_bridge_service::kafka::KafkaSinkFactory;
use cdc_bridge_service::metrics::serve_metrics;
use cdc_bridge_service::supervisor::{Supervisor, SupervisorSettings};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    let config = BridgeConfig::from_env().context("Failed to load configuration")?;

    init_tracing(config.debug);

    tracing::info!(
        canal = %config.canal.addr,
        brokers = %config.kafka.brokers,
        destinations = ?config.destinations,
        "Starting cdc-bridge-service"
    );

    // One independent stack per destination
    for stream in config.streams() {
        let ctx = Arc::new(StreamContext::new(
            stream.destination.clone(),
            stream.kafka.key_encoding,
        ));
        let supervisor = Supervisor::new(
            CanalConnector::new(stream.canal.clone(), stream.destination.clone()),
            KafkaSinkFactory::new(stream.kafka.clone(), stream.client_id.clone()),
            ctx,
            SupervisorSettings::from(&stream),
        );

        tokio::spawn(async move {
            tracing::info!(destination = %stream.destination, "Stream supervisor started");
            supervisor.run().await
        });
    }

    tracing::info!("Starting HTTP server on 0.0.0.0:{}", config.http_port);

    HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(serve_metrics))
    })
    .bind(("0.0.0.0", config.http_port))
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    tracing::info!("cdc-bridge-service stopped");
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "info,cdc_bridge_service=debug"
    } else {
        "info,cdc_bridge_service=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
