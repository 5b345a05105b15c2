use std::net::SocketAddr;

use clap::Parser;
use std::sync::Arc;

use teamchess_room_server::config;
use teamchess_room_server::logging;
use teamchess_room_server::metrics::ServerMetrics;
use teamchess_room_server::room::RoomActor;
use teamchess_room_server::server::{AppState, ConnectionManager};
use teamchess_room_server::websocket;

/// Authoritative room server for a collaborative team chess game.
#[derive(Parser, Debug)]
#[command(name = "teamchess-room-server")]
#[command(about = "Authoritative room state machine for a collaborative team chess game")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config(&config);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", config.server.listen_port);
                println!("  Default clock: {}s", config.room.default_clock_seconds);
                println!("  Engine command: {}", config.engine.command);
                println!("  Batching enabled: {}", config.websocket.enable_batching);
                println!("  CORS origins: {}", config.cors_origins);
                return Ok(());
            }
            Err(err) => {
                eprintln!("Configuration validation failed:\n{err}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&config.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.listen_port));
    tracing::info!(%addr, "starting room server");

    let room = RoomActor::spawn(config.clone()).await;

    let state = AppState {
        room,
        connections: Arc::new(ConnectionManager::new()),
        metrics: Arc::new(ServerMetrics::new()),
        config: Arc::new(config),
    };

    let app = websocket::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "room server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn default_has_no_flags() {
        let cli = Cli::try_parse_from(["teamchess-room-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn validate_config_short_flag() {
        let cli = Cli::try_parse_from(["teamchess-room-server", "-c"]).unwrap();
        assert!(cli.validate_config);
    }

    #[test]
    fn validate_and_print_config_conflict() {
        let result =
            Cli::try_parse_from(["teamchess-room-server", "--validate-config", "--print-config"]);
        assert!(result.is_err());
    }
}
