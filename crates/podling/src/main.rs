use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use podling_http::{ApiServer, AppState, Config as HttpConfig};
use podling_runtime::{detect_hostname, Agent, AgentConfig, DockerRuntime};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "podling", about = "Podling worker agent")]
struct Cli {
    /// Identity hint for this worker. The master is authoritative and
    /// always assigns the real node id on registration; this flag exists
    /// for operators who want to pre-seed logs before registration
    /// completes and has no effect on the registered identity.
    #[arg(long)]
    node_id: Option<String>,

    /// Hostname reported on registration. Defaults to the detected host
    /// hostname, falling back to "localhost".
    #[arg(long)]
    hostname: Option<String>,

    /// Port this worker's inbound HTTP surface listens on.
    #[arg(long, default_value_t = 7070)]
    port: u16,

    /// Base URL of the master's API.
    #[arg(long)]
    master_url: String,

    /// Interval between heartbeats, e.g. "10s", "1m".
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    heartbeat_interval: Duration,

    /// Upper bound on graceful shutdown, e.g. "30s", "2m".
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    shutdown_timeout: Duration,

    /// Override the Docker Engine connection address (defaults to the
    /// standard Docker environment: DOCKER_HOST, unix socket fallback).
    #[arg(long)]
    docker_host: Option<String>,

    /// Increase log verbosity. Repeatable: -v for debug, -vv for trace.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Parse a duration given as a bare integer (seconds) or an integer
/// suffixed with `s`, `m`, or `h`.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let (num, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    };
    let n: u64 = num
        .parse()
        .map_err(|_| format!("invalid duration '{s}': expected a number optionally suffixed with s/m/h"))?;
    let secs = match unit {
        "" | "s" => n,
        "m" => n * 60,
        "h" => n * 3600,
        other => return Err(format!("invalid duration unit '{other}' in '{s}', expected s, m, or h")),
    };
    Ok(Duration::from_secs(secs))
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

/// Wait for either SIGINT (ctrl-c) or SIGTERM, returning which one fired.
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(hint) = &cli.node_id {
        info!(node_id_hint = %hint, "node id hint supplied; the master's registration response is authoritative");
    }

    let hostname = cli.hostname.clone().unwrap_or_else(detect_hostname);

    let config = AgentConfig {
        hostname,
        port: cli.port,
        master_url: cli.master_url.clone(),
        heartbeat_interval: cli.heartbeat_interval,
        shutdown_timeout: cli.shutdown_timeout,
    };

    let runtime = DockerRuntime::connect(cli.docker_host.as_deref())
        .map_err(|e| miette::miette!("failed to connect to the container runtime: {e}"))?;

    let agent = Arc::new(Agent::new(config, Arc::new(runtime)));

    agent
        .register()
        .await
        .map_err(|e| miette::miette!("failed to register with master at '{}': {e}", cli.master_url))?;

    let shutdown_timeout = agent.config().shutdown_timeout;

    let heartbeat_token = CancellationToken::new();
    let heartbeat_agent = Arc::clone(&agent);
    let heartbeat_token_child = heartbeat_token.clone();
    let heartbeat_handle = tokio::spawn(async move {
        heartbeat_agent.run_heartbeat_loop(heartbeat_token_child).await;
    });

    let http_token = CancellationToken::new();
    let http_state = AppState::new(Arc::clone(&agent));
    let http_config = HttpConfig {
        listen_addr: format!("0.0.0.0:{}", agent.config().port)
            .parse()
            .map_err(|e| miette::miette!("invalid listen port {}: {e}", agent.config().port))?,
    };
    let server = ApiServer::new(http_config, http_state);
    let server_token = http_token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run(server_token).await {
            error!(error = %e, "inbound HTTP server error");
        }
    });

    info!(node_id = ?agent.node_id().await, port = agent.config().port, "podling worker ready");

    let sig = shutdown_signal().await;
    info!(signal = sig, "received shutdown signal, draining workloads");

    heartbeat_token.cancel();
    http_token.cancel();

    if let Err(e) = heartbeat_handle.await {
        warn!(error = %e, "heartbeat task did not exit cleanly");
    }
    if let Err(e) = server_handle.await {
        warn!(error = %e, "HTTP server task did not exit cleanly");
    }

    agent.shutdown(shutdown_timeout).await;

    info!("shutdown complete");
    Ok(())
}
