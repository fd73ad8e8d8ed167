use std::{path::Path, time::Duration};

use anyhow::{Result, anyhow};
use movies_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::{debug, info};
use url::Url;

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

/// Keeps temporary data directory alive for the duration of test
pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://127.0.0.1:{}", port);
    let args = &[
        "movies-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    let (args, guard) = test_config(test_name, &base_dir)?;
    // creates database and schema, so tests can seed data before server starts
    movies_server::run::build_state(&args).await?;
    Ok((args, guard))
}

/// Stops server when dropped
pub struct ServerGuard {
    #[allow(dead_code)]
    shutdown: oneshot::Sender<()>,
}

pub async fn launch_env(args: ServerConfig) -> Result<(reqwest::Client, ServerGuard)> {
    let base_url = args.base_url.clone();
    let (shutdown, shutdown_receiver) = oneshot::channel::<()>();
    let state = movies_server::run::build_state(&args).await?;
    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_receiver.await;
        };
        if let Err(e) = movies_server::run::run_graceful_with_state(args, state, shutdown_signal).await
        {
            tracing::error!("Server error: {e}");
        }
    });

    let client = reqwest::Client::new();
    wait_for_server(&client, &base_url).await?;
    Ok((client, ServerGuard { shutdown }))
}

async fn wait_for_server(client: &reqwest::Client, base_url: &Url) -> Result<()> {
    let health_url = base_url.join("health")?;
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Server is up at {base_url}");
                return Ok(());
            }
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start at {base_url}"))
}

pub fn extend_url(url: &Url, segment: impl ToString) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("base URL")
        .push(&segment.to_string());
    url
}
