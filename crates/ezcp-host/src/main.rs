//! ezcp host — entry point.
//!
//! Shares one text blob with every browser on the local network.  Devices
//! open `http://<host>:<port>/` to read and edit the text live; scripts can
//! `GET`/`POST` `http://<host>:<port+1>/data`.
//!
//! # Usage
//!
//! ```text
//! ezcp-host [OPTIONS]
//!
//! Options:
//!   --config <FILE>            TOML config file
//!   --port <PORT>              Web server port; API uses PORT+1 [default: 8080]
//!   --bind <IP>                Interface to bind [default: 0.0.0.0]
//!   --data-dir <DIR>           Web root holding data.json [default: ezcp-web]
//!   --broadcast-interval-ms <MS>
//!   --heartbeat-interval-secs <SECS>
//!   --persist-debounce-ms <MS>
//!   --log-level <FILTER>
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                        | Flag                        |
//! |---------------------------------|-----------------------------|
//! | `EZCP_CONFIG`                   | `--config`                  |
//! | `EZCP_PORT`                     | `--port`                    |
//! | `EZCP_BIND`                     | `--bind`                    |
//! | `EZCP_DATA_DIR`                 | `--data-dir`                |
//! | `EZCP_BROADCAST_INTERVAL_MS`    | `--broadcast-interval-ms`   |
//! | `EZCP_HEARTBEAT_INTERVAL_SECS`  | `--heartbeat-interval-secs` |
//! | `EZCP_PERSIST_DEBOUNCE_MS`      | `--persist-debounce-ms`     |
//! | `EZCP_LOG_LEVEL`                | `--log-level`               |
//!
//! Flags and variables override the config file, which overrides the
//! built-in defaults.  `RUST_LOG`, when set, overrides the log level.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ezcp_host::application::MemorySnapshotStore;
use ezcp_host::domain::{FileConfig, HostConfig, RemoteTextSink, SnapshotSource, StaticAssets};
use ezcp_host::infrastructure::{
    start_api_server, start_web_server, DebouncedPersister, HostTextSink, ServerHandle, WebRoot,
    WebServerOptions,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// LAN shared-text host.
///
/// Every option is optional; unset options fall back to the config file and
/// then to the built-in defaults.
#[derive(Debug, Default, Parser)]
#[command(
    name = "ezcp-host",
    about = "Share one live text blob with every browser on your network",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "EZCP_CONFIG")]
    config: Option<PathBuf>,

    /// Web server port.  The JSON API server listens on the next port.
    #[arg(long, env = "EZCP_PORT")]
    port: Option<u16>,

    /// IP address both servers bind to.
    ///
    /// `0.0.0.0` accepts LAN connections; `127.0.0.1` keeps the host private.
    #[arg(long, env = "EZCP_BIND")]
    bind: Option<IpAddr>,

    /// Directory holding `data.json` and the exported page.
    #[arg(long, env = "EZCP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// How often SSE clients are checked for a new snapshot, in milliseconds.
    #[arg(long, env = "EZCP_BROADCAST_INTERVAL_MS")]
    broadcast_interval_ms: Option<u64>,

    /// Seconds between SSE heartbeat comments.
    #[arg(long, env = "EZCP_HEARTBEAT_INTERVAL_SECS")]
    heartbeat_interval_secs: Option<u64>,

    /// Quiet period before `data.json` is rewritten, in milliseconds.
    #[arg(long, env = "EZCP_PERSIST_DEBOUNCE_MS")]
    persist_debounce_ms: Option<u64>,

    /// Log filter used when `RUST_LOG` is unset (e.g. `info`, `debug`).
    #[arg(long, env = "EZCP_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Layers defaults, the config file, and these arguments into a
    /// validated [`HostConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the result
    /// fails validation.
    fn into_host_config(self) -> anyhow::Result<HostConfig> {
        let mut config = HostConfig::default();
        if let Some(path) = &self.config {
            let file = FileConfig::load(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?;
            config.apply_file(file)?;
        }

        if let Some(port) = self.port {
            config.base_port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(ms) = self.broadcast_interval_ms {
            config.broadcast_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.heartbeat_interval_secs {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = self.persist_debounce_ms {
            config.persist_debounce = Duration::from_millis(ms);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_host_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "ezcp host starting — web={}, api={}, data_dir={}",
        config.web_addr(),
        config.api_addr()?,
        config.data_dir.display()
    );

    // ── State and persistence ─────────────────────────────────────────────────
    let assets = StaticAssets::bundled();
    let web_root = WebRoot::new(&config.data_dir);
    let initial = web_root
        .prepare(&assets)
        .with_context(|| format!("failed to prepare web root {}", web_root.dir().display()))?;

    let store = Arc::new(MemorySnapshotStore::new(initial));
    let source: Arc<dyn SnapshotSource> = store.clone();
    let (persister, persist_task) =
        DebouncedPersister::spawn(web_root.data_file(), Arc::clone(&source), config.persist_debounce);
    let sink: Arc<dyn RemoteTextSink> =
        Arc::new(HostTextSink::new(Arc::clone(&store), persister.clone()));

    // ── Servers ───────────────────────────────────────────────────────────────
    //
    // Each server starts independently; one failing to bind leaves the other
    // running.
    let web = start_web_server(
        WebServerOptions {
            addr: config.web_addr(),
            broadcast_interval: config.broadcast_interval,
            heartbeat_interval: config.heartbeat_interval,
            assets,
        },
        Arc::clone(&source),
    )
    .await
    .map_err(|e| error!("web server failed to start: {e}"))
    .ok();
    let api = start_api_server(config.api_addr()?, Arc::clone(&source), sink)
        .await
        .map_err(|e| error!("API server failed to start: {e}"))
        .ok();

    if web.is_none() && api.is_none() {
        anyhow::bail!("neither server could be started");
    }
    if let Some(web) = &web {
        log_lan_urls(web, "open in a browser");
    }
    if let Some(api) = &api {
        log_lan_urls(api, "POST/GET /data");
    }

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C — shutting down"),
        Err(e) => error!("failed to listen for Ctrl+C: {e}"),
    }

    for server in [web, api].into_iter().flatten() {
        server.stop().await;
    }
    persister.flush().await;
    drop(persister);
    if let Err(e) = persist_task.await {
        warn!("persistence task ended abnormally: {e}");
    }

    info!("ezcp host stopped");
    Ok(())
}

/// Logs how other devices reach `server`.
fn log_lan_urls(server: &ServerHandle, hint: &str) {
    let addr = server.local_addr();
    if addr.ip().is_unspecified() {
        info!(
            "{} server: http://<this-machine-ip>:{}/ ({hint})",
            server.name(),
            addr.port()
        );
    } else {
        info!("{} server: http://{addr}/ ({hint})", server.name());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
