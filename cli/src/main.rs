mod http;
mod terminal;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use probr_common::config::Config;
use probr_common::network::target::Target;
use probr_common::{info, success};
use probr_core::invoker::NmapInvoker;
use probr_core::scheduler::Scheduler;

#[derive(Parser)]
#[command(name = "probr")]
#[command(about = "Scans network targets with nmap and serves the results as Prometheus metrics.")]
struct CommandLine {
    /// Targets to scan: IP, CIDR or hostname, with an optional :ports suffix
    #[arg(
        long = "target",
        env = "NMAP_COLLECTOR_TARGETS",
        value_delimiter = ' ',
        required = true
    )]
    targets: Vec<Target>,

    /// Seconds between scan ticks
    #[arg(long, env = "NMAP_COLLECTOR_INTERVAL", default_value_t = 30)]
    interval: u64,

    /// Hard deadline in seconds for one scanner run
    #[arg(long = "scan-timeout", env = "NMAP_COLLECTOR_TIMEOUT", default_value_t = 300)]
    scan_timeout: u64,

    /// Port the metrics endpoint listens on
    #[arg(long, env = "NMAP_COLLECTOR_PORT", default_value_t = 8000)]
    port: u16,

    /// Path of the nmap binary
    #[arg(long = "nmap-path", env = "NMAP_COLLECTOR_NMAP_PATH", default_value = "nmap")]
    nmap_path: String,

    /// Extra flags passed through to nmap
    #[arg(
        long = "scan-flags",
        env = "NMAP_COLLECTOR_SCAN_METHOD",
        value_delimiter = ' ',
        allow_hyphen_values = true,
        default_value = "-F"
    )]
    scan_flags: Vec<String>,

    /// Group label value stamped on every host and port metric
    #[arg(long, env = "NMAP_COLLECTOR_GROUP_NAME", default_value = "")]
    group: String,
}

impl CommandLine {
    fn into_config(self) -> Config {
        Config {
            targets: self.targets,
            interval: Duration::from_secs(self.interval),
            scan_timeout: Duration::from_secs(self.scan_timeout),
            listen_port: self.port,
            nmap_path: self.nmap_path,
            scan_flags: self.scan_flags,
            group: self.group,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = CommandLine::parse().into_config();

    terminal::logging::init_logging();
    cfg.validate().context("invalid configuration")?;

    // Fail fast if the scanner is unusable; a serving loop without one
    // would only ever report failures.
    let invoker = NmapInvoker::new(&cfg.nmap_path, cfg.scan_flags.clone());
    let version = invoker
        .verify_installation()
        .await
        .context("scanner unavailable")?;
    info!("using {version}");
    info!(
        "scanning {} target(s) every {:?}",
        cfg.targets.len(),
        cfg.interval
    );

    let scheduler = Arc::new(Scheduler::new(
        Arc::new(invoker),
        cfg.targets.clone(),
        cfg.scan_timeout,
    ));
    let scan_loop = scheduler.spawn(cfg.interval);

    let app = http::build_router(http::AppState {
        scheduler,
        group: cfg.group.clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;
    success!("serving metrics on http://{addr}/metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cancelling the scan loop drops any in-flight scanner child, which is
    // killed rather than leaked (kill_on_drop).
    scan_loop.abort();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}
