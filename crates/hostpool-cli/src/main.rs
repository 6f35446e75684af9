//! Hostpool CLI - adaptive load balancing with Thompson sampling

mod backend;
mod run;
mod simulated;
mod transport;

#[cfg(test)]
mod main_tests;

use std::time::Duration;

use clap::{Parser, Subcommand};
use hostpool_core::config::Config;
use hostpool_core::routing::{HostRouter, HostRouterBuilder, RouterConfig, Transport};
use tracing::info;

use crate::run::{RunSummary, drive, render_text};
use crate::simulated::{BackendSpec, SimulatedTransport};
use crate::transport::{HttpRequest, HttpTransport};

#[derive(Parser)]
#[command(name = "hostpool")]
#[command(author, version, about = "Adaptive load balancer with Thompson sampling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Debug, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start local backends with staged latencies and route traffic to them
    Demo {
        /// Number of requests to route
        #[arg(short, long)]
        requests: Option<usize>,
        /// Number of local backends
        #[arg(short, long)]
        backends: Option<usize>,
        /// First backend port (0 picks free ports)
        #[arg(long)]
        base_port: Option<u16>,
        /// Extra latency added per backend, in milliseconds
        #[arg(long)]
        latency_step_ms: Option<u64>,
        /// Requests in flight at once
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Seed for host selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Route traffic to in-process simulated backends
    Simulate {
        /// Backend as NAME:LATENCY_MS[:FAILURE_RATE] (repeatable)
        #[arg(short, long = "backend", required = true)]
        backends: Vec<BackendSpec>,
        /// Number of requests to route
        #[arg(short, long, default_value_t = 1000)]
        requests: usize,
        /// Requests in flight at once
        #[arg(short, long, default_value_t = 1)]
        concurrency: usize,
        /// Seed for host selection and failure draws
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Route HTTP requests to a set of hosts
    Route {
        /// Comma-separated hosts (defaults to pool.hosts)
        #[arg(long, value_delimiter = ',')]
        hosts: Vec<String>,
        /// Request path
        #[arg(short, long, default_value = "/")]
        path: String,
        /// Number of requests to route
        #[arg(short, long, default_value_t = 1)]
        requests: usize,
        /// Requests in flight at once
        #[arg(short, long, default_value_t = 1)]
        concurrency: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so reports on stdout stay machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hostpool=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            requests,
            backends,
            base_port,
            latency_step_ms,
            concurrency,
            seed,
        } => {
            let mut config = Config::load()?;
            let demo = &mut config.demo;
            demo.requests = requests.unwrap_or(demo.requests);
            demo.backends = backends.unwrap_or(demo.backends);
            demo.base_port = base_port.unwrap_or(demo.base_port);
            demo.latency_step_ms = latency_step_ms.unwrap_or(demo.latency_step_ms);
            demo.concurrency = concurrency.unwrap_or(demo.concurrency);
            config.pool.seed = seed.or(config.pool.seed);
            cmd_demo(&config, cli.format, cli.quiet).await
        }

        Commands::Simulate {
            backends,
            requests,
            concurrency,
            seed,
        } => cmd_simulate(&backends, requests, concurrency, seed, cli.format, cli.quiet).await,

        Commands::Route {
            hosts,
            path,
            requests,
            concurrency,
        } => cmd_route(hosts, &path, requests, concurrency, cli.format, cli.quiet).await,

        Commands::Config { action } => cmd_config(action, cli.quiet),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_demo(config: &Config, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let demo = &config.demo;
    if demo.backends == 0 {
        anyhow::bail!("demo needs at least one backend");
    }

    let backends = backend::spawn_backends(
        demo.backends,
        demo.base_port,
        Duration::from_millis(demo.latency_step_ms),
    )
    .await?;
    let hosts: Vec<String> = backends.iter().map(|b| b.host()).collect();

    if !quiet && format == OutputFormat::Text {
        for b in &backends {
            println!("Starting server on {} ({} ms)", b.addr, b.latency.as_millis());
        }
    }

    // Give the servers time to start
    tokio::time::sleep(Duration::from_millis(demo.startup_wait_ms)).await;

    let transport = HttpTransport::from_config(&config.http)?;
    let router = build_router(hosts, transport, config, config.pool.seed)?;

    let summary = drive(&router, demo.requests, demo.concurrency, |_| HttpRequest::get("/")).await;
    print_summary(&summary, format, quiet)
}

async fn cmd_simulate(
    specs: &[BackendSpec],
    requests: usize,
    concurrency: usize,
    seed: Option<u64>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let hosts: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
    let transport = SimulatedTransport::new(specs, seed);
    let router = build_router(hosts, transport, &config, seed.or(config.pool.seed))?;

    let summary = drive(&router, requests, concurrency, |i| i).await;
    print_summary(&summary, format, quiet)
}

async fn cmd_route(
    hosts: Vec<String>,
    path: &str,
    requests: usize,
    concurrency: usize,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let hosts = if hosts.is_empty() {
        config.pool.hosts.clone()
    } else {
        hosts
    };

    let transport = HttpTransport::from_config(&config.http)?;
    let router = build_router(hosts, transport, &config, config.pool.seed)?;

    let summary = drive(&router, requests, concurrency, |_| HttpRequest::get(path)).await;
    print_summary(&summary, format, quiet)
}

fn build_router<T: Transport>(
    hosts: Vec<String>,
    transport: T,
    config: &Config,
    seed: Option<u64>,
) -> anyhow::Result<HostRouter<T>> {
    let mut builder: HostRouterBuilder<T> = HostRouter::builder()
        .hosts(hosts)
        .transport(transport)
        .config(RouterConfig::from_config(config));
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }

    let router = builder.build()?;
    info!(hosts = router.hosts().len(), "Router ready");
    Ok(router)
}

fn print_summary(summary: &RunSummary, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Text if !quiet => print!("{}", render_text(summary)),
        OutputFormat::Text => {}
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
