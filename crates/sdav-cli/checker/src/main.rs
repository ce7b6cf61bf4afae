use anyhow::{Context, Result};
use clap::Parser;
use sdav_core::config::ConfigStore;
use sdav_core::probe::ReadinessProber;
use sdav_core::settings::Settings;
use sdav_splunk::WebInterfaceProbe;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Blocks until the manager's web interface answers, exiting 1 if it never does.
#[derive(Parser, Debug)]
#[command(name = "sdav-check-manager")]
struct Args {
    /// Probe this URL instead of the configured manager
    #[arg(long)]
    url: Option<String>,
    /// Failed attempts tolerated before giving up
    #[arg(long)]
    max_retries: Option<u32>,
    /// Delay between attempts (e.g. "2s", "500ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,
    /// Settings file, defaults to ~/.sdav/config.toml
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<i32> {
    let settings = Settings::load(args.settings.as_deref())?;
    let target = resolve(&args, &settings)?;

    tracing::debug!(
        url = %target.url,
        max_retries = target.max_retries,
        interval = ?target.interval,
        "probing manager"
    );
    let probe = WebInterfaceProbe::new(target.url, settings.prober.attempt_timeout)?;
    let outcome = ReadinessProber::new("Manager", target.max_retries, target.interval).run(&probe);
    tracing::debug!(
        url = probe.url(),
        attempts = outcome.attempts,
        state = ?outcome.state,
        "probe finished"
    );

    Ok(outcome.exit_code())
}

/// What to probe and how often, after command line overrides.
#[derive(Debug, PartialEq, Eq)]
struct ProbeTarget {
    url: String,
    max_retries: u32,
    interval: Duration,
}

fn resolve(args: &Args, settings: &Settings) -> Result<ProbeTarget> {
    let url = match &args.url {
        Some(url) => url.clone(),
        None => manager_url(settings)?,
    };
    Ok(ProbeTarget {
        url,
        max_retries: args.max_retries.unwrap_or(settings.prober.max_retries),
        interval: args.interval.unwrap_or(settings.prober.interval),
    })
}

fn manager_url(settings: &Settings) -> Result<String> {
    let topology = ConfigStore::for_project(&settings.project_dir)
        .topology()
        .context("Failed to load topology")?;
    let ip = topology
        .group("manager")
        .and_then(|g| g.ips.first())
        .context("No manager ip configured")?;
    Ok(format!("http://{}:{}", ip, settings.prober.web_port))
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("sdav=debug,warn")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
