use clap::{Parser, Subcommand, ValueEnum};
use sdav_core::settings::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod configure;
mod info;
mod manage;
mod spinner;

use manage::{Action, ServerGroup};

#[derive(Parser, Debug)]
#[command(name = "sdav")]
#[command(about = "Configure and manage a Splunk distributed architecture running on Vagrant")]
struct Args {
    /// Settings file, defaults to ~/.sdav/config.toml
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configure the base image (Vagrant box) used to create virtual machines.
    /// Box catalogue: https://app.vagrantup.com/boxes/search
    ConfigBaseImage {
        image: String,
    },
    /// Configure instances of production indexers
    ConfigPrIdxInstances {
        #[arg(value_parser = clap::value_parser!(u32).range(4..))]
        instances: u32,
    },
    /// Configure instances of production search heads
    ConfigPrShInstances {
        #[arg(value_parser = clap::value_parser!(u32).range(2..))]
        instances: u32,
    },
    /// Configure instances of forwarders
    ConfigFwdInstances {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        instances: u32,
    },
    /// Show information about the architecture
    Info {
        #[arg(value_enum, ignore_case = true)]
        about: InfoTopic,
        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Start, stop or destroy server groups: core_pr (manager, production
    /// indexers and search heads), core_de (development search head and
    /// indexer), fwd, hf, lb, or all of them
    Manage {
        #[arg(short, long, value_enum, ignore_case = true)]
        action: Action,
        #[arg(value_enum, ignore_case = true, required = true)]
        server_groups: Vec<ServerGroup>,
        /// Print the vagrant commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },
    /// Connect to a virtual machine (see `info vms` for names)
    Connect {
        vm: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum InfoTopic {
    /// Virtual machines: IP, name, type, environment, web interface and version
    Vms,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = match Settings::load(args.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Commands::ConfigBaseImage { image } => configure::handle_base_image(&settings, image),
        Commands::ConfigPrIdxInstances { instances } => {
            configure::handle_instances(&settings, "pr_idx", instances as usize)
        }
        Commands::ConfigPrShInstances { instances } => {
            configure::handle_instances(&settings, "pr_sh", instances as usize)
        }
        Commands::ConfigFwdInstances { instances } => {
            configure::handle_instances(&settings, "fwd", instances as usize)
        }
        Commands::Info { about, json } => match about {
            InfoTopic::Vms => info::handle_vms(&settings, json),
        },
        Commands::Manage { action, server_groups, dry_run } => {
            manage::handle_manage(
                &settings,
                args.settings.as_deref(),
                action,
                &server_groups,
                dry_run,
            )
        }
        Commands::Connect { vm } => manage::handle_connect(&settings, &vm),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("sdav=debug,warn")
        } else {
            EnvFilter::new("sdav=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
