use dkg_cli::{
    actions::{config, inspect, keygen},
    opts::{Command, DkgOpts},
};

use gumdrop::Options;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let opts = DkgOpts::parse_args_default_or_exit();

    let command = opts.command.unwrap_or_else(|| {
        eprintln!("No command was provided.");
        eprintln!("{}", DkgOpts::usage());
        process::exit(2)
    });

    // stdout carries the command's output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match command {
        Command::Keygen(opts) => keygen(opts, &mut rand::thread_rng()),
        Command::Inspect(opts) => inspect(opts),
        Command::Config(opts) => config(opts),
    }
}
