use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use tracert::cli::Args;
use tracert::config::{Config, LOG_ENV};
use tracert::enrich::WhoisClient;
use tracert::error::Error;
use tracert::interrupt::Interrupt;
use tracert::probe::RawSocketProber;
use tracert::report::Report;
use tracert::resolve::resolve_destination;
use tracert::trace::Trace;

fn main() -> ExitCode {
    configure_logging();
    if std::env::args_os().len() < 2 {
        if let Err(err) = Args::command().print_help() {
            eprintln!("Error: {err}");
        }
        return ExitCode::SUCCESS;
    }
    let args = Args::parse();
    match run(&Config::from(&args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

fn run(config: &Config) -> Result<()> {
    let interrupt = Interrupt::install().context("Failed to install ctrl-c handler")?;
    let destination = resolve_destination(&config.destination)?;
    let mut report = Report::new(io::stdout().lock());
    report
        .start(&config.destination, destination, config.max_hops)
        .context("Failed to write to stdout")?;
    let prober = RawSocketProber::new(config, interrupt.clone());
    let enricher = WhoisClient::new(config).with_interrupt(interrupt.clone());
    let trace =
        Trace::new(prober, enricher, destination, config.max_hops).with_interrupt(interrupt);
    for hop in trace {
        report.hop(&hop?).context("Failed to write to stdout")?;
    }
    Ok(())
}

/// Print a fatal error as a single line and pick the exit status.
fn report_error(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(fatal) if fatal.exit_code() == 0 => {
            println!("{}", fatal.user_message());
            ExitCode::SUCCESS
        }
        Some(fatal) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(fatal.exit_code())
        }
        None => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn configure_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();
}
