//! # diagscope - Main Entry Point
//!
//! Opens one bus back-end (`--simulate` or `--replay <FILE>`), loads the
//! active signal set, and hands the terminal to the dashboard until the
//! operator quits.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use std::fs::File;
use std::time::Duration;

use diagscope::catalog::Catalog;
use diagscope::cli::Args;
use diagscope::domain::{TransportError, TuiError};
use diagscope::session::{Session, SessionConfig};
use diagscope::store::ActiveSetStore;
use diagscope::transport::{replay, sim, BusHandle};
use diagscope::tui;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_IOERR: i32 = 74;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    std::process::exit(match run(&args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<TuiError>().is_some() {
        return EXIT_IOERR;
    }
    match err.downcast_ref::<TransportError>() {
        Some(TransportError::Io(_)) => EXIT_IOERR,
        _ => EXIT_ERROR,
    }
}

/// Logs go to `--log-file` or nowhere: the dashboard owns the terminal, so
/// `RUST_LOG` only refines the filter once a file is given.
fn log_builder(args: &Args) -> Result<env_logger::Builder> {
    let mut builder = env_logger::Builder::new();
    let Some(path) = &args.log_file else {
        builder.filter_level(LevelFilter::Off);
        return Ok(builder);
    };

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    builder
        .filter_level(level)
        .parse_env("RUST_LOG")
        .target(env_logger::Target::Pipe(Box::new(file)));
    Ok(builder)
}

fn init_logging(args: &Args) -> Result<()> {
    log_builder(args)?.try_init().context("Failed to initialise logging")
}

fn open_bus(args: &Args, catalog: &Catalog) -> Result<BusHandle> {
    let bus = match &args.replay {
        Some(path) => replay::spawn(path)
            .with_context(|| format!("Failed to open replay log {}", path.display()))?,
        None => sim::spawn(catalog).context("Failed to start simulated ECU")?,
    };
    info!("Bus back-end: {}", bus.name());
    Ok(bus)
}

fn run(args: &Args) -> Result<()> {
    init_logging(args)?;
    info!("diagscope v{} starting", env!("CARGO_PKG_VERSION"));

    let catalog = Catalog::standard();
    let bus = open_bus(args, &catalog)?;
    let bus_name = bus.name();

    let config = SessionConfig {
        poll_interval: Duration::from_millis(args.poll_ms),
        keepalive_node: args.keepalive_node,
        start_session: !args.no_session,
    };
    let store = ActiveSetStore::new(&args.state_file);
    let mut session = Session::new(catalog, store, bus, config);
    info!(
        "Loaded {} active signal(s) from {}",
        session.active().len(),
        session.store().path().display()
    );
    session.start().context("Failed to request diagnostic session")?;

    let result = tui::run(&mut session, Duration::from_millis(args.tick_ms), bus_name);

    let stats = session.stats();
    let passes = session.passes();
    session.into_transport().shutdown();
    result?;

    info!(
        "Exit after {passes} polling pass(es): {} frame(s), {} decoded, {} unmatched, {} malformed",
        stats.frames, stats.updated, stats.unmatched, stats.malformed
    );
    Ok(())
}
