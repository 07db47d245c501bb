use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod contacts;
mod controller;
mod domain;
mod download;
mod forms;
mod inputter;
mod model;
mod notification;
mod stats;
mod table;
mod ui;

use controller::Controller;
use domain::{ContabConfig, ContabError, expand_path};
use model::{Model, Status};
use ui::TableUI;

/// A tui based contact import/export console.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Contact file (.csv or .xlsx) to import on start
    path: Option<String>,

    /// Directory exported files are written to
    #[arg(short, long, default_value = ".")]
    download_dir: String,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// How long notifications stay visible, in milliseconds
    #[arg(long, default_value_t = 5_000)]
    notification_ttl: u64,

    /// Statistics refresh interval, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    stats_interval: u64,

    /// Terminal event poll timeout, in milliseconds
    #[arg(long, default_value_t = 100)]
    event_poll_time: u64,

    /// Export this table (contacts, import-errors, stats) as CSV and exit
    #[arg(long, value_name = "ID")]
    export_table: Option<String>,

    /// File name for --export-table, defaults to export.csv
    #[arg(long, requires = "export_table")]
    filename: Option<String>,
}

impl Args {
    fn config(&self) -> Result<ContabConfig, ContabError> {
        Ok(ContabConfig::default()
            .download_dir(expand_path(&self.download_dir)?)
            .notification_ttl_ms(self.notification_ttl)
            .stats_interval_ms(self.stats_interval)
            .event_poll_time(self.event_poll_time))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(args: &Args) -> Result<(), ContabError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    // The terminal belongs to the TUI, so logs only go to stderr in headless mode.
    match &args.log_file {
        Some(path) => {
            let file = File::create(expand_path(path)?)?;
            registry
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .init();
        }
        None if args.export_table.is_some() => {
            registry.with(fmt::layer().with_writer(std::io::stderr)).init();
        }
        None => registry.init(),
    }
    Ok(())
}

fn run(args: Args) -> Result<(), ContabError> {
    let cfg = args.config()?;
    info!("Starting contab with {cfg:?}");

    if let Some(table_id) = &args.export_table {
        return run_headless(&args, &cfg, table_id);
    }

    let mut terminal = ratatui::init();
    let result = run_tui(&args, &cfg, &mut terminal);
    ratatui::restore();
    result
}

fn run_tui(args: &Args, cfg: &ContabConfig, terminal: &mut DefaultTerminal) -> Result<(), ContabError> {
    let size = terminal.size()?;
    let mut model = Model::init(cfg, size.width as usize, size.height as usize)?;
    if let Some(path) = &args.path {
        model.handle_import(path);
    }

    let mut ui = TableUI::default();
    let controller = Controller::new(cfg);
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }
    Ok(())
}

fn run_headless(args: &Args, cfg: &ContabConfig, table_id: &str) -> Result<(), ContabError> {
    let mut model = Model::init(cfg, 0, 0)?;
    if let Some(path) = &args.path {
        let report = model.import_file(expand_path(path)?)?;
        for e in &report.errors {
            eprintln!("{e}");
        }
    }
    if let Some(path) = model.export_table(table_id, args.filename.clone()) {
        println!("{}", path.display());
    }
    Ok(())
}
