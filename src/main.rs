use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod aggregate;
mod cli;
mod controller;
mod domain;
mod inputter;
mod model;
mod record;
mod source;
mod state;
mod table;
mod ui;

use cli::Args;
use controller::Controller;
use domain::{DashConfig, DashError};
use model::{Model, Status};
use ui::DashboardUI;

fn main() -> ExitCode {
    let args = Args::parse();

    let setup = args
        .log_path()
        .and_then(|path| init_logging(&path))
        .and_then(|_| args.dash_config());
    let cfg = match setup {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&cfg);
    ratatui::restore();
    match result {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(path: &Path) -> Result<(), DashError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(cfg: &DashConfig) -> Result<(), DashError> {
    info!("Starting userdash with {cfg:?}");

    let mut model = Model::init(cfg);
    model.request_load();

    let mut ui = DashboardUI::new();
    let controller = Controller::new(cfg);
    let mut terminal = ratatui::init();

    while model.status != Status::Quitting {
        // Pick up a finished fetch
        model.poll_loader()?;

        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Bye");
    Ok(())
}
