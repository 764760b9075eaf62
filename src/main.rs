use clap::Parser;
use owo_colors::OwoColorize;

use picksync::app::{App, Session};
use picksync::capability::Capabilities;
use picksync::cli::Cli;
use picksync::config::Config;
use picksync::error::{AppError, EXIT_MISSING_CAPABILITY, exit_code_for};
use picksync::logging;
use picksync::tui::TerminalPresenter;
use picksync::util::{print_run_table, try_enable_ansi_on_windows};

fn main() {
    let _cli = Cli::parse();
    try_enable_ansi_on_windows();

    let Some(home) = dirs::home_dir() else {
        eprintln!("{} cannot determine the home directory", "✗".red());
        std::process::exit(EXIT_MISSING_CAPABILITY);
    };
    // held until exit so buffered log lines are flushed
    let log_guard = match logging::init_file_logging(&Config::app_dir(&home)) {
        Ok((guard, path)) => {
            tracing::info!("picksync {} starting, log at {}", env!("CARGO_PKG_VERSION"), path.display());
            Some(guard)
        }
        Err(e) => {
            eprintln!("⚠️ file logging disabled: {:#}", e);
            None
        }
    };

    let config = match Config::init(&home) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("⚠️ cannot prepare {}: {:#}, using defaults", Config::app_dir(&home).display(), e);
            Config::default()
        }
    };

    let caps = match Capabilities::probe(&config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{} {}", "✗".red(), e);
            drop(log_guard);
            std::process::exit(e.exit_code());
        }
    };

    let mut app = App::init(home, config, caps);
    let outcome = match TerminalPresenter::start() {
        Ok(mut presenter) => {
            let outcome = app.run(&mut presenter);
            if let Err(e) = presenter.close() {
                tracing::warn!("terminal restore failed: {:#}", e);
            }
            outcome
        }
        Err(e) => Err(e.context("cannot initialise the terminal")),
    };

    let code = match outcome {
        Ok(session) => {
            match &session {
                Session::Finished(result) => {
                    if let Err(e) = print_run_table(result) {
                        tracing::warn!("cannot print summary table: {:#}", e);
                    }
                }
                Session::Exited => println!("Nothing was backed up."),
            }
            session.exit_code()
        }
        Err(e) => {
            if matches!(e.downcast_ref::<AppError>(), Some(AppError::UserCancelled)) {
                tracing::info!("cancelled by user");
                println!("{}", "Cancelled.".yellow());
            } else {
                tracing::error!("{:#}", e);
                eprintln!("{} {:#}", "✗".red(), e);
            }
            exit_code_for(&e)
        }
    };
    tracing::info!("exit code {}", code);
    drop(log_guard);
    std::process::exit(code);
}
