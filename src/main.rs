//! `provision` command-line entry point.
use clap::Parser;

use provision::cli::{self, Command};
use provision::{commands, logging};

fn main() {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let log_dir = logging::run_log_dir();
    let writes_logs = matches!(args.command, Command::Run(_));
    logging::init_subscriber(args.verbose, writes_logs.then_some(log_dir.as_path()));
    let log = logging::Logger::new(log_dir);

    let result = match args.command {
        Command::Run(opts) => commands::run::run(&opts, &log),
        Command::Plan(opts) => commands::plan::run(&opts, &log),
        Command::Check(opts) => commands::check::run(&opts, &log),
        Command::Version => Ok(format!("provision {}", commands::VERSION)),
    };

    match result {
        Ok(summary) => log.done(&summary),
        Err(e) => log.fatal(&format!("{e:#}")),
    }
}
