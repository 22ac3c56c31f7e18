use clap::Parser;
use std::process::ExitCode;

use scribble::cli::{self, CliArgs};
use scribble::logger;
use scribble::settings::AppSettings;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // -- Session log ------------------------------------------------------
    match &args.log_file {
        Some(path) => logger::init_at(path),
        None => logger::init(),
    }
    logger::set_echo(args.verbose);

    let settings = AppSettings::load();
    scribble::log_info!(
        "Starting Scribble {} (undo steps {}, canvas {}x{})",
        env!("CARGO_PKG_VERSION"),
        settings.max_undo_steps,
        settings.canvas_width,
        settings.canvas_height
    );

    cli::run(args, &settings)
}
