// ============================================================================
// CLI: headless drawing and replay
// ============================================================================
//
// Usage examples:
//   Scribble --events strokes.json --export
//   Scribble --load project.json --events more.json --save-project --out-dir out/
//   Scribble --import photo.jpg --width 1024 --height 768 --preview composited.png
//
// Every `download` effect produced while replaying is written to --out-dir
// under its file name. Notifications are printed to stderr.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::app::{App, Effect, Event};
use crate::io::{self, CodecError};
use crate::settings::AppSettings;

#[derive(Parser, Debug)]
#[command(
    name = "Scribble",
    about = "Headless freehand drawing surface",
    long_about = "Replay drawing events against an in-memory surface and write the results.\n\n\
                  Events are a JSON array of tagged objects, e.g.\n  \
                  [{\"type\":\"pointer_down\",\"x\":10,\"y\":10},{\"type\":\"pointer_up\",\"x\":90,\"y\":10}]"
)]
pub struct CliArgs {
    /// Surface width in pixels (defaults to the configured canvas width)
    #[arg(long)]
    pub width: Option<u32>,

    /// Surface height in pixels (defaults to the configured canvas height)
    #[arg(long)]
    pub height: Option<u32>,

    /// Project file to load before replaying events
    #[arg(short, long, value_name = "FILE")]
    pub load: Option<PathBuf>,

    /// Image to import (fitted and centered) before replaying events
    #[arg(short, long, value_name = "FILE")]
    pub import: Option<PathBuf>,

    /// JSON file with an array of events to replay
    #[arg(short, long, value_name = "FILE")]
    pub events: Option<PathBuf>,

    /// Directory receiving downloads
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Export the final drawing as PNG
    #[arg(long)]
    pub export: bool,

    /// Save the final drawing as a project file
    #[arg(long)]
    pub save_project: bool,

    /// Write the surface with the grid overlay to this PNG path
    #[arg(long, value_name = "FILE")]
    pub preview: Option<PathBuf>,

    /// Echo log lines to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the session log here instead of the default location
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug)]
pub enum CliError {
    Io(PathBuf, std::io::Error),
    /// A load, import or event script was rejected by the app.
    Rejected(String),
    Codec(CodecError),
    Script(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(path, e) => write!(f, "{}: {}", path.display(), e),
            CliError::Rejected(msg) => write!(f, "{}", msg),
            CliError::Codec(e) => write!(f, "{}", e),
            CliError::Script(e) => write!(f, "Invalid event script: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        CliError::Codec(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Script(e)
    }
}

/// Run headless mode. Returns the process exit code.
pub fn run(args: CliArgs, settings: &AppSettings) -> ExitCode {
    match execute(&args, settings) {
        Ok(written) => {
            for path in written {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_err!("CLI failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Replay everything `args` asks for. Returns the files written.
pub fn execute(args: &CliArgs, settings: &AppSettings) -> Result<Vec<PathBuf>, CliError> {
    let width = args.width.unwrap_or(settings.canvas_width);
    let height = args.height.unwrap_or(settings.canvas_height);
    let mut app = App::new(settings, width, height);
    let mut effects = Vec::new();

    if let Some(path) = &args.load {
        let json = read_string(path)?;
        let fx = app.handle(Event::LoadProject { json });
        fail_on_notify(&fx)?;
        effects.extend(fx);
    }
    if let Some(path) = &args.import {
        let bytes = std::fs::read(path).map_err(|e| CliError::Io(path.clone(), e))?;
        let fx = app.handle(Event::ImportImage { bytes });
        fail_on_notify(&fx)?;
        effects.extend(fx);
    }
    if let Some(path) = &args.events {
        let events = parse_events(&read_string(path)?)?;
        log_info!("Replaying {} events from {}", events.len(), path.display());
        for event in events {
            effects.extend(app.handle(event));
        }
    }
    if args.export {
        effects.extend(app.handle(Event::ExportImage));
    }
    if args.save_project {
        effects.extend(app.handle(Event::SaveProject));
    }

    let mut written = Vec::new();
    for effect in effects {
        match effect {
            Effect::Download { file_name, bytes, .. } => {
                written.push(write_file(&args.out_dir, &file_name, &bytes)?);
            }
            Effect::Notify { message } => eprintln!("{}", message),
            _ => {}
        }
    }
    if let Some(path) = &args.preview {
        let png = io::encode_png(&app.composited())?;
        std::fs::write(path, png).map_err(|e| CliError::Io(path.clone(), e))?;
        written.push(path.clone());
    }
    Ok(written)
}

pub fn parse_events(json: &str) -> Result<Vec<Event>, CliError> {
    Ok(serde_json::from_str(json)?)
}

fn read_string(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io(path.to_path_buf(), e))
}

fn fail_on_notify(fx: &[Effect]) -> Result<(), CliError> {
    match fx.iter().find_map(|e| match e {
        Effect::Notify { message } => Some(message),
        _ => None,
    }) {
        Some(message) => Err(CliError::Rejected(message.clone())),
        None => Ok(()),
    }
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, CliError> {
    std::fs::create_dir_all(dir).map_err(|e| CliError::Io(dir.to_path_buf(), e))?;
    let path = dir.join(name);
    std::fs::write(&path, bytes).map_err(|e| CliError::Io(path.clone(), e))?;
    log_info!("Wrote {}", path.display());
    Ok(path)
}
