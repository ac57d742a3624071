#[macro_use]
extern crate log;

use riakdog::{apply, layers, resources};
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};
use snafu::ResultExt;
use std::path::PathBuf;
use std::str::FromStr;
use std::{env, process};

/// Hosts drop settings layers here; missing is fine, defaults apply.
const DEFAULT_SETTINGS_DIR: &str = "/etc/riakdog/settings.d";

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum Error {
        #[snafu(display("Logger setup error: {}", source))]
        Logger { source: log::SetLoggerError },
    }
}

/// RunMode represents what riakdog was asked to do: report the actions an
/// apply would take, or actually converge the host.
#[derive(Debug)]
enum RunMode {
    Plan,
    Apply,
}

/// Store the args we receive on the command line
struct Args {
    log_level: LevelFilter,
    mode: RunMode,
    settings_dir: PathBuf,
    settings_file: Option<PathBuf>,
}

/// Print a usage message in the event a bad arg is passed
fn usage() -> ! {
    let program_name = env::args().next().unwrap_or_else(|| "program".to_string());
    eprintln!(
        r"Usage: {}
            [ --apply ]
            [ --settings-dir DIR ]
            [ --settings-file FILE ]
            [ --log-level trace|debug|info|warn|error ]

    Without --apply, the resolved catalog is planned and the actions are
    printed as JSON; nothing on the host is touched.

    Settings directory defaults to {}",
        program_name, DEFAULT_SETTINGS_DIR,
    );
    process::exit(2);
}

/// Prints a more specific message before exiting through usage().
fn usage_msg<S: AsRef<str>>(msg: S) -> ! {
    eprintln!("{}\n", msg.as_ref());
    usage();
}

/// Parse the args to the program and return an Args struct
fn parse_args(args: env::Args) -> Args {
    let mut log_level = None;
    let mut mode = RunMode::Plan;
    let mut settings_dir = None;
    let mut settings_file = None;

    let mut iter = args.skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--apply" => mode = RunMode::Apply,

            "--log-level" => {
                let log_level_str = iter
                    .next()
                    .unwrap_or_else(|| usage_msg("Did not give argument to --log-level"));
                log_level = Some(LevelFilter::from_str(&log_level_str).unwrap_or_else(|_| {
                    usage_msg(format!("Invalid log level '{}'", log_level_str))
                }));
            }

            "--settings-dir" => {
                settings_dir = Some(PathBuf::from(
                    iter.next()
                        .unwrap_or_else(|| usage_msg("Did not give argument to --settings-dir")),
                ))
            }

            "--settings-file" => {
                settings_file = Some(PathBuf::from(
                    iter.next()
                        .unwrap_or_else(|| usage_msg("Did not give argument to --settings-file")),
                ))
            }

            _ => usage(),
        }
    }

    Args {
        mode,
        log_level: log_level.unwrap_or(LevelFilter::Info),
        settings_dir: settings_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_DIR)),
        settings_file,
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(env::args());

    SimpleLogger::init(args.log_level, LogConfig::default()).context(error::LoggerSnafu)?;

    info!("riakdog started");

    // The settings directory is optional; hosts that only use the defaults
    // (or an explicit file) don't have to create it.
    let settings_dir = if args.settings_dir.is_dir() {
        Some(args.settings_dir.as_path())
    } else {
        debug!(
            "Settings directory '{}' not present, skipping",
            args.settings_dir.display()
        );
        None
    };

    info!("Resolving settings layers");
    let settings = layers::load(settings_dir, args.settings_file.as_deref())?;

    info!("Building resource catalog");
    let catalog = resources::build(&settings)?;

    match args.mode {
        RunMode::Plan => {
            println!("{}", apply::render_plan(&catalog)?);
        }
        RunMode::Apply => {
            info!("Applying catalog ({} resources)", catalog.len());
            let outcome = apply::apply(&catalog)?;
            info!(
                "Apply complete; {} changed, {} refreshed",
                outcome.changed.len(),
                outcome.refreshed.len()
            );
        }
    }

    Ok(())
}

// Snafu gives our errors useful Display representations; wrap run() so main
// can print those instead of the Debug form.
fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        process::exit(1);
    }
}
