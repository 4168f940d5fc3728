mod assets;
mod cli;
mod converter;
mod converters;
mod engine;
mod hints;
mod markdown;
mod metadata;
mod output;
mod plugin;
mod reader;
mod stream_info;

use clap::Parser;
use hints::HintError;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose);

    match converter::run(&cli, io::stdin().lock(), io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // validation problems are user-facing messages on stdout
            if let Some(hint_err) = err.downcast_ref::<HintError>() {
                println!("{}", hint_err);
            } else {
                eprintln!("Error: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`.
/// Logs go to stderr so stdout stays pure markdown.
fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
