use std::{error::Error, path::Path, process::ExitCode};

use clap::Parser;
use log::error;
use rayon::prelude::*;
use rw_lib::{clump::Clump, native::NativeDecoders};

#[derive(Parser)]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// The folder to search recursively for .dff files.
    root_folder: String,

    /// Validate each clump and normalize native geometry.
    #[arg(long)]
    normalize: bool,

    /// The minimum level for log messages.
    #[arg(long, default_value_t = log::LevelFilter::Warn)]
    log_level: log::LevelFilter,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Outcome {
    Parsed,
    /// The file does not start with a clump.
    Skipped,
    Failed,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(cli.log_level)
        .init()?;

    let start = std::time::Instant::now();

    let outcomes: Vec<_> =
        globwalk::GlobWalkerBuilder::from_patterns(&cli.root_folder, &["*.dff"])
            .case_insensitive(true)
            .build()?
            .par_bridge()
            .map(|entry| match entry {
                Ok(entry) => check_file(entry.path(), cli.normalize),
                Err(e) => {
                    error!("Error accessing file: {e}");
                    Outcome::Failed
                }
            })
            .collect();

    let count = |outcome: Outcome| outcomes.iter().filter(|o| **o == outcome).count();
    let failed = count(Outcome::Failed);
    println!(
        "Parsed {}, skipped {}, failed {} files in {:?}",
        count(Outcome::Parsed),
        count(Outcome::Skipped),
        failed,
        start.elapsed()
    );

    if failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn check_file(path: &Path, normalize: bool) -> Outcome {
    let decoders = NativeDecoders::default();
    let result = if normalize {
        rw_model::load_model(path, decoders)
            .map(|model| model.is_some())
            .map_err(|e| error_chain(&e))
    } else {
        Clump::from_file(path, decoders)
            .map(|clump| clump.is_some())
            .map_err(|e| error_chain(&e))
    };

    match result {
        Ok(true) => Outcome::Parsed,
        Ok(false) => Outcome::Skipped,
        Err(e) => {
            error!("Error reading {path:?}: {e}");
            Outcome::Failed
        }
    }
}

fn error_chain(e: &dyn Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(e) = source {
        message.push_str(": ");
        message.push_str(&e.to_string());
        source = e.source();
    }
    message
}
