//! caseport CLI - test case metadata from Python test trees

mod cli;
mod colors;
mod commands;
mod output;

use std::process::ExitCode;

use cli::Commands;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Environment variable holding a `target=level` log filter
const LOG_ENV: &str = "CASEPORT_LOG";

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };

    let targets = match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.is_empty() => match directives.parse::<Targets>() {
            Ok(targets) => targets,
            Err(err) => {
                eprintln!("warning: ignoring invalid {}: {}", LOG_ENV, err);
                Targets::new().with_default(default_level)
            }
        },
        _ => Targets::new().with_default(default_level),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(targets);

    tracing_subscriber::registry().with(layer).init();
}

fn main() -> ExitCode {
    let cli = cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Some(Commands::Collect { args, fields }) => {
            commands::run_collect(args, fields, cli.json, cli.quiet)
        }
        Some(Commands::Validate { args, strict }) => {
            commands::run_validate(args, strict, cli.json, cli.quiet)
        }
        Some(Commands::Requirements { args }) => {
            commands::run_requirements(args, cli.json, cli.quiet)
        }
        Some(Commands::Version) => commands::run_version(cli.verbose, cli.json, cli.quiet),
        None => {
            // No subcommand - print version info
            if !cli.quiet {
                println!("caseport v{}", env!("CARGO_PKG_VERSION"));
                println!("Use --help for usage information");
            }
            Ok(0)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
