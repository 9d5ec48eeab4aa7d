//! codesnag CLI - Command-line interface for JavaScript static analysis
//!
//! This binary analyzes JavaScript sources, lists the rule catalogue and
//! manages the report cache.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli_args;

use cli_args::{CacheCommands, Cli, Commands};
use codesnag_cli::cache::ReportCache;
use codesnag_cli::commands;
use std::path::PathBuf;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "CODESNAG_LOG";

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cache_dir = cli.cache_dir.map(PathBuf::from);

    let result = match cli.command {
        Commands::Lint {
            paths,
            config,
            disable_rules,
            only_rules,
            format,
            strict,
            no_cache,
            output,
        } => {
            let output_format = format
                .parse::<commands::lint::OutputFormat>()
                .expect("clap should have validated format");
            commands::lint::run(&commands::lint::LintOptions {
                paths,
                config,
                disable_rules,
                only_rules,
                format: output_format,
                strict,
                use_cache: !no_cache,
                cache_dir,
                output,
            })
        }
        Commands::Rules { json } => commands::rules::run(json),
        Commands::Cache { command } => {
            ReportCache::open(cache_dir.as_deref()).and_then(|cache| match command {
                CacheCommands::List => commands::cache::list(&cache),
                CacheCommands::Prune { older_than } => commands::cache::prune(&cache, older_than),
                CacheCommands::Clear => commands::cache::clear(&cache),
            })
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(commands::lint::EXIT_USAGE)
        }
    }
}
