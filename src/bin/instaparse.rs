//! Compile a format description and generate a parser for it.
//!
//! Usage:
//!   instaparse [OPTIONS] FORMAT_FILE
//!
//! Exit status is 0 on success and 1 when the format file cannot be read or is invalid; every
//! problem found is printed to stderr before exiting.

use anyhow::Context;
use clap::Parser;
use instaparse::{
    backend_for, compile_file, dump, write_files, DocumentParser, GenerateConfig, Language,
};
use std::path::PathBuf;
use std::process;

/// Line-oriented format DSL compiler.
#[derive(Parser)]
#[command(name = "instaparse", version, about = "Generate parsers for line-oriented text formats")]
struct Cli {
    /// Path to the format description
    format_file: PathBuf,

    /// Target language (default: inferred from the output extension, else python)
    #[arg(short, long = "lang", value_enum)]
    language: Option<Language>,

    /// Entry module name; supporting modules go to the same directory
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Print the compiled parse plan instead of generating code
    #[arg(long)]
    dump_plan: bool,

    /// Only check the format file
    #[arg(long, conflicts_with = "dump_plan")]
    check: bool,

    /// Parse DOCUMENT with the compiled format and print the result instead of generating code
    #[arg(long, value_name = "DOCUMENT", conflicts_with_all = ["check", "dump_plan"])]
    run: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Writes log records to stderr as `[LEVEL target] message`.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    // Only fails if a logger is already installed.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let plan = match compile_file(&cli.format_file) {
        Ok(plan) => plan,
        Err(e) => {
            for diagnostic in e.diagnostics() {
                eprintln!("{}", diagnostic);
            }
            log::info!("{} problem(s) in {}", e.count(), cli.format_file.display());
            process::exit(1);
        }
    };

    if cli.check {
        println!("{}: ok", cli.format_file.display());
        return Ok(());
    }
    if cli.dump_plan {
        println!("{}", dump::dump_plan(&plan));
        return Ok(());
    }
    if let Some(document) = &cli.run {
        match DocumentParser::new(&plan).parse_file(document) {
            Ok(value) => {
                println!("{}", dump::format_value(&value, 0));
                return Ok(());
            }
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
    }

    let config = GenerateConfig::new(&cli.output, cli.language);
    let backend = backend_for(config.language);
    let files = backend
        .generate(&plan, &config)
        .with_context(|| format!("generating {} parser", config.language))?;
    write_files(&files).context("writing generated parser")?;
    log::info!(
        "generated {} file(s) for {}",
        files.len(),
        config.entry_path().display()
    );
    Ok(())
}
