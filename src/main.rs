use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use air::air::{load_ir, peek_files, Air};
use air::errors::{AirError, Result};
use air::evidence::{format_evidence_as_json, format_evidence_as_pces};

/// Project intermediate representation for source trees.
#[derive(Parser)]
#[command(name = "air", about = "Project IR builder and evidence query tool")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .air/config.json
    Init {
        /// Project path (default: current directory)
        path: Option<String>,
    },
    /// Scan a source tree and emit its PIR
    Forward {
        /// Project path (default: current directory)
        path: Option<String>,
        /// Write the PIR to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Project name written to the meta block
        #[arg(short, long)]
        name: Option<String>,
        /// Profile written to the meta block
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Answer a PCR request against a PIR
    Peek {
        /// Request document
        request: PathBuf,
        /// PIR document to query
        #[arg(long)]
        pir: PathBuf,
        /// Directory unit paths are relative to (default: the PIR's root)
        #[arg(short, long)]
        source_dir: Option<PathBuf>,
        /// Write the response to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pces)]
        format: OutputFormat,
    },
    /// Show statistics of a PIR
    Status {
        /// PIR document
        pir: PathBuf,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Pces,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so that stdout carries only documents.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path } => {
            let project_path = resolve_path(path);
            Air::init(&project_path)?;
            println!("Initialized AIR project at {}", project_path.display());
        }
        Commands::Forward {
            path,
            output,
            name,
            profile,
        } => {
            let project_path = resolve_path(path);
            let mut air = Air::open(&project_path)?;
            if let Some(name) = name {
                air.config_mut().name = name;
            }
            if let Some(profile) = profile {
                air.config_mut().profile = profile;
            }
            let result = air.forward()?;
            match output {
                Some(out) => {
                    write_output(&out, &result.pir)?;
                    eprintln!(
                        "Wrote {}: {} units, {} symbols from {} files in {}ms",
                        out.display(),
                        result.stats.unit_count,
                        result.stats.symbol_count,
                        result.file_count,
                        result.duration_ms
                    );
                }
                None => print!("{}", result.pir),
            }
        }
        Commands::Peek {
            request,
            pir,
            source_dir,
            output,
            format,
        } => {
            let evidence = peek_files(&pir, &request, source_dir.as_deref())?;
            let text = match format {
                OutputFormat::Pces => format_evidence_as_pces(&evidence),
                OutputFormat::Json => format_evidence_as_json(&evidence)?,
            };
            match output {
                Some(out) => write_output(&out, &text)?,
                None => print!("{}", text),
            }
        }
        Commands::Status { pir, json } => {
            let ir = load_ir(&pir)?;
            let stats = ir.model().stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("AIR Status: {}", stats.name);
                println!("  Units:        {}", stats.unit_count);
                println!("  Symbols:      {}", stats.symbol_count);
                println!("  Dependencies: {}", stats.dependency_count);
                println!("  Layout:       {}", stats.layout_count);
                println!("  Snippets:     {}", stats.snippet_count);
                if let Some(profile) = &stats.active_profile {
                    println!("  Profile:      {}", profile);
                }
                if !stats.units_by_language.is_empty() {
                    println!("\n  Units by language:");
                    for (language, count) in &stats.units_by_language {
                        println!("    {}: {}", language, count);
                    }
                }
                if !stats.symbols_by_kind.is_empty() {
                    println!("\n  Symbols by kind:");
                    for (kind, count) in &stats.symbols_by_kind {
                        println!("    {}: {}", kind, count);
                    }
                }
            }
        }
    }
    Ok(())
}

fn write_output(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).map_err(|e| AirError::File {
        message: format!("failed to write output: {e}"),
        path: path.display().to_string(),
    })
}

/// Resolves an optional path argument to a `PathBuf`.
///
/// Defaults to the current working directory if no path is provided.
fn resolve_path(path: Option<String>) -> PathBuf {
    match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
