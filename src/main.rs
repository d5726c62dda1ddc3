//! CLI front end for `butterfly-graph`: a single `build` subcommand that
//! drives the pipeline against a `.osm.pbf` path and reports a pass-by-pass
//! summary.

use anyhow::Result;
use butterfly_graph::{build, BuildError, PbfFile};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "butterfly-graph")]
#[command(about = "Build a routable road graph from an OpenStreetMap PBF extract")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log format: "text" (default, human-readable) or "json".
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a PBF file through the four-pass pipeline and report the
    /// resulting vertex/edge counts.
    Build {
        /// Input `.osm.pbf` file.
        input: PathBuf,
    },
}

/// Initialize structured logging with tracing.
///
/// Respects `RUST_LOG` (default: `info`). `"json"` emits structured JSON
/// lines; anything else falls back to the human-readable formatter.
fn init_tracing(log_format: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().json().with_env_filter(filter).with_target(true).init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(false).init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_format);

    match cli.command {
        Commands::Build { input } => run_build(&input),
    }
}

fn run_build(input: &PathBuf) -> Result<()> {
    tracing::info!(path = %input.display(), "starting graph build");
    let start = Instant::now();

    let source = PbfFile::new(input);
    let graph = build(&source).map_err(|err| annotate(err, input))?;

    let elapsed = start.elapsed();
    tracing::info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        elapsed_ms = elapsed.as_millis() as u64,
        "graph build complete"
    );

    Ok(())
}

/// Adds file-path context to a [`BuildError`] before it crosses into
/// `anyhow`, matching this lineage's convention: typed errors underneath,
/// `anyhow` context chains at the CLI boundary.
fn annotate(err: BuildError, input: &PathBuf) -> anyhow::Error {
    anyhow::Error::new(err).context(format!("building graph from {}", input.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_subcommand_parses_input_path() {
        let cli = Cli::parse_from(["butterfly-graph", "build", "extract.osm.pbf"]);
        match cli.command {
            Commands::Build { input } => assert_eq!(input, PathBuf::from("extract.osm.pbf")),
        }
    }
}
