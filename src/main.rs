use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod batch;
mod config;
mod diagnostics;
mod error;
mod model;
mod render;
mod store;
mod trace;

use config::{DETAILED_MEMORY_STORE, DETAILED_TIMING_STORE, StoreLayout};
use trace::ExtractionMode;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "nsys-trace-stats")]
#[command(about = "Nsight Systems trace statistics and LaTeX reports", long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract summaries from trace databases and append them to the record stores.
    Extract {
        /// A .sqlite trace export, or a directory of them.
        input: PathBuf,

        /// Label the extracted runs are stored under.
        #[arg(long)]
        version: String,

        /// Directory holding the record stores.
        #[arg(short, long, env = "NSYS_STATS_OUTPUT", default_value = ".")]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = ModeArg::Detailed)]
        mode: ModeArg,
    },

    /// Render LaTeX tables for every version in the detailed record stores.
    Report {
        #[arg(long, default_value = DETAILED_TIMING_STORE)]
        timing_store: PathBuf,

        #[arg(long, default_value = DETAILED_MEMORY_STORE)]
        memory_store: PathBuf,

        #[arg(short = 'o', long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Per-operation time, instances and category for the LaTeX tables.
    Detailed,
    /// Time-only totals for plotting.
    Plot,
}

impl From<ModeArg> for ExtractionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Detailed => ExtractionMode::Detailed,
            ModeArg::Plot => ExtractionMode::Plot,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    diagnostics::init(cli.verbose);

    match cli.cmd {
        Commands::Extract {
            input,
            version,
            output,
            mode,
        } => {
            let mode = ExtractionMode::from(mode);
            let files = batch::discover_traces(&input)?;
            std::fs::create_dir_all(&output)
                .with_context(|| format!("create output directory {}", output.display()))?;

            let layout = StoreLayout::for_mode(&output, mode);
            let outcome = batch::extract_batch(&files, &version, mode, &layout);
            tracing::info!(
                version = %version,
                failed = outcome.failed,
                "processed {} of {} trace file(s)",
                outcome.processed,
                files.len()
            );
        }
        Commands::Report {
            timing_store,
            memory_store,
            output_dir,
        } => {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("create output directory {}", output_dir.display()))?;

            let outcome = batch::report_batch(&timing_store, &memory_store, &output_dir)?;
            for path in &outcome.written {
                println!("Wrote {}", path.display());
            }
            if !outcome.skipped.is_empty() {
                tracing::info!(
                    "skipped {} version(s) without memory data",
                    outcome.skipped.len()
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flag_maps_to_extraction_mode() {
        let args = ["nsys-trace-stats", "extract", "t.sqlite", "--version", "v1"];
        let cli = Cli::try_parse_from(args).unwrap();
        let Commands::Extract { mode, .. } = cli.cmd else {
            panic!("expected extract");
        };
        assert_eq!(ExtractionMode::from(mode), ExtractionMode::Detailed);

        let cli = Cli::try_parse_from([
            "nsys-trace-stats",
            "extract",
            "t.sqlite",
            "--version",
            "v1",
            "--mode",
            "plot",
        ])
        .unwrap();
        let Commands::Extract { mode, .. } = cli.cmd else {
            panic!("expected extract");
        };
        assert_eq!(ExtractionMode::from(mode), ExtractionMode::Plot);
    }
}
