//! Sliding-window maximum over numbers read concurrently from files.
//!
//! Usage: window-max [OPTIONS] <WINDOW_SIZE> [SOURCES]...
//!
//! Prints one `<value> <window max>` line per number, in processing order.
//! Set RUST_LOG=debug for per-source diagnostics on stderr.

use clap::Parser;
use std::io::{self, BufWriter};
use window_max::{prepare_sources, BufferMode, PipelineBuilder, WriterSink};

#[derive(Parser)]
#[command(name = "window-max")]
#[command(about = "Sliding-window maximum over numbers read concurrently from files")]
#[command(version)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Number of trailing values each maximum covers (values below 1 mean 1)
    window_size: i64,

    /// Files of whitespace-separated numbers
    sources: Vec<String>,

    /// Bound the shared buffer to this many values (default: unbounded)
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Producer threads per available CPU
    #[arg(short, long, default_value_t = window_max::config::DEFAULT_WORKERS_PER_CPU)]
    workers_per_cpu: usize,

    /// Log the run report when finished
    #[arg(short, long)]
    report: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.report { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    let pipeline = PipelineBuilder::new()
        .window_size(cli.window_size)
        .buffer_mode(BufferMode::from_capacity(cli.capacity)?)
        .workers_per_cpu(cli.workers_per_cpu)
        .build()?;

    let sink = WriterSink::new(BufWriter::new(io::stdout()));
    let report = match pipeline.run(prepare_sources(&cli.sources), sink) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Run failed: {}", e);
            return Err(e.into());
        }
    };

    if cli.report {
        report.log();
    }

    Ok(())
}
