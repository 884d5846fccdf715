use std::process::ExitCode;

use clap::Parser;
use rowscatter::{
    config::{available_workers, DEFAULT_DIMENSION},
    report::{ConsoleReporter, Reporter},
    run, DefaultA, DefaultB, MatrixSource, RandomSource, RunConfig,
};

/// Multiply two square matrices by scattering row blocks over a worker group.
#[derive(Debug, Parser)]
#[command(name = "rowscatter", version, about)]
struct Args {
    /// Matrix dimension N (matrices are N x N).
    #[arg(short = 'n', long, env = "ROWSCATTER_DIMENSION", default_value_t = DEFAULT_DIMENSION)]
    dimension: usize,

    /// Number of workers, coordinator included. Defaults to the CPU count.
    #[arg(short, long, env = "ROWSCATTER_WORKERS")]
    workers: Option<usize>,

    /// Fill A and B with seeded random values instead of the default formulas.
    #[arg(long)]
    random_seed: Option<u64>,

    /// Only print the elapsed time.
    #[arg(short, long)]
    quiet: bool,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = RunConfig::new(
        args.dimension,
        args.workers.unwrap_or_else(available_workers),
    );

    let (source_a, source_b): (Box<dyn MatrixSource>, Box<dyn MatrixSource>) =
        match args.random_seed {
            Some(seed) => (
                Box::new(RandomSource::new(seed)),
                Box::new(RandomSource::new(seed.wrapping_add(1))),
            ),
            None => (Box::new(DefaultA), Box::new(DefaultB)),
        };

    let outcome = match run(config, source_a.as_ref(), source_b.as_ref()) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut reporter = if args.quiet {
        ConsoleReporter::timing_only(std::io::stdout())
    } else {
        ConsoleReporter::stdout()
    };
    if let Err(e) = reporter.report(&outcome) {
        eprintln!("error: failed to write report: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
