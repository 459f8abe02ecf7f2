use anyhow::{Context, Result};
use clap::Parser;
use intcatalog::cli::Cli;
use intcatalog::config::load_config;
use intcatalog::io::{create_writer, open_destination};
use intcatalog::pipeline::Pipeline;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let config = cli.apply_overrides(config);

    let mut pipeline = Pipeline::new(config);
    let report = pipeline
        .run(&cli.path)
        .with_context(|| format!("cannot scan {}", cli.path.display()))?;

    for failure in &report.failures {
        eprintln!("Warning: {}", failure);
    }

    let sink = open_destination(cli.output.as_deref())?;
    create_writer(cli.format, sink).write_catalog(&report.catalog)?;

    log::info!(
        "{} files scanned, {} skipped, {} functions cataloged, {} probes run",
        report.stats.files_scanned,
        report.stats.files_skipped,
        report.catalog.len(),
        report.stats.probes_run
    );
    Ok(())
}

// RUST_LOG takes precedence over -v.
fn init_logging(cli: &Cli) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(cli.log_level());
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    builder.format_timestamp(None).init();
}
