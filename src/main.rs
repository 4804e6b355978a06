use std::fs::File;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser as _;
use tracing::{debug, info};

use logload::cli::{CleanArgs, Cli, Command, CsvArgs, LoadArgs};
use logload::clickhouse::ClickHouseSink;
use logload::config::Config;
use logload::pipeline::{import, ImportStats};
use logload::row::NON_EMPTY_FIELDS;
use logload::sink::CsvFileSink;
use logload::{clean, Parser, Reader};

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("logload: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `-v`/`-q`.
fn setup_logging(cli: &Cli) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("logload={}", cli.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::from_cli(cli).context("failed to load configuration")?;
    debug!(format = %config.format, policy = ?config.error_policy, "configuration loaded");

    match &cli.command {
        Command::Csv(args) => run_csv(args, &config),
        Command::Load(args) => run_load(args, &config),
        Command::Clean(args) => run_clean(args),
    }
}

fn open_reader(path: &Path, config: &Config) -> anyhow::Result<Reader<File>> {
    let parser = Parser::new(&config.format)?.require_non_empty(NON_EMPTY_FIELDS);
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(Reader::with_parser(file, parser))
}

fn run_csv(args: &CsvArgs, config: &Config) -> anyhow::Result<()> {
    let reader = open_reader(&args.input, config)?;
    let sink = CsvFileSink::create(args.output_path())?;
    let target = sink.target().to_path_buf();

    let stats = import(reader, sink, config.error_policy)
        .with_context(|| format!("failed to convert {}", args.input.display()))?;
    report(&stats);
    info!(output = %target.display(), "CSV written");
    Ok(())
}

fn run_load(args: &LoadArgs, config: &Config) -> anyhow::Result<()> {
    let reader = open_reader(&args.input, config)?;
    let sink = ClickHouseSink::connect(config.clickhouse.clone()).with_context(|| {
        format!("cannot prepare ClickHouse at {}", config.clickhouse.url)
    })?;

    let stats = import(reader, sink, config.error_policy)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    report(&stats);
    Ok(())
}

fn run_clean(args: &CleanArgs) -> anyhow::Result<()> {
    let output = args.output_path();
    let lines = clean::clean_file(&args.input, &output).with_context(|| {
        format!(
            "failed to clean {} into {}",
            args.input.display(),
            output.display()
        )
    })?;

    info!(lines, output = %output.display(), "log cleaned");
    Ok(())
}

fn report(stats: &ImportStats) {
    if stats.skipped > 0 {
        println!(
            "{} rows imported, {} invalid lines skipped",
            stats.rows, stats.skipped
        );
    } else {
        println!("{} rows imported", stats.rows);
    }
}
