use std::{error::Error, path::PathBuf};

use clap::Parser;
use dispatch_reconciler::{ReconcileConfig, Reconciler, gtfs};
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// JSON configuration of the run (hastusFiles, stopToStopCsv, stopOrderToShapesCsv, ...)
    #[arg(long)]
    config: PathBuf,
    /// base GTFS feed, a directory or a .zip archive
    #[arg(long)]
    gtfs: PathBuf,
    /// directory receiving the reconciled GTFS text files
    #[arg(long)]
    output: PathBuf,
    /// optional file receiving a binary snapshot of the reconciled store
    #[arg(long)]
    snapshot: Option<PathBuf>,
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    SimpleLogger::new().with_level(args.log_level).init()?;

    let config = ReconcileConfig::from_json_file(&args.config)?;
    let mut store = gtfs::load(&args.gtfs)?;
    let report = Reconciler::new(config).run(&mut store)?;

    gtfs::write(&store, &args.output)?;
    if let Some(path) = &args.snapshot {
        store.save_snapshot(path)?;
        log::info!("Snapshot written to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
