//! Offline Region CLI
//!
//! Captures, lists, shows and deletes offline map regions in a file-backed
//! store.
//!
//! Usage:
//!   offline-regions capture --threats crates/offline-regions/data/threats.json \
//!       --lat 31.5 --lng 34.45 --lat-delta 0.1 --lng-delta 0.1
//!   offline-regions list
//!   offline-regions show <id>
//!   offline-regions delete <id>

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use offline_regions::loader::JsonFileThreatSource;
use offline_regions::{
    time_ago, BoundedRegionStore, FileMedium, GeoPoint, RegionAssembler, RegionStore,
    StoreConfig, Viewport,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    name = "offline-regions",
    about = "Manage offline map regions and their threat snapshots"
)]
struct Args {
    /// Directory holding the region store (default: $OFFLINE_REGIONS_DIR or .offline-regions)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage key for the region collection
    #[arg(long, global = true)]
    key: Option<String>,

    /// Keep at most this many regions, evicting the oldest on capture
    #[arg(long, global = true)]
    max_regions: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the threats inside a viewport as a new region
    Capture {
        /// Threat feed JSON (array of threats)
        #[arg(short, long)]
        threats: PathBuf,

        /// Viewport center latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Viewport center longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Full latitude span of the viewport
        #[arg(long, default_value_t = 0.1)]
        lat_delta: f64,

        /// Full longitude span of the viewport
        #[arg(long, default_value_t = 0.1)]
        lng_delta: f64,

        /// Region name (default: "Map <date>")
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List saved regions
    List,
    /// Print a saved region as JSON
    Show { id: String },
    /// Delete a saved region
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = StoreConfig::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(key) = args.key {
        config.storage_key = key;
    }
    if args.max_regions.is_some() {
        config.max_regions = args.max_regions;
    }

    info!("Region store at {:?} (key {})", config.data_dir, config.storage_key);
    let store = RegionStore::with_key(FileMedium::new(&config.data_dir), &config.storage_key);

    match args.command {
        Command::Capture {
            threats,
            lat,
            lng,
            lat_delta,
            lng_delta,
            name,
        } => {
            let viewport = Viewport {
                center: GeoPoint::new(lat, lng),
                latitude_delta: lat_delta,
                longitude_delta: lng_delta,
            };
            let source = JsonFileThreatSource::new(threats);

            let report = RegionAssembler::new(&store)
                .capture_from(&source, &viewport, name)
                .await?;
            println!(
                "Saved \"{}\" ({}) with {} threats",
                report.name, report.region_id, report.threat_count
            );

            if let Some(policy) = config.retention() {
                let evicted = BoundedRegionStore::new(&store, policy)
                    .enforce(&report.region_id)
                    .await?;
                for id in evicted {
                    println!("Evicted {}", id);
                }
            }
        }
        Command::List => {
            let summaries = store.summaries().await;
            println!(
                "{} {} saved",
                summaries.len(),
                if summaries.len() == 1 { "region" } else { "regions" }
            );
            for s in summaries {
                println!(
                    "  {:36} | {:30} | {:4} threats | {}",
                    s.id, s.name, s.threat_count, s.downloaded_at
                );
            }
        }
        Command::Show { id } => {
            let Some(region) = store.get(&id).await else {
                bail!("Map region not found: {}", id);
            };

            let now = Utc::now();
            for threat in &region.threats {
                info!(
                    "{} [{}] {} {}",
                    threat.category,
                    threat.threat_level.severity().marker_color(),
                    threat.threat_level.as_str(),
                    time_ago(threat.timestamp_str(), now)
                );
            }
            println!("{}", serde_json::to_string_pretty(&region)?);
        }
        Command::Delete { id } => {
            store.delete(&id).await?;
            println!("Deleted {}", id);
        }
    }

    Ok(())
}
