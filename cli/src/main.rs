#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use std::path::Path;

use anyhow::Result;
use structopt::StructOpt;

/// Tools for turning bus breadcrumb data into maps.
#[derive(StructOpt)]
#[structopt(name = "breadcrumbs")]
enum Command {
    /// Convert one tab-separated query extract into a GeoJSON file
    Convert {
        /// The path to a tab-separated extract with a header row
        input: String,
        /// The path to write a GeoJSON FeatureCollection to
        output: String,
    },
    /// Convert every .tsv extract in a directory to .geojson files
    Batch {
        /// The directory holding .tsv extracts
        input_dir: String,
        /// The directory to write .geojson files into
        output_dir: String,
    },
    /// Clean raw breadcrumb feed files into breadcrumb and trip tables
    Prepare {
        /// Paths to JSON files, each an array of raw feed records
        #[structopt(required = true)]
        inputs: Vec<String>,
        /// The directory to write breadcrumbs.tsv and trips.tsv into
        #[structopt(long, default_value = ".")]
        out_dir: String,
    },
    /// Backfill trip routes, service keys, and directions from a stop event
    /// extract
    EnrichTrips {
        /// The trips.tsv written by prepare; rewritten in place
        trips: String,
        /// A tab-separated stop event extract with a header row
        stop_events: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Command::from_args() {
        Command::Convert { input, output } => {
            model::export::convert(&input, &output)?;
        }
        Command::Batch {
            input_dir,
            output_dir,
        } => {
            let summary = model::export::convert_dir(&input_dir, &output_dir)?;
            info!("{} extracts converted", summary.converted);
            if summary.failed > 0 {
                bail!(
                    "failed to convert {} of {} extracts",
                    summary.failed,
                    summary.converted + summary.failed
                );
            }
        }
        Command::Prepare { inputs, out_dir } => {
            let (records, undecodable) = model::feed::load_files(&inputs)?;
            if undecodable > 0 {
                warn!("{} records in the feed didn't decode", undecodable);
            }
            let (crumbs, trips, _) = model::breadcrumb::prepare(records);
            model::breadcrumb::write_tables(Path::new(&out_dir), &crumbs, &trips)?;
        }
        Command::EnrichTrips { trips, stop_events } => {
            let summary = model::stop_event::enrich_trips_file(
                Path::new(&trips),
                Path::new(&stop_events),
            )?;
            if summary.skipped_events > 0 {
                warn!(
                    "{} stop events in the extract didn't decode",
                    summary.skipped_events
                );
            }
        }
    }
    Ok(())
}
