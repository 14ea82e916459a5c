use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use crate::breadcrumb::{self, Trip};
use crate::{ServiceKey, TripID, VehicleID};

/// One stop event: a per-trip record from the stop events API carrying the
/// fields the breadcrumb feed lacks.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StopEvent {
    pub trip_id: TripID,
    pub vehicle_number: VehicleID,
    pub route_number: i64,
    pub service_key: ServiceKey,
    pub direction: i64,
}

pub struct EnrichSummary {
    pub trips: usize,
    pub updated: usize,
    /// Stop event rows that didn't decode. Never applied to the table.
    pub skipped_events: usize,
}

/// Load stop events from a tab-separated file with a header row,
/// deduplicated on (trip_id, vehicle_number), first one wins. Rows that
/// don't decode are counted, not fatal.
pub fn load<R: std::io::Read>(reader: R) -> Result<(Vec<StopEvent>, usize)> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let mut events: Vec<StopEvent> = Vec::new();
    let mut seen: BTreeSet<(TripID, VehicleID)> = BTreeSet::new();
    let mut skipped = 0;
    for rec in rdr.deserialize::<StopEvent>() {
        match rec {
            Ok(ev) => {
                if seen.insert((ev.trip_id, ev.vehicle_number)) {
                    events.push(ev);
                }
            }
            Err(err) => {
                warn!("Skipping undecodable stop event: {}", err);
                skipped += 1;
            }
        }
    }
    Ok((events, skipped))
}

/// Replace the placeholder route, service key, and direction of every trip
/// that has a stop event, matched on trip_id. Returns how many trips
/// changed.
pub fn enrich_trips(trips: &mut [Trip], events: &[StopEvent]) -> usize {
    let mut by_trip: BTreeMap<TripID, &StopEvent> = BTreeMap::new();
    for ev in events {
        by_trip.entry(ev.trip_id).or_insert(ev);
    }

    let mut updated = 0;
    for trip in trips {
        if let Some(ev) = by_trip.get(&trip.trip_id) {
            trip.route_id = ev.route_number;
            trip.service_key = ev.service_key;
            trip.direction = ev.direction;
            updated += 1;
        }
    }
    updated
}

/// The whole enrichment step: read a trip table back, merge a stop event
/// extract into it, rewrite the table in place. Trips without a stop event
/// keep their placeholders. The rewrite goes through a sibling temp file
/// and a rename, so a failure mid-write can't leave a truncated table.
pub fn enrich_trips_file(trips_path: &Path, events_path: &Path) -> Result<EnrichSummary> {
    let mut trips = breadcrumb::read_trips(trips_path)?;
    let file = fs_err::File::open(events_path)?;
    let (events, skipped_events) = load(file)?;

    let updated = enrich_trips(&mut trips, &events);
    let tmp_path = trips_path.with_extension("tsv.tmp");
    breadcrumb::write_trip_table(&tmp_path, &trips)?;
    fs_err::rename(&tmp_path, trips_path)?;

    info!(
        "{}: backfilled {} of {} trips from {} stop events",
        trips_path.display(),
        updated,
        trips.len(),
        events.len()
    );
    Ok(EnrichSummary {
        trips: trips.len(),
        updated,
        skipped_events,
    })
}
