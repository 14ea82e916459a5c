use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize, Serializer};

use crate::enrich;
use crate::feed::RawRecord;
use crate::validate::{self, ValidationReport};
use crate::{TripID, VehicleID};

/// Faster than any bus. Readings above this are GPS noise.
const MAX_SPEED: f64 = 80.0;

/// Which service schedule a date runs on. The stop events API abbreviates
/// these to one letter, so both spellings decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceKey {
    #[serde(alias = "W")]
    Weekday,
    #[serde(alias = "S")]
    Saturday,
    #[serde(alias = "U")]
    Sunday,
}

impl ServiceKey {
    pub fn from_date(date: NaiveDate) -> ServiceKey {
        match date.weekday() {
            Weekday::Sat => ServiceKey::Saturday,
            Weekday::Sun => ServiceKey::Sunday,
            _ => ServiceKey::Weekday,
        }
    }
}

/// One row of the breadcrumb table.
#[derive(Clone, Debug, Serialize)]
pub struct Breadcrumb {
    #[serde(serialize_with = "serialize_tstamp")]
    pub tstamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub trip_id: TripID,
}

/// One row of the trip table. The feed doesn't carry route or direction, so
/// they get placeholder values until `enrich-trips` fills them in from a
/// stop event extract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: TripID,
    pub route_id: i64,
    pub vehicle_id: VehicleID,
    pub service_key: ServiceKey,
    pub direction: i64,
}

fn serialize_tstamp<S: Serializer>(t: &NaiveDateTime, ser: S) -> Result<S::Ok, S::Error> {
    ser.collect_str(&t.format("%Y-%m-%d %H:%M:%S"))
}

/// The whole preparation pipeline: sanity-check the raw feed, resolve
/// timestamps, derive speeds, drop implausible readings, and deduplicate into
/// the two tables. Breadcrumbs are unique per (tstamp, trip); trips are
/// unique per trip, keeping the first reading's vehicle and date.
pub fn prepare(records: Vec<RawRecord>) -> (Vec<Breadcrumb>, Vec<Trip>, ValidationReport) {
    let mut report = validate::check_records(&records);
    let mut readings = enrich::to_readings(records, &mut report);
    enrich::compute_speeds(&mut readings);

    let before = readings.len();
    readings.retain(|r| r.speed <= MAX_SPEED);
    report.dropped_over_speed = before - readings.len();

    let mut crumbs: BTreeMap<(NaiveDateTime, TripID), Breadcrumb> = BTreeMap::new();
    let mut trips: BTreeMap<TripID, Trip> = BTreeMap::new();
    for r in &readings {
        let key = (r.tstamp, r.trip);
        if crumbs.contains_key(&key) {
            report.dropped_duplicates += 1;
            continue;
        }
        crumbs.insert(
            key,
            Breadcrumb {
                tstamp: r.tstamp,
                latitude: r.latitude,
                longitude: r.longitude,
                speed: r.speed,
                trip_id: r.trip,
            },
        );
        trips.entry(r.trip).or_insert_with(|| Trip {
            trip_id: r.trip,
            route_id: -1,
            vehicle_id: r.vehicle,
            service_key: ServiceKey::from_date(r.tstamp.date()),
            direction: 0,
        });
    }

    info!(
        "prepared {} breadcrumbs across {} trips",
        crumbs.len(),
        trips.len()
    );
    report.log_summary();
    (
        crumbs.into_values().collect(),
        trips.into_values().collect(),
        report,
    )
}

const BREADCRUMB_HEADER: [&str; 5] = ["tstamp", "latitude", "longitude", "speed", "trip_id"];
const TRIP_HEADER: [&str; 5] = ["trip_id", "route_id", "vehicle_id", "service_key", "direction"];

/// Write the two tables as tab-separated files with a header row, ready for
/// the GeoJSON converter.
pub fn write_tables(out_dir: &Path, crumbs: &[Breadcrumb], trips: &[Trip]) -> Result<()> {
    fs_err::create_dir_all(out_dir)?;
    write_tsv(&out_dir.join("breadcrumbs.tsv"), &BREADCRUMB_HEADER, crumbs)?;
    write_trip_table(&out_dir.join("trips.tsv"), trips)?;
    Ok(())
}

pub fn write_trip_table(path: &Path, trips: &[Trip]) -> Result<()> {
    write_tsv(path, &TRIP_HEADER, trips)
}

/// Read a trip table back from disk, the inverse of `write_trip_table`.
pub fn read_trips(path: &Path) -> Result<Vec<Trip>> {
    let file = fs_err::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(file);
    let mut trips = Vec::new();
    for rec in rdr.deserialize() {
        trips.push(rec?);
    }
    Ok(trips)
}

// The header is written by hand so that an empty table still gets one.
fn write_tsv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let file = fs_err::File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(file);
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(trip: i64, act_time: i64, meters: f64) -> RawRecord {
        RawRecord {
            trip: Some(TripID(trip)),
            vehicle: Some(VehicleID(3909)),
            act_time: Some(act_time),
            opd_date: Some("06JUN2023:00:00:00".to_string()),
            meters: Some(meters),
            latitude: Some(45.51),
            longitude: Some(-122.65),
            ..RawRecord::default()
        }
    }

    #[test]
    fn service_keys() {
        let date = |d| NaiveDate::from_ymd_opt(2023, 6, d).unwrap();
        // June 6th, 2023 was a Tuesday
        assert_eq!(ServiceKey::from_date(date(6)), ServiceKey::Weekday);
        assert_eq!(ServiceKey::from_date(date(10)), ServiceKey::Saturday);
        assert_eq!(ServiceKey::from_date(date(11)), ServiceKey::Sunday);
    }

    #[test]
    fn duplicate_breadcrumbs_collapse() {
        let (crumbs, trips, report) =
            prepare(vec![raw(1, 100, 0.0), raw(1, 100, 0.0), raw(1, 110, 50.0)]);
        assert_eq!(crumbs.len(), 2);
        assert_eq!(trips.len(), 1);
        assert_eq!(report.dropped_duplicates, 1);
    }

    #[test]
    fn implausible_speeds_dropped() {
        // 10 km in 10 seconds; the first reading copies that speed, so the
        // whole trip goes
        let (crumbs, _, report) = prepare(vec![raw(1, 0, 0.0), raw(1, 10, 10_000.0)]);
        assert_eq!(crumbs.len(), 0);
        assert_eq!(report.dropped_over_speed, 2);
    }

    #[test]
    fn trip_defaults() {
        let (_, trips, _) = prepare(vec![raw(42, 36000, 100.0)]);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].trip_id, TripID(42));
        assert_eq!(trips[0].route_id, -1);
        assert_eq!(trips[0].vehicle_id, VehicleID(3909));
        assert_eq!(trips[0].service_key, ServiceKey::Weekday);
        assert_eq!(trips[0].direction, 0);
    }

    #[test]
    fn tables_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let (crumbs, trips, _) = prepare(vec![raw(1, 36000, 0.0), raw(1, 36010, 150.0)]);
        write_tables(dir.path(), &crumbs, &trips).unwrap();

        let crumbs_tsv = fs_err::read_to_string(dir.path().join("breadcrumbs.tsv")).unwrap();
        assert_eq!(
            crumbs_tsv,
            "tstamp\tlatitude\tlongitude\tspeed\ttrip_id\n\
             2023-06-06 10:00:00\t45.51\t-122.65\t15.0\t1\n\
             2023-06-06 10:00:10\t45.51\t-122.65\t15.0\t1\n"
        );

        let trips_tsv = fs_err::read_to_string(dir.path().join("trips.tsv")).unwrap();
        assert_eq!(
            trips_tsv,
            "trip_id\troute_id\tvehicle_id\tservice_key\tdirection\n\
             1\t-1\t3909\tWeekday\t0\n"
        );
    }

    #[test]
    fn trip_table_reads_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let (_, trips, _) = prepare(vec![raw(1, 36000, 0.0), raw(2, 40000, 0.0)]);
        write_tables(dir.path(), &[], &trips).unwrap();
        assert_eq!(read_trips(&dir.path().join("trips.tsv")).unwrap(), trips);
    }

    #[test]
    fn empty_tables_still_get_headers() {
        let dir = tempfile::TempDir::new().unwrap();
        write_tables(dir.path(), &[], &[]).unwrap();
        let crumbs_tsv = fs_err::read_to_string(dir.path().join("breadcrumbs.tsv")).unwrap();
        assert_eq!(crumbs_tsv, "tstamp\tlatitude\tlongitude\tspeed\ttrip_id\n");
    }
}
