use std::collections::{BTreeMap, BTreeSet};

use crate::feed::RawRecord;
use crate::{TripID, VehicleID};

/// What the sanity checks found, plus how many records each cleaning stage
/// dropped. None of these are fatal; the report gets logged and preparation
/// carries on with whatever survives.
#[derive(Debug, Default, PartialEq)]
pub struct ValidationReport {
    pub missing_required: usize,
    pub act_time_out_of_range: usize,
    pub negative_meters: usize,
    pub bad_hdop: usize,
    pub zero_coordinates: usize,
    pub nonmonotonic_trips: usize,
    pub multi_vehicle_trips: usize,
    pub skewed_act_time: bool,
    pub trip_transition_mismatch: bool,

    pub dropped_missing_fields: usize,
    pub dropped_missing_gps: usize,
    pub dropped_bad_dates: usize,
    pub dropped_over_speed: usize,
    pub dropped_duplicates: usize,
}

impl ValidationReport {
    pub fn log_summary(&self) {
        if self.missing_required > 0 {
            warn!(
                "{} records missing a required field (trip, vehicle, time, or date)",
                self.missing_required
            );
        }
        if self.act_time_out_of_range > 0 {
            warn!(
                "{} records with ACT_TIME outside the service day",
                self.act_time_out_of_range
            );
        }
        if self.negative_meters > 0 {
            warn!("{} records with negative METERS", self.negative_meters);
        }
        if self.bad_hdop > 0 {
            warn!("{} records with non-positive GPS_HDOP", self.bad_hdop);
        }
        if self.zero_coordinates > 0 {
            warn!(
                "{} records at exactly (0, 0); GPS was probably asleep",
                self.zero_coordinates
            );
        }
        if self.nonmonotonic_trips > 0 {
            warn!(
                "{} trips where the odometer runs backwards",
                self.nonmonotonic_trips
            );
        }
        if self.multi_vehicle_trips > 0 {
            warn!(
                "{} trips claimed by more than one vehicle",
                self.multi_vehicle_trips
            );
        }
        if self.skewed_act_time {
            warn!("ACT_TIME isn't roughly uniform over the day; check the feed");
        }
        if self.trip_transition_mismatch {
            warn!("trip transitions don't match the distinct trip count; records arrived interleaved");
        }
        let dropped = self.dropped_missing_fields
            + self.dropped_missing_gps
            + self.dropped_bad_dates
            + self.dropped_over_speed
            + self.dropped_duplicates;
        if dropped > 0 {
            info!(
                "dropped {} records ({} missing fields, {} missing GPS, {} bad dates, {} over the speed limit, {} duplicates)",
                dropped,
                self.dropped_missing_fields,
                self.dropped_missing_gps,
                self.dropped_bad_dates,
                self.dropped_over_speed,
                self.dropped_duplicates
            );
        }
    }
}

/// Run every sanity check over the raw feed and tally what's wrong with it.
pub fn check_records(records: &[RawRecord]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for rec in records {
        if rec.trip.is_none()
            || rec.vehicle.is_none()
            || rec.act_time.is_none()
            || rec.opd_date.is_none()
        {
            report.missing_required += 1;
        }
        if let Some(t) = rec.act_time {
            // Service days run past midnight, to 3 AM
            if !(0..=97200).contains(&t) {
                report.act_time_out_of_range += 1;
            }
        }
        if let Some(m) = rec.meters {
            if m < 0.0 {
                report.negative_meters += 1;
            }
        }
        if let Some(h) = rec.hdop {
            if h <= 0.0 {
                report.bad_hdop += 1;
            }
        }
        if rec.latitude == Some(0.0) && rec.longitude == Some(0.0) {
            report.zero_coordinates += 1;
        }
    }

    report.nonmonotonic_trips = count_nonmonotonic_trips(records);
    report.multi_vehicle_trips = count_multi_vehicle_trips(records);
    report.skewed_act_time = act_time_is_skewed(records);
    report.trip_transition_mismatch = trip_transitions_mismatch(records);
    report
}

/// Trips where METERS decreases between consecutive readings, ordered by
/// ACT_TIME. The odometer should only count up within a trip.
fn count_nonmonotonic_trips(records: &[RawRecord]) -> usize {
    let mut per_trip: BTreeMap<TripID, Vec<(i64, f64)>> = BTreeMap::new();
    for rec in records {
        if let (Some(trip), Some(t), Some(m)) = (rec.trip, rec.act_time, rec.meters) {
            per_trip.entry(trip).or_insert_with(Vec::new).push((t, m));
        }
    }
    let mut violations = 0;
    for readings in per_trip.values_mut() {
        readings.sort_by_key(|(t, _)| *t);
        if readings.windows(2).any(|pair| pair[1].1 < pair[0].1) {
            violations += 1;
        }
    }
    violations
}

fn count_multi_vehicle_trips(records: &[RawRecord]) -> usize {
    let mut per_trip: BTreeMap<TripID, BTreeSet<VehicleID>> = BTreeMap::new();
    for rec in records {
        if let (Some(trip), Some(vehicle)) = (rec.trip, rec.vehicle) {
            per_trip.entry(trip).or_insert_with(BTreeSet::new).insert(vehicle);
        }
    }
    per_trip.values().filter(|vehicles| vehicles.len() > 1).count()
}

/// Bin ACT_TIME into 24 one-hour buckets and compare the spread to the mean.
/// A healthy day of service covers most hours; a big standard deviation means
/// the feed only captured part of the day.
fn act_time_is_skewed(records: &[RawRecord]) -> bool {
    let mut bins = [0usize; 24];
    for rec in records {
        if let Some(t) = rec.act_time {
            if (0..86400).contains(&t) {
                bins[(t / 3600) as usize] += 1;
            }
        }
    }
    let total: usize = bins.iter().sum();
    if total == 0 {
        return false;
    }
    let mean = total as f64 / 24.0;
    let variance = bins
        .iter()
        .map(|&b| {
            let diff = b as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / 24.0;
    variance.sqrt() > 0.2 * mean
}

/// When records arrive grouped by vehicle fetch, each trip shows up as one
/// contiguous run, so the number of transitions equals the number of distinct
/// trips. A mismatch means the feed interleaved or repeated trip blocks.
fn trip_transitions_mismatch(records: &[RawRecord]) -> bool {
    let mut transitions = 0;
    let mut prev: Option<TripID> = None;
    let mut distinct = BTreeSet::new();
    for rec in records {
        if let Some(trip) = rec.trip {
            if prev != Some(trip) {
                transitions += 1;
                prev = Some(trip);
            }
            distinct.insert(trip);
        }
    }
    transitions != distinct.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(trip: i64, act_time: i64) -> RawRecord {
        RawRecord {
            trip: Some(TripID(trip)),
            vehicle: Some(VehicleID(99)),
            act_time: Some(act_time),
            opd_date: Some("06JUN2023:00:00:00".to_string()),
            meters: Some(0.0),
            latitude: Some(45.5),
            longitude: Some(-122.6),
            hdop: Some(0.8),
            ..RawRecord::default()
        }
    }

    #[test]
    fn field_level_checks() {
        let mut missing = rec(1, 100);
        missing.vehicle = None;
        let mut late = rec(1, 200);
        late.act_time = Some(100_000);
        let mut backwards = rec(1, 300);
        backwards.meters = Some(-5.0);
        let mut fuzzy = rec(1, 400);
        fuzzy.hdop = Some(0.0);
        let mut null_island = rec(1, 500);
        null_island.latitude = Some(0.0);
        null_island.longitude = Some(0.0);

        let report = check_records(&[missing, late, backwards, fuzzy, null_island]);
        assert_eq!(report.missing_required, 1);
        assert_eq!(report.act_time_out_of_range, 1);
        assert_eq!(report.negative_meters, 1);
        assert_eq!(report.bad_hdop, 1);
        assert_eq!(report.zero_coordinates, 1);
    }

    #[test]
    fn only_both_zero_coordinates_count() {
        let mut equator = rec(1, 100);
        equator.latitude = Some(0.0);
        let report = check_records(&[equator]);
        assert_eq!(report.zero_coordinates, 0);
    }

    #[test]
    fn odometer_must_not_run_backwards() {
        let mut a = rec(7, 100);
        a.meters = Some(50.0);
        let mut b = rec(7, 200);
        b.meters = Some(40.0);
        // Sorted by ACT_TIME, not input order
        let mut c = rec(8, 300);
        c.meters = Some(10.0);
        let mut d = rec(8, 250);
        d.meters = Some(5.0);

        let report = check_records(&[a, b, c, d]);
        assert_eq!(report.nonmonotonic_trips, 1);
    }

    #[test]
    fn one_vehicle_per_trip() {
        let a = rec(7, 100);
        let mut b = rec(7, 200);
        b.vehicle = Some(VehicleID(123));
        let report = check_records(&[a, b, rec(8, 300)]);
        assert_eq!(report.multi_vehicle_trips, 1);
    }

    #[test]
    fn act_time_skew() {
        // One record per hour: perfectly uniform
        let uniform: Vec<RawRecord> = (0..24).map(|h| rec(1, h * 3600)).collect();
        assert!(!check_records(&uniform).skewed_act_time);

        // Everything crammed into one hour
        let crammed: Vec<RawRecord> = (0..24).map(|i| rec(1, 30_000 + i)).collect();
        assert!(check_records(&crammed).skewed_act_time);
    }

    #[test]
    fn trip_transitions() {
        // Contiguous runs: 1,1,2 has two transitions, two distinct trips
        let ok = vec![rec(1, 100), rec(1, 200), rec(2, 300)];
        assert!(!check_records(&ok).trip_transition_mismatch);

        // Trip 1 shows up again after trip 2: three transitions, two trips
        let interleaved = vec![rec(1, 100), rec(2, 200), rec(1, 300)];
        assert!(check_records(&interleaved).trip_transition_mismatch);
    }
}
