use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::feed::RawRecord;
use crate::validate::ValidationReport;
use crate::{TripID, VehicleID};

/// A cleaned breadcrumb: required fields present, GPS fix known, wall-clock
/// timestamp resolved. Speed starts at 0 until `compute_speeds` fills it in.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub trip: TripID,
    pub vehicle: VehicleID,
    pub tstamp: NaiveDateTime,
    pub act_time: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub meters: f64,
    pub speed: f64,
}

/// Turn raw records into readings, dropping what can't be used: records
/// missing trip/vehicle/time/date/odometer, records with no GPS fix, records
/// whose date won't parse. Every drop is counted in the report. Input order
/// is preserved.
pub fn to_readings(records: Vec<RawRecord>, report: &mut ValidationReport) -> Vec<Reading> {
    let mut readings = Vec::new();
    for rec in records {
        let (trip, vehicle, act_time, opd_date, meters) = match (
            rec.trip,
            rec.vehicle,
            rec.act_time,
            rec.opd_date,
            rec.meters,
        ) {
            (Some(t), Some(v), Some(a), Some(d), Some(m)) => (t, v, a, d, m),
            _ => {
                report.dropped_missing_fields += 1;
                continue;
            }
        };
        let (latitude, longitude) = match (rec.latitude, rec.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                report.dropped_missing_gps += 1;
                continue;
            }
        };
        let tstamp = match timestamp(&opd_date, act_time) {
            Some(t) => t,
            None => {
                report.dropped_bad_dates += 1;
                continue;
            }
        };
        readings.push(Reading {
            trip,
            vehicle,
            tstamp,
            act_time,
            latitude,
            longitude,
            meters,
            speed: 0.0,
        });
    }
    readings
}

/// OPD_DATE looks like "06JUN2023:00:00:00", but only the date part means
/// anything; ACT_TIME carries the time as seconds past midnight, running past
/// 86400 for service after midnight.
fn timestamp(opd_date: &str, act_time: i64) -> Option<NaiveDateTime> {
    let date_part = opd_date.split(':').next()?;
    let date = NaiveDate::parse_from_str(date_part, "%d%b%Y").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    // try_seconds: an ACT_TIME wild enough to overflow Duration is a bad
    // date, not a crash
    midnight.checked_add_signed(Duration::try_seconds(act_time)?)
}

/// Speed is odometer distance over elapsed time between consecutive readings
/// of the same trip, ordered by ACT_TIME. The first reading of a trip copies
/// the second's speed; a zero or backwards time step means speed 0. Trips
/// with a single reading keep 0.
pub fn compute_speeds(readings: &mut [Reading]) {
    let mut per_trip: BTreeMap<TripID, Vec<usize>> = BTreeMap::new();
    for (idx, r) in readings.iter().enumerate() {
        per_trip.entry(r.trip).or_insert_with(Vec::new).push(idx);
    }
    for indices in per_trip.values_mut() {
        indices.sort_by_key(|&i| readings[i].act_time);
        for i in 1..indices.len() {
            let prev = indices[i - 1];
            let cur = indices[i];
            let dt = readings[cur].act_time - readings[prev].act_time;
            readings[cur].speed = if dt <= 0 {
                0.0
            } else {
                (readings[cur].meters - readings[prev].meters) / dt as f64
            };
        }
        if indices.len() >= 2 {
            readings[indices[0]].speed = readings[indices[1]].speed;
        }
    }
}
