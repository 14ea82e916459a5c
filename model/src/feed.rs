use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{TripID, VehicleID};

/// One raw breadcrumb as the bus API publishes it, upstream column names
/// and all. Everything is optional; the validation pass decides what a
/// record is missing and what that costs it.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "EVENT_NO_TRIP")]
    pub trip: Option<TripID>,
    #[serde(rename = "EVENT_NO_STOP")]
    pub stop_event: Option<i64>,
    /// Like "06JUN2023:00:00:00". Only the date part means anything; the
    /// time of day lives in ACT_TIME.
    #[serde(rename = "OPD_DATE")]
    pub opd_date: Option<String>,
    #[serde(rename = "VEHICLE_ID")]
    pub vehicle: Option<VehicleID>,
    #[serde(rename = "METERS")]
    pub meters: Option<f64>,
    /// Seconds past midnight. Runs past 86400 for service after midnight.
    #[serde(rename = "ACT_TIME")]
    pub act_time: Option<i64>,
    #[serde(rename = "GPS_LONGITUDE")]
    pub longitude: Option<f64>,
    #[serde(rename = "GPS_LATITUDE")]
    pub latitude: Option<f64>,
    #[serde(rename = "GPS_SATELLITES")]
    pub satellites: Option<u32>,
    #[serde(rename = "GPS_HDOP")]
    pub hdop: Option<f64>,
}

/// Read raw records from JSON files, each an array of records as fetched
/// per vehicle from the API. Records that don't decode are counted, not
/// fatal; a file that isn't JSON at all is.
pub fn load_files(paths: &[String]) -> Result<(Vec<RawRecord>, usize)> {
    let mut records = Vec::new();
    let mut undecodable = 0;
    for path in paths {
        let raw = fs_err::read_to_string(path)?;
        let values: Vec<serde_json::Value> =
            serde_json::from_str(&raw).with_context(|| format!("{path} isn't a JSON array"))?;
        for value in values {
            match serde_json::from_value::<RawRecord>(value) {
                Ok(rec) => records.push(rec),
                Err(err) => {
                    warn!("{}: skipping undecodable record: {}", path, err);
                    undecodable += 1;
                }
            }
        }
        info!("{}: {} records so far", path, records.len());
    }
    Ok((records, undecodable))
}
