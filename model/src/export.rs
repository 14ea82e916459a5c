use std::path::Path;

use anyhow::Result;
use geojson::{Feature, FeatureCollection, GeoJson};

use crate::error::ConvertError;
use crate::extract::{self, Extract};
use crate::value::Value;

#[derive(Debug)]
pub struct ConvertSummary {
    pub features: usize,
    /// Malformed rows plus rows whose coordinates didn't parse as finite
    /// numbers. Never part of the output.
    pub skipped_rows: usize,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub converted: usize,
    pub failed: usize,
}

/// Convert one tab-separated extract into a GeoJSON FeatureCollection file.
/// Fatal problems (unreadable input, no coordinate columns) abort before
/// anything is written.
pub fn convert(input: &str, output: &str) -> Result<ConvertSummary> {
    let file = fs_err::File::open(input).map_err(ConvertError::Unreadable)?;
    let extract = extract::load(file)?;
    let (collection, bad_coordinates) = feature_collection(&extract)?;

    let features = collection.features.len();
    let skipped_rows = extract.skipped_rows + bad_coordinates;

    let gj = GeoJson::FeatureCollection(collection);
    fs_err::write(output, serde_json::to_string_pretty(&gj)?)?;

    info!(
        "{}: {} features written to {}, {} rows skipped",
        input, features, output, skipped_rows
    );
    Ok(ConvertSummary {
        features,
        skipped_rows,
    })
}

/// Convert every .tsv in a directory, in name order, to a .geojson with the
/// same stem. One broken extract doesn't stop the others.
pub fn convert_dir(input_dir: &str, output_dir: &str) -> Result<BatchSummary> {
    let mut inputs: Vec<String> = Vec::new();
    for entry in fs_err::read_dir(input_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|x| x.to_str()) == Some("tsv") {
            inputs.push(path.to_string_lossy().to_string());
        }
    }
    inputs.sort();
    if inputs.is_empty() {
        bail!("no .tsv extracts in {}", input_dir);
    }

    fs_err::create_dir_all(output_dir)?;

    let mut summary = BatchSummary::default();
    for input in inputs {
        let stem = match Path::new(&input).file_stem().and_then(|x| x.to_str()) {
            Some(x) => x.to_string(),
            None => continue,
        };
        let output = Path::new(output_dir)
            .join(format!("{stem}.geojson"))
            .to_string_lossy()
            .to_string();
        match convert(&input, &output) {
            Ok(_) => {
                summary.converted += 1;
            }
            Err(err) => {
                error!("{}: {}", input, err);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// Turn every well-formed row into a Point feature. Also returns how many
/// rows were dropped for coordinates that didn't parse as finite numbers.
pub fn feature_collection(extract: &Extract) -> Result<(FeatureCollection, usize)> {
    let (lon_idx, lat_idx) = coordinate_columns(&extract.columns)?;

    let mut features = Vec::new();
    let mut bad_coordinates = 0;
    for row in &extract.rows {
        let lon = Value::parse(&row[lon_idx]).as_finite_f64();
        let lat = Value::parse(&row[lat_idx]).as_finite_f64();
        let (lon, lat) = match (lon, lat) {
            (Some(lon), Some(lat)) => (lon, lat),
            _ => {
                warn!(
                    "Skipping row with unusable coordinates ({:?}, {:?})",
                    &row[lon_idx], &row[lat_idx]
                );
                bad_coordinates += 1;
                continue;
            }
        };

        let mut feature = Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
                lon, lat,
            ]))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        for (idx, field) in row.iter().enumerate() {
            if idx == lon_idx || idx == lat_idx {
                continue;
            }
            feature.set_property(extract.columns[idx].clone(), Value::parse(field));
        }
        features.push(feature);
    }

    Ok((
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        },
        bad_coordinates,
    ))
}

/// Find the (longitude, latitude) column indices. Matching is
/// case-insensitive; x/y is the query layer's other spelling for the same
/// pair.
fn coordinate_columns(columns: &[String]) -> Result<(usize, usize), ConvertError> {
    let find = |name: &str| columns.iter().position(|x| x.eq_ignore_ascii_case(name));

    match (find("longitude"), find("latitude")) {
        (Some(lon), Some(lat)) => Ok((lon, lat)),
        (Some(_), None) => Err(ConvertError::MissingColumn("latitude")),
        (None, Some(_)) => Err(ConvertError::MissingColumn("longitude")),
        (None, None) => match (find("x"), find("y")) {
            (Some(lon), Some(lat)) => Ok((lon, lat)),
            _ => Err(ConvertError::MissingColumn("longitude")),
        },
    }
}
