// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::{DataError, DataResult};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetId(String);
impl DatasetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn from_string(id: String) -> Self {
        Self(id)
    }
}
impl Default for DatasetId {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub id: DatasetId,
    pub name: String,
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
    pub source_path: Option<std::path::PathBuf>,
}

/// One historical test detonation. `average_yield` is derived from the two
/// yield estimates and stays `None` when either bound is missing; it is never
/// backfilled with a default during aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetonationRecord {
    pub name: Option<String>,
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub yield_lower: Option<f64>,
    pub yield_upper: Option<f64>,
    pub average_yield: Option<f64>,
    pub body_magnitude: f64,
    pub surface_magnitude: f64,
    pub depth: f64,
    pub purpose: String,
    pub deployment_type: String,
    pub deployment_location: String,
    pub source_country: String,
    pub reporting_source: Option<String>,
}
impl DetonationRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<DetonationRecord>,
    pub metadata: DatasetMetadata,
}
impl Dataset {
    pub fn new(name: String, records: Vec<DetonationRecord>) -> Self {
        let metadata = DatasetMetadata {
            id: DatasetId::new(),
            name,
            row_count: records.len(),
            created_at: Utc::now(),
            source_path: None,
        };
        Self { records, metadata }
    }
    pub fn empty() -> Self {
        Self::new("empty".to_string(), Vec::new())
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    pub fn records(&self) -> &[DetonationRecord] {
        &self.records
    }
    pub fn extents(&self) -> DatasetExtents {
        DatasetExtents::from_records(&self.records)
    }
    /// Distinct values of a categorical field, sorted, for seeding the
    /// membership filters.
    pub fn distinct<F>(&self, field: F) -> Vec<String>
    where
        F: Fn(&DetonationRecord) -> Option<&str>,
    {
        let mut values: Vec<String> = self
            .records
            .iter()
            .filter_map(|r| field(r).map(str::to_string))
            .collect();
        values.sort();
        values.dedup();
        values
    }
}

/// Observed per-field ranges, computed over present values only. `None` when
/// the dataset holds no value for the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetExtents {
    pub years: Option<(i32, i32)>,
    pub average_yield: Option<(f64, f64)>,
    pub body_magnitude: Option<(f64, f64)>,
    pub surface_magnitude: Option<(f64, f64)>,
    pub depth: Option<(f64, f64)>,
    pub latitude: Option<(f64, f64)>,
}
impl DatasetExtents {
    fn from_records(records: &[DetonationRecord]) -> Self {
        fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
            values.fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
        }
        let years = records
            .iter()
            .map(|r| r.year())
            .fold(None, |acc: Option<(i32, i32)>, y| match acc {
                None => Some((y, y)),
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
            });
        Self {
            years,
            average_yield: span(records.iter().filter_map(|r| r.average_yield)),
            body_magnitude: span(records.iter().map(|r| r.body_magnitude)),
            surface_magnitude: span(records.iter().map(|r| r.surface_magnitude)),
            depth: span(records.iter().map(|r| r.depth)),
            latitude: span(records.iter().map(|r| r.latitude)),
        }
    }
}

/// Raw row in the source file's column schema. The odd header spellings
/// ("Cordinates") are the dataset's own.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Date.Year")]
    year: i32,
    #[serde(rename = "Date.Month")]
    month: u32,
    #[serde(rename = "Date.Day")]
    day: u32,
    #[serde(rename = "Location.Cordinates.Latitude")]
    latitude: f64,
    #[serde(rename = "Location.Cordinates.Longitude")]
    longitude: f64,
    #[serde(rename = "Data.Yield.Lower")]
    yield_lower: Option<f64>,
    #[serde(rename = "Data.Yield.Upper")]
    yield_upper: Option<f64>,
    #[serde(rename = "Data.Magnitude.Body")]
    body_magnitude: f64,
    #[serde(rename = "Data.Magnitude.Surface")]
    surface_magnitude: f64,
    #[serde(rename = "Location.Cordinates.Depth")]
    depth: f64,
    #[serde(rename = "Data.Purpose")]
    purpose: String,
    #[serde(rename = "Data.Type")]
    deployment_type: String,
    #[serde(rename = "WEAPON DEPLOYMENT LOCATION")]
    deployment_location: String,
    #[serde(rename = "WEAPON SOURCE COUNTRY")]
    source_country: String,
    #[serde(rename = "Data.Source")]
    reporting_source: Option<String>,
    #[serde(rename = "Data.Name")]
    name: Option<String>,
}
impl RawRow {
    fn into_record(self, row: usize) -> DataResult<DetonationRecord> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or(
            DataError::InvalidDate {
                row,
                year: self.year,
                month: self.month,
                day: self.day,
            },
        )?;
        let average_yield = match (self.yield_lower, self.yield_upper) {
            (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
            _ => None,
        };
        Ok(DetonationRecord {
            name: normalise_name(self.name),
            date,
            latitude: self.latitude,
            longitude: self.longitude,
            yield_lower: self.yield_lower,
            yield_upper: self.yield_upper,
            average_yield,
            body_magnitude: self.body_magnitude,
            surface_magnitude: self.surface_magnitude,
            depth: self.depth,
            purpose: self.purpose,
            deployment_type: self.deployment_type,
            deployment_location: self.deployment_location,
            source_country: self.source_country,
            reporting_source: normalise_name(self.reporting_source),
        })
    }
}

// The source file writes the literal string "Nan" where a test has no name.
fn normalise_name(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty() && !s.trim().eq_ignore_ascii_case("nan"))
}

#[derive(Debug)]
pub struct CsvLoader {
    delimiter: u8,
    dataset_name: String,
}
impl CsvLoader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            dataset_name: "detonations".to_string(),
        }
    }
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
    pub fn with_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = name.into();
        self
    }
    pub fn load(&self, path: &Path) -> DataResult<Dataset> {
        let file = std::fs::File::open(path).map_err(|source| DataError::DatasetFileError {
            path: path.display().to_string(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(file);
        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<RawRow>().enumerate() {
            let raw = row.map_err(|source| DataError::CsvError {
                path: path.display().to_string(),
                source,
            })?;
            records.push(raw.into_record(index + 1)?);
        }
        log::info!(
            "loaded {} detonation records from {}",
            records.len(),
            path.display()
        );
        let mut dataset = Dataset::new(self.dataset_name.clone(), records);
        dataset.metadata.source_path = Some(path.to_path_buf());
        Ok(dataset)
    }
}
impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(year: i32, yields: Option<(f64, f64)>) -> DetonationRecord {
        DetonationRecord {
            name: None,
            date: NaiveDate::from_ymd_opt(year, 7, 16).unwrap(),
            latitude: 33.677,
            longitude: -106.475,
            yield_lower: yields.map(|(lo, _)| lo),
            yield_upper: yields.map(|(_, hi)| hi),
            average_yield: yields.map(|(lo, hi)| (lo + hi) / 2.0),
            body_magnitude: 0.0,
            surface_magnitude: 0.0,
            depth: -0.1,
            purpose: "Wr".to_string(),
            deployment_type: "Tower".to_string(),
            deployment_location: "Alamogordo".to_string(),
            source_country: "USA".to_string(),
            reporting_source: Some("DOE".to_string()),
        }
    }

    const SAMPLE: &str = "\
WEAPON SOURCE COUNTRY,WEAPON DEPLOYMENT LOCATION,Data.Source,Location.Cordinates.Latitude,Location.Cordinates.Longitude,Location.Cordinates.Depth,Data.Magnitude.Body,Data.Magnitude.Surface,Data.Yield.Lower,Data.Yield.Upper,Data.Purpose,Data.Name,Data.Type,Date.Day,Date.Month,Date.Year
USA,Alamogordo,DOE,32.54,-105.57,-0.1,0.0,0.0,19.0,21.0,Wr,Trinity,Tower,16,7,1945
USSR,Semi Kazakh,MIC,50.0,78.0,0.0,0.0,0.0,,,We,Nan,Atmosph,29,8,1949
";

    fn write_sample(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_derives_date_and_average_yield() {
        let file = write_sample(SAMPLE);
        let dataset = CsvLoader::new().load(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        let trinity = &dataset.records()[0];
        assert_eq!(trinity.date, NaiveDate::from_ymd_opt(1945, 7, 16).unwrap());
        assert_eq!(trinity.average_yield, Some(20.0));
        assert_eq!(trinity.name.as_deref(), Some("Trinity"));
    }

    #[test]
    fn test_missing_yield_bound_keeps_average_undefined() {
        let file = write_sample(SAMPLE);
        let dataset = CsvLoader::new().load(file.path()).unwrap();
        let second = &dataset.records()[1];
        assert_eq!(second.yield_lower, None);
        assert_eq!(second.average_yield, None);
        // "Nan" is the file's spelling of "unnamed".
        assert_eq!(second.name, None);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = CsvLoader::new()
            .load(Path::new("/nonexistent/detonations.csv"))
            .unwrap_err();
        assert!(matches!(err, DataError::DatasetFileError { .. }));
        assert!(err.to_string().contains("/nonexistent/detonations.csv"));
    }

    #[test]
    fn test_invalid_calendar_date_names_row() {
        let bad = SAMPLE.replace("16,7,1945", "31,2,1945");
        let file = write_sample(&bad);
        let err = CsvLoader::new().load(file.path()).unwrap_err();
        match err {
            DataError::InvalidDate { row, month, .. } => {
                assert_eq!(row, 1);
                assert_eq!(month, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extents_skip_missing_yields() {
        let dataset = Dataset::new(
            "t".to_string(),
            vec![
                record(1945, Some((19.0, 21.0))),
                record(1950, None),
                record(1957, Some((9.0, 11.0))),
            ],
        );
        let extents = dataset.extents();
        assert_eq!(extents.years, Some((1945, 1957)));
        assert_eq!(extents.average_yield, Some((10.0, 20.0)));
    }

    #[test]
    fn test_empty_dataset_has_no_extents() {
        let extents = Dataset::empty().extents();
        assert_eq!(extents, DatasetExtents::default());
    }
}
