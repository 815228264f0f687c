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

use crate::dataset::{Dataset, DetonationRecord};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Inclusive [low, high] constraint. A missing field value always fails the
/// constraint; it is never treated as in-range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosedRange<T> {
    pub low: T,
    pub high: T,
}
impl<T: PartialOrd + Copy> ClosedRange<T> {
    pub fn new(low: T, high: T) -> Self {
        Self { low, high }
    }
    pub fn contains(&self, value: T) -> bool {
        self.low <= value && value <= self.high
    }
    pub fn contains_opt(&self, value: Option<T>) -> bool {
        value.is_some_and(|v| self.contains(v))
    }
}
impl ClosedRange<NaiveDate> {
    /// Full-year window: Jan 1 of `first` through Dec 31 of `last`.
    pub fn year_window(first: i32, last: i32) -> Self {
        Self {
            low: NaiveDate::from_ymd_opt(first, 1, 1).unwrap_or(NaiveDate::MIN),
            high: NaiveDate::from_ymd_opt(last, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

/// Set-membership constraint on a categorical field. An empty selection
/// matches zero records, not all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    values: HashSet<String>,
}
impl Membership {
    pub fn of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
    pub fn none() -> Self {
        Self::default()
    }
    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }
    pub fn contains_opt(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.contains(v))
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn insert(&mut self, value: impl Into<String>) {
        self.values.insert(value.into());
    }
    pub fn remove(&mut self, value: &str) {
        self.values.remove(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    All,
    Northern,
    Southern,
}
impl Hemisphere {
    pub fn latitude_band(&self) -> ClosedRange<f64> {
        match self {
            Hemisphere::Northern => ClosedRange::new(0.0, 90.0),
            Hemisphere::Southern => ClosedRange::new(-90.0, 0.0),
            Hemisphere::All => ClosedRange::new(-90.0, 90.0),
        }
    }
    pub fn label(&self) -> &'static str {
        match self {
            Hemisphere::All => "All",
            Hemisphere::Northern => "Northern",
            Hemisphere::Southern => "Southern",
        }
    }
    pub const ALL: [Hemisphere; 3] = [Hemisphere::All, Hemisphere::Northern, Hemisphere::Southern];
}

/// One independent constraint per dataset field, combined by logical AND.
/// There are no cross-field constraints and no negation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub date: ClosedRange<NaiveDate>,
    pub latitude: ClosedRange<f64>,
    pub deployment_locations: Membership,
    pub source_countries: Membership,
    pub average_yield: ClosedRange<f64>,
    pub body_magnitude: ClosedRange<f64>,
    pub surface_magnitude: ClosedRange<f64>,
    pub deployment_types: Membership,
    pub depth: ClosedRange<f64>,
    pub purposes: Membership,
    pub reporting_sources: Membership,
}
impl FilterCriteria {
    /// Criteria seeded from the dataset's own extents and distinct values,
    /// i.e. the widest selection the filter widgets start from. Note that a
    /// record whose average yield is missing still fails the yield range.
    pub fn matching_all(dataset: &Dataset) -> Self {
        let extents = dataset.extents();
        let range = |span: Option<(f64, f64)>| {
            let (low, high) = span.unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
            ClosedRange::new(low, high)
        };
        let date = match extents.years {
            Some((first, last)) => ClosedRange::year_window(first, last),
            None => ClosedRange::new(NaiveDate::MIN, NaiveDate::MAX),
        };
        Self {
            date,
            latitude: Hemisphere::All.latitude_band(),
            deployment_locations: Membership::of(
                dataset.distinct(|r| Some(r.deployment_location.as_str())),
            ),
            source_countries: Membership::of(dataset.distinct(|r| Some(r.source_country.as_str()))),
            average_yield: range(extents.average_yield),
            body_magnitude: range(extents.body_magnitude),
            surface_magnitude: range(extents.surface_magnitude),
            deployment_types: Membership::of(dataset.distinct(|r| Some(r.deployment_type.as_str()))),
            depth: range(extents.depth),
            purposes: Membership::of(dataset.distinct(|r| Some(r.purpose.as_str()))),
            reporting_sources: Membership::of(
                dataset.distinct(|r| r.reporting_source.as_deref()),
            ),
        }
    }
    pub fn matches(&self, record: &DetonationRecord) -> bool {
        self.date.contains(record.date)
            && self.latitude.contains(record.latitude)
            && self.deployment_locations.contains(&record.deployment_location)
            && self.source_countries.contains(&record.source_country)
            && self.average_yield.contains_opt(record.average_yield)
            && self.body_magnitude.contains(record.body_magnitude)
            && self.surface_magnitude.contains(record.surface_magnitude)
            && self.deployment_types.contains(&record.deployment_type)
            && self.depth.contains(record.depth)
            && self.purposes.contains(&record.purpose)
            && self
                .reporting_sources
                .contains_opt(record.reporting_source.as_deref())
    }
    /// The reduced record collection. The dataset is read-only after load, so
    /// the scan parallelises over rows.
    pub fn apply<'a>(&self, dataset: &'a Dataset) -> Vec<&'a DetonationRecord> {
        dataset
            .records()
            .par_iter()
            .filter(|record| self.matches(record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, country: &str) -> DetonationRecord {
        DetonationRecord {
            name: None,
            date: NaiveDate::from_ymd_opt(year, 6, 1).unwrap(),
            latitude: 37.1,
            longitude: -116.0,
            yield_lower: Some(10.0),
            yield_upper: Some(30.0),
            average_yield: Some(20.0),
            body_magnitude: 4.5,
            surface_magnitude: 3.2,
            depth: 0.3,
            purpose: "Wr".to_string(),
            deployment_type: "Shaft".to_string(),
            deployment_location: "Nevada Ts".to_string(),
            source_country: country.to_string(),
            reporting_source: Some("DOE".to_string()),
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            "t".to_string(),
            vec![
                record(1955, "USA"),
                record(1955, "USSR"),
                record(1965, "USA"),
            ],
        )
    }

    #[test]
    fn test_conjunction_of_year_window_and_country() {
        let ds = dataset();
        let mut criteria = FilterCriteria::matching_all(&ds);
        criteria.date = ClosedRange::year_window(1950, 1960);
        criteria.source_countries = Membership::of(["USA"]);
        let reduced = criteria.apply(&ds);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].year(), 1955);
        assert_eq!(reduced[0].source_country, "USA");
    }

    #[test]
    fn test_empty_membership_matches_nothing() {
        let ds = dataset();
        let mut criteria = FilterCriteria::matching_all(&ds);
        criteria.purposes = Membership::none();
        assert!(criteria.apply(&ds).is_empty());
    }

    #[test]
    fn test_range_endpoints_are_inclusive() {
        let range = ClosedRange::new(1.5, 2.5);
        assert!(range.contains(1.5));
        assert!(range.contains(2.5));
        assert!(!range.contains(2.5000001));
    }

    #[test]
    fn test_missing_average_yield_fails_the_range() {
        let ds = dataset();
        let criteria = FilterCriteria::matching_all(&ds);
        let mut unmeasured = record(1955, "USA");
        unmeasured.yield_upper = None;
        unmeasured.average_yield = None;
        assert!(!criteria.matches(&unmeasured));
    }

    #[test]
    fn test_hemisphere_latitude_bands() {
        assert!(Hemisphere::Northern.latitude_band().contains(0.0));
        assert!(!Hemisphere::Northern.latitude_band().contains(-0.1));
        assert!(Hemisphere::Southern.latitude_band().contains(-89.9));
        assert!(Hemisphere::All.latitude_band().contains(-89.9));
    }

    #[test]
    fn test_matching_all_passes_every_complete_record() {
        let ds = dataset();
        let criteria = FilterCriteria::matching_all(&ds);
        assert_eq!(criteria.apply(&ds).len(), ds.len());
    }
}
