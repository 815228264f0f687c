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

use crate::dataset::DetonationRecord;
use crate::purposes::PurposeCatalogue;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type Rgba = [u8; 4];

pub const SKY_BLUE: Rgba = [135, 206, 235, 255];
pub const BLACK: Rgba = [0, 0, 0, 255];
pub const GREEN: Rgba = [0, 128, 0, 255];
pub const CORAL: Rgba = [255, 127, 80, 255];
pub const WHITE: Rgba = [255, 255, 255, 255];

/// Sentinel a user can type to mean "no name given".
const NO_NAME_SENTINEL: &str = "no name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartCategory {
    DetonationMap,
    YieldHistogram,
    YearlyTimeline,
    PurposeBars,
    YieldDepthScatter,
    SupplierPie,
}
impl ChartCategory {
    pub const ALL: [ChartCategory; 6] = [
        ChartCategory::DetonationMap,
        ChartCategory::YieldHistogram,
        ChartCategory::YearlyTimeline,
        ChartCategory::PurposeBars,
        ChartCategory::YieldDepthScatter,
        ChartCategory::SupplierPie,
    ];
    pub fn label(&self) -> &'static str {
        match self {
            ChartCategory::DetonationMap => "Map of Filtered Detonations",
            ChartCategory::YieldHistogram => "Histogram of Average Yields",
            ChartCategory::YearlyTimeline => "Timeline: Detonations by Year",
            ChartCategory::PurposeBars => "Bar Chart: Detonations by Purpose",
            ChartCategory::YieldDepthScatter => "Scatter Plot: Yield vs. Depth",
            ChartCategory::SupplierPie => "Pie Chart: Detonations by Supplier Nation",
        }
    }
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}
impl std::fmt::Display for ChartCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisLabels {
    pub x: &'static str,
    pub y: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapStyle {
    pub point_radius_metres: f64,
}
impl Default for MapStyle {
    fn default() -> Self {
        Self {
            point_radius_metres: 35_000.0,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramStyle {
    pub bins: usize,
    pub fill: Rgba,
    pub edge_colour: Rgba,
}
impl Default for HistogramStyle {
    fn default() -> Self {
        Self {
            bins: 20,
            fill: SKY_BLUE,
            edge_colour: BLACK,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineStyle {
    pub colour: Rgba,
    pub marker_radius: f32,
    pub line_width: f32,
}
impl Default for TimelineStyle {
    fn default() -> Self {
        Self {
            colour: GREEN,
            marker_radius: 3.0,
            line_width: 1.5,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarStyle {
    pub fill: Rgba,
    pub horizontal: bool,
}
impl Default for BarStyle {
    fn default() -> Self {
        Self {
            fill: CORAL,
            horizontal: true,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterStyle {
    pub alpha: f32,
    pub edge_colour: Rgba,
    pub edge_width: f32,
    pub radius: f32,
}
impl Default for ScatterStyle {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            edge_colour: WHITE,
            edge_width: 0.5,
            radius: 2.5,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PieStyle {
    pub percent_decimals: usize,
    pub start_angle_degrees: f32,
}
impl Default for PieStyle {
    fn default() -> Self {
        Self {
            percent_decimals: 1,
            start_angle_degrees: 90.0,
        }
    }
}

/// Fixed supplier-nation colour table for the detonation map. The lookup
/// trims and uppercases; countries outside the table get no colour and the
/// renderer picks its own fallback.
pub fn country_colour(country: &str) -> Option<Rgba> {
    match country.trim().to_uppercase().as_str() {
        "USA" => Some([0, 0, 255, 180]),
        "USSR" => Some([255, 0, 0, 180]),
        "FRANCE" => Some([0, 255, 0, 180]),
        "UK" => Some([255, 165, 0, 180]),
        "CHINA" => Some([255, 255, 0, 180]),
        "INDIA" => Some([255, 105, 180, 180]),
        "PAKIST" => Some([75, 0, 130, 180]),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub date_label: String,
    /// Average yield coerced for map rendering only: missing becomes 0.0
    /// here, never in the statistical aggregations.
    pub average_yield: f64,
    pub source_country: String,
    pub colour: Option<Rgba>,
}

/// What a renderer should draw, one variant per visual category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChartData {
    DetonationMap {
        points: Vec<MapPoint>,
        style: MapStyle,
    },
    YieldHistogram {
        values: Vec<f64>,
        labels: AxisLabels,
        style: HistogramStyle,
    },
    YearlyTimeline {
        counts: Vec<(i32, u64)>,
        labels: AxisLabels,
        style: TimelineStyle,
    },
    PurposeBars {
        counts: Vec<(String, u64)>,
        labels: AxisLabels,
        style: BarStyle,
    },
    YieldDepthScatter {
        points: Vec<[f64; 2]>,
        labels: AxisLabels,
        style: ScatterStyle,
    },
    SupplierPie {
        slices: Vec<(String, u64)>,
        style: PieStyle,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChartOutcome {
    Ready { message: String, chart: ChartData },
    NoData { message: String },
}

/// The builder's result. Constructed fresh on every render pass from the
/// current reduced record collection; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRequest {
    pub category: ChartCategory,
    pub display_name: String,
    pub outcome: ChartOutcome,
}
impl ChartRequest {
    pub fn is_ready(&self) -> bool {
        matches!(self.outcome, ChartOutcome::Ready { .. })
    }
    pub fn message(&self) -> &str {
        match &self.outcome {
            ChartOutcome::Ready { message, .. } => message,
            ChartOutcome::NoData { message } => message,
        }
    }
}

/// The user-supplied name wins when it is non-empty after trimming and is
/// not the "no name" placeholder; otherwise a default is generated from the
/// visual's numeric identifier.
pub fn resolve_display_name(requested: &str, visual_id: u32) -> String {
    let trimmed = requested.trim();
    if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(NO_NAME_SENTINEL) {
        trimmed.to_string()
    } else {
        format!("Visual #{visual_id}")
    }
}

// Occurrence counts in descending count order; ties keep first-seen order.
fn count_values<I>(values: I) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for value in values {
        if !counts.contains_key(&value) {
            order.push(value.clone());
        }
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut counted: Vec<(String, u64)> = order
        .into_iter()
        .map(|label| {
            let n = counts[&label];
            (label, n)
        })
        .collect();
    counted.sort_by(|a, b| b.1.cmp(&a.1));
    counted
}

/// Builds the chart request for one queued visual from the reduced record
/// collection. Pure and total: every no-data condition comes back as a
/// `NoData` outcome with a diagnostic, never as an error or a panic.
pub fn build_request(
    category: ChartCategory,
    records: &[&DetonationRecord],
    purposes: &PurposeCatalogue,
    requested_name: &str,
    visual_id: u32,
) -> ChartRequest {
    let display_name = resolve_display_name(requested_name, visual_id);
    let outcome = if records.is_empty() {
        ChartOutcome::NoData {
            message: "No detonations match the active filters.".to_string(),
        }
    } else {
        match category {
            ChartCategory::DetonationMap => build_map(records),
            ChartCategory::YieldHistogram => build_histogram(records),
            ChartCategory::YearlyTimeline => build_timeline(records),
            ChartCategory::PurposeBars => build_purpose_bars(records, purposes),
            ChartCategory::YieldDepthScatter => build_scatter(records),
            ChartCategory::SupplierPie => build_pie(records),
        }
    };
    ChartRequest {
        category,
        display_name,
        outcome,
    }
}

fn build_map(records: &[&DetonationRecord]) -> ChartOutcome {
    let points: Vec<MapPoint> = records
        .iter()
        .map(|r| MapPoint {
            latitude: r.latitude,
            longitude: r.longitude,
            name: r.name.clone(),
            date_label: r.date.format("%Y-%m-%d").to_string(),
            average_yield: r.average_yield.unwrap_or(0.0),
            source_country: r.source_country.clone(),
            colour: country_colour(&r.source_country),
        })
        .collect();
    ChartOutcome::Ready {
        message: format!("Prepared {} detonation map points.", points.len()),
        chart: ChartData::DetonationMap {
            points,
            style: MapStyle::default(),
        },
    }
}

fn build_histogram(records: &[&DetonationRecord]) -> ChartOutcome {
    let values: Vec<f64> = records.iter().filter_map(|r| r.average_yield).collect();
    if values.is_empty() {
        return ChartOutcome::NoData {
            message: "None of the filtered detonations has a measured average yield.".to_string(),
        };
    }
    ChartOutcome::Ready {
        message: format!("Prepared a histogram over {} yield values.", values.len()),
        chart: ChartData::YieldHistogram {
            values,
            labels: AxisLabels {
                x: "Average Yield (kt)",
                y: "Number of Detonations",
            },
            style: HistogramStyle::default(),
        },
    }
}

fn build_timeline(records: &[&DetonationRecord]) -> ChartOutcome {
    // BTreeMap keeps the (year, count) pairs ascending by year.
    let by_year: BTreeMap<i32, u64> = records
        .iter()
        .counts_by(|r| r.year())
        .into_iter()
        .map(|(year, n)| (year, n as u64))
        .collect();
    if by_year.is_empty() {
        return ChartOutcome::NoData {
            message: "No detonation dates to place on a timeline.".to_string(),
        };
    }
    ChartOutcome::Ready {
        message: format!("Prepared a timeline across {} years.", by_year.len()),
        chart: ChartData::YearlyTimeline {
            counts: by_year.into_iter().collect(),
            labels: AxisLabels {
                x: "Year",
                y: "Number of Detonations",
            },
            style: TimelineStyle::default(),
        },
    }
}

fn build_purpose_bars(records: &[&DetonationRecord], purposes: &PurposeCatalogue) -> ChartOutcome {
    // Deliberately left in the aggregation's own count order; the timeline is
    // the only sorted aggregation.
    let counts = count_values(records.iter().map(|r| purposes.describe(&r.purpose)));
    if counts.is_empty() {
        return ChartOutcome::NoData {
            message: "No purpose codes present in the filtered detonations.".to_string(),
        };
    }
    ChartOutcome::Ready {
        message: format!("Prepared purpose counts for {} labels.", counts.len()),
        chart: ChartData::PurposeBars {
            counts,
            labels: AxisLabels {
                x: "Number of Detonations",
                y: "",
            },
            style: BarStyle::default(),
        },
    }
}

fn build_scatter(records: &[&DetonationRecord]) -> ChartOutcome {
    let points: Vec<[f64; 2]> = records
        .iter()
        .filter_map(|r| r.average_yield.map(|y| [r.depth, y]))
        .collect();
    if points.len() < 2 {
        return ChartOutcome::NoData {
            message: "Fewer than two detonations have both a depth and an average yield."
                .to_string(),
        };
    }
    ChartOutcome::Ready {
        message: format!("Prepared {} yield/depth points.", points.len()),
        chart: ChartData::YieldDepthScatter {
            points,
            labels: AxisLabels {
                x: "Depth (km)",
                y: "Average Yield (kt)",
            },
            style: ScatterStyle::default(),
        },
    }
}

fn build_pie(records: &[&DetonationRecord]) -> ChartOutcome {
    let slices = count_values(records.iter().map(|r| r.source_country.clone()));
    if slices.is_empty() {
        return ChartOutcome::NoData {
            message: "No supplier nations present in the filtered detonations.".to_string(),
        };
    }
    ChartOutcome::Ready {
        message: format!("Prepared supplier shares for {} nations.", slices.len()),
        chart: ChartData::SupplierPie {
            slices,
            style: PieStyle::default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(year: i32, country: &str, purpose: &str, avg_yield: Option<f64>) -> DetonationRecord {
        DetonationRecord {
            name: Some("Sample".to_string()),
            date: NaiveDate::from_ymd_opt(year, 3, 4).unwrap(),
            latitude: 37.1,
            longitude: -116.0,
            yield_lower: avg_yield,
            yield_upper: avg_yield,
            average_yield: avg_yield,
            body_magnitude: 4.0,
            surface_magnitude: 3.0,
            depth: 0.2,
            purpose: purpose.to_string(),
            deployment_type: "Shaft".to_string(),
            deployment_location: "Nevada Ts".to_string(),
            source_country: country.to_string(),
            reporting_source: Some("DOE".to_string()),
        }
    }

    fn refs(records: &[DetonationRecord]) -> Vec<&DetonationRecord> {
        records.iter().collect()
    }

    #[test]
    fn test_display_name_rules() {
        assert_eq!(resolve_display_name("", 3), "Visual #3");
        assert_eq!(resolve_display_name("No NAME", 7), "Visual #7");
        assert_eq!(resolve_display_name("  Trinity Test  ", 1), "Trinity Test");
    }

    #[test]
    fn test_every_category_degrades_on_empty_input() {
        let purposes = PurposeCatalogue::builtin();
        for category in ChartCategory::ALL {
            let request = build_request(category, &[], &purposes, "", 1);
            assert!(!request.is_ready());
            assert!(!request.message().is_empty());
            assert_eq!(request.display_name, "Visual #1");
        }
    }

    #[test]
    fn test_histogram_drops_missing_yields() {
        let records = vec![
            record(1955, "USA", "Wr", Some(1.0)),
            record(1956, "USA", "Wr", Some(2.0)),
            record(1957, "USA", "Wr", None),
            record(1958, "USA", "Wr", Some(3.0)),
        ];
        let request = build_request(
            ChartCategory::YieldHistogram,
            &refs(&records),
            &PurposeCatalogue::builtin(),
            "",
            1,
        );
        match request.outcome {
            ChartOutcome::Ready {
                chart: ChartData::YieldHistogram { values, .. },
                ..
            } => assert_eq!(values, vec![1.0, 2.0, 3.0]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_histogram_with_only_missing_yields_is_no_data() {
        let records = vec![record(1955, "USA", "Wr", None)];
        let request = build_request(
            ChartCategory::YieldHistogram,
            &refs(&records),
            &PurposeCatalogue::builtin(),
            "",
            1,
        );
        assert!(!request.is_ready());
    }

    #[test]
    fn test_timeline_counts_sorted_ascending_by_year() {
        let records = vec![
            record(1957, "USA", "Wr", Some(1.0)),
            record(1955, "USA", "Wr", Some(1.0)),
            record(1955, "USA", "Wr", Some(1.0)),
        ];
        let request = build_request(
            ChartCategory::YearlyTimeline,
            &refs(&records),
            &PurposeCatalogue::builtin(),
            "",
            1,
        );
        match request.outcome {
            ChartOutcome::Ready {
                chart: ChartData::YearlyTimeline { counts, .. },
                ..
            } => assert_eq!(counts, vec![(1955, 2), (1957, 1)]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_scatter_needs_at_least_two_complete_rows() {
        let records = vec![
            record(1955, "USA", "Wr", Some(20.0)),
            record(1956, "USA", "Wr", None),
        ];
        let request = build_request(
            ChartCategory::YieldDepthScatter,
            &refs(&records),
            &PurposeCatalogue::builtin(),
            "",
            1,
        );
        assert!(!request.is_ready());
    }

    #[test]
    fn test_purpose_bars_map_codes_and_keep_count_order() {
        let records = vec![
            record(1955, "USA", "Xyz", Some(1.0)),
            record(1956, "USA", "Wr", Some(1.0)),
            record(1957, "USA", "Wr", Some(1.0)),
        ];
        let request = build_request(
            ChartCategory::PurposeBars,
            &refs(&records),
            &PurposeCatalogue::builtin(),
            "",
            1,
        );
        match request.outcome {
            ChartOutcome::Ready {
                chart: ChartData::PurposeBars { counts, .. },
                ..
            } => {
                assert_eq!(
                    counts,
                    vec![
                        ("Warhead Research".to_string(), 2),
                        ("Xyz".to_string(), 1),
                    ]
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_map_points_coerce_yield_and_colour() {
        let records = vec![
            record(1955, " usa ", "Wr", None),
            record(1956, "Atlantis", "Wr", Some(10.0)),
        ];
        let request = build_request(
            ChartCategory::DetonationMap,
            &refs(&records),
            &PurposeCatalogue::builtin(),
            "",
            1,
        );
        match request.outcome {
            ChartOutcome::Ready {
                chart: ChartData::DetonationMap { points, .. },
                ..
            } => {
                assert_eq!(points[0].average_yield, 0.0);
                assert_eq!(points[0].colour, Some([0, 0, 255, 180]));
                assert_eq!(points[1].colour, None);
                assert_eq!(points[0].date_label, "1955-03-04");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_pie_counts_per_supplier() {
        let records = vec![
            record(1955, "USSR", "Wr", Some(1.0)),
            record(1956, "USA", "Wr", Some(1.0)),
            record(1957, "USSR", "Wr", Some(1.0)),
        ];
        let request = build_request(
            ChartCategory::SupplierPie,
            &refs(&records),
            &PurposeCatalogue::builtin(),
            "",
            1,
        );
        match request.outcome {
            ChartOutcome::Ready {
                chart: ChartData::SupplierPie { slices, .. },
                ..
            } => assert_eq!(
                slices,
                vec![("USSR".to_string(), 2), ("USA".to_string(), 1)]
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_category_labels_round_trip() {
        for category in ChartCategory::ALL {
            assert_eq!(ChartCategory::from_label(category.label()), Some(category));
        }
        assert_eq!(ChartCategory::from_label("Select a category..."), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn build_is_total_and_idempotent(
                yields in proptest::collection::vec(proptest::option::of(0.0f64..11_000.0), 0..24),
                name in ".{0,24}",
                visual_id in 1u32..=10,
            ) {
                let records: Vec<DetonationRecord> = yields
                    .iter()
                    .map(|y| record(1960, "USA", "Wr", *y))
                    .collect();
                let record_refs: Vec<&DetonationRecord> = records.iter().collect();
                let purposes = PurposeCatalogue::builtin();
                for category in ChartCategory::ALL {
                    let first = build_request(category, &record_refs, &purposes, &name, visual_id);
                    let second = build_request(category, &record_refs, &purposes, &name, visual_id);
                    prop_assert_eq!(&first, &second);
                    prop_assert!(!first.message().is_empty());
                }
            }
        }
    }
}
