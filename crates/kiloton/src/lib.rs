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

pub mod chart_request;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod purposes;
pub mod queue;

pub use chart_request::{
    build_request, country_colour, resolve_display_name, AxisLabels, BarStyle, ChartCategory,
    ChartData, ChartOutcome, ChartRequest, HistogramStyle, MapPoint, MapStyle, PieStyle, Rgba,
    ScatterStyle, TimelineStyle,
};
pub use dataset::{
    CsvLoader, Dataset, DatasetExtents, DatasetId, DatasetMetadata, DetonationRecord,
};
pub use error::{
    ChartError, ConfigError, DataError, ErrorReporter, ErrorSeverity, ExplorerError, Result,
};
pub use filter::{ClosedRange, FilterCriteria, Hemisphere, Membership};
pub use purposes::PurposeCatalogue;
pub use queue::{QueueError, QueuedVisual, VisualQueue, DEFAULT_CAPACITY};

use std::path::Path;

/// Session front door: the loaded dataset, the purpose catalogue and the
/// visual queue, wired together for the one-interaction-one-pass flow. The
/// dataset is read-only after construction; the queue is the only mutable
/// session state.
pub struct DetonationExplorer {
    dataset: Dataset,
    purposes: PurposeCatalogue,
    queue: VisualQueue,
}
impl DetonationExplorer {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            purposes: PurposeCatalogue::builtin(),
            queue: VisualQueue::new(),
        }
    }
    pub fn with_purposes(mut self, purposes: PurposeCatalogue) -> Self {
        self.purposes = purposes;
        self
    }
    pub fn with_queue(mut self, queue: VisualQueue) -> Self {
        self.queue = queue;
        self
    }
    pub fn from_csv(path: &Path) -> Result<Self> {
        let dataset = CsvLoader::new().load(path)?;
        Ok(Self::new(dataset))
    }
    /// Load-failure degrade path: the session starts with an empty dataset
    /// and the error is handed back for the UI to report.
    pub fn from_csv_or_empty(path: &Path) -> (Self, Option<ExplorerError>) {
        match Self::from_csv(path) {
            Ok(explorer) => (explorer, None),
            Err(err) => {
                log::warn!("dataset load failed, continuing empty: {err}");
                (Self::new(Dataset::empty()), Some(err))
            }
        }
    }
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
    pub fn purposes(&self) -> &PurposeCatalogue {
        &self.purposes
    }
    pub fn queue(&self) -> &VisualQueue {
        &self.queue
    }
    /// The reduced record collection under the given criteria.
    pub fn reduce(&self, criteria: &FilterCriteria) -> Vec<&DetonationRecord> {
        criteria.apply(&self.dataset)
    }
    pub fn add_visual(
        &mut self,
        category: ChartCategory,
        requested_name: impl Into<String>,
    ) -> std::result::Result<u32, QueueError> {
        self.queue.add(category, requested_name)
    }
    /// Replays the whole queue, in insertion order, against the CURRENT
    /// reduced record collection. Nothing is cached between passes, so every
    /// queued visual always reflects the latest filter settings.
    pub fn render_pass(&self, criteria: &FilterCriteria) -> Vec<ChartRequest> {
        let reduced = self.reduce(criteria);
        self.queue
            .iter()
            .map(|visual| {
                build_request(
                    visual.category,
                    &reduced,
                    &self.purposes,
                    &visual.requested_name,
                    visual.id,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(year: i32, country: &str) -> DetonationRecord {
        DetonationRecord {
            name: None,
            date: NaiveDate::from_ymd_opt(year, 5, 9).unwrap(),
            latitude: 28.0,
            longitude: 87.0,
            yield_lower: Some(5.0),
            yield_upper: Some(15.0),
            average_yield: Some(10.0),
            body_magnitude: 4.1,
            surface_magnitude: 3.3,
            depth: 0.5,
            purpose: "We".to_string(),
            deployment_type: "Shaft".to_string(),
            deployment_location: "Lop Nor".to_string(),
            source_country: country.to_string(),
            reporting_source: Some("MIC".to_string()),
        }
    }

    fn explorer() -> DetonationExplorer {
        DetonationExplorer::new(Dataset::new(
            "t".to_string(),
            vec![
                record(1964, "CHINA"),
                record(1967, "CHINA"),
                record(1974, "INDIA"),
            ],
        ))
    }

    #[test]
    fn test_render_pass_replays_in_insertion_order() {
        let mut explorer = explorer();
        explorer
            .add_visual(ChartCategory::YearlyTimeline, "")
            .unwrap();
        explorer.add_visual(ChartCategory::SupplierPie, "").unwrap();
        let criteria = FilterCriteria::matching_all(explorer.dataset());
        let requests = explorer.render_pass(&criteria);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].category, ChartCategory::YearlyTimeline);
        assert_eq!(requests[1].category, ChartCategory::SupplierPie);
        assert_eq!(requests[0].display_name, "Visual #1");
    }

    #[test]
    fn test_render_pass_tracks_current_filters() {
        let mut explorer = explorer();
        explorer.add_visual(ChartCategory::SupplierPie, "").unwrap();
        let wide = FilterCriteria::matching_all(explorer.dataset());
        let mut narrow = wide.clone();
        narrow.source_countries = Membership::of(["INDIA"]);

        let first = explorer.render_pass(&wide);
        let second = explorer.render_pass(&narrow);
        match (&first[0].outcome, &second[0].outcome) {
            (
                ChartOutcome::Ready {
                    chart: ChartData::SupplierPie { slices: all, .. },
                    ..
                },
                ChartOutcome::Ready {
                    chart: ChartData::SupplierPie { slices: india, .. },
                    ..
                },
            ) => {
                assert_eq!(all.len(), 2);
                assert_eq!(india, &vec![("INDIA".to_string(), 1)]);
            }
            other => panic!("unexpected outcomes: {other:?}"),
        }
    }

    #[test]
    fn test_render_pass_on_empty_dataset_degrades() {
        let mut explorer = DetonationExplorer::new(Dataset::empty());
        explorer
            .add_visual(ChartCategory::DetonationMap, "map")
            .unwrap();
        let criteria = FilterCriteria::matching_all(explorer.dataset());
        let requests = explorer.render_pass(&criteria);
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].is_ready());
        assert_eq!(requests[0].display_name, "map");
    }

    #[test]
    fn test_missing_file_yields_empty_session_with_error() {
        let (explorer, err) =
            DetonationExplorer::from_csv_or_empty(Path::new("/nonexistent/detonations.csv"));
        assert!(explorer.dataset().is_empty());
        assert!(err.is_some());
    }
}
