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

use crate::chart_request::ChartCategory;
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Maximum of {cap} visuals reached")]
    CapacityReached { cap: usize },
}

/// One user-requested visual. Identifiers are 1-based, monotonic and never
/// reused; the raw requested name is kept verbatim and only resolved into a
/// display name at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedVisual {
    pub id: u32,
    pub category: ChartCategory,
    pub requested_name: String,
}

/// Ordered, bounded list of the session's requested visuals. Session-scoped
/// state with an explicit owner: initialised empty, mutated only by `add`,
/// read by the render pass. There is no remove or clear operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualQueue {
    entries: Vec<QueuedVisual>,
    next_id: u32,
    capacity: usize,
}
impl VisualQueue {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            capacity: DEFAULT_CAPACITY,
        }
    }
    pub fn with_capacity(capacity: usize) -> ConfigResult<Self> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { value: capacity });
        }
        Ok(Self {
            entries: Vec::new(),
            next_id: 1,
            capacity,
        })
    }
    /// Appends a visual and returns its assigned identifier. At capacity the
    /// add is rejected and the queue is left untouched.
    pub fn add(
        &mut self,
        category: ChartCategory,
        requested_name: impl Into<String>,
    ) -> Result<u32, QueueError> {
        if self.entries.len() >= self.capacity {
            log::warn!("visual queue at capacity ({}), add rejected", self.capacity);
            return Err(QueueError::CapacityReached { cap: self.capacity });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(QueuedVisual {
            id,
            category,
            requested_name: requested_name.into(),
        });
        Ok(id)
    }
    pub fn iter(&self) -> impl Iterator<Item = &QueuedVisual> {
        self.entries.iter()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
impl Default for VisualQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_are_one_based_and_monotonic() {
        let mut queue = VisualQueue::new();
        let first = queue.add(ChartCategory::YieldHistogram, "").unwrap();
        let second = queue.add(ChartCategory::SupplierPie, "mine").unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.iter().map(|v| v.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_eleventh_add_is_rejected_without_mutation() {
        let mut queue = VisualQueue::new();
        for _ in 0..10 {
            queue.add(ChartCategory::YearlyTimeline, "").unwrap();
        }
        let rejected = queue.add(ChartCategory::YearlyTimeline, "late");
        assert!(matches!(
            rejected,
            Err(QueueError::CapacityReached { cap: 10 })
        ));
        assert_eq!(queue.len(), 10);
        assert!(queue.is_full());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(VisualQueue::with_capacity(0).is_err());
        let queue = VisualQueue::with_capacity(3).unwrap();
        assert_eq!(queue.capacity(), 3);
    }

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut queue = VisualQueue::new();
        queue.add(ChartCategory::SupplierPie, "a").unwrap();
        queue.add(ChartCategory::DetonationMap, "b").unwrap();
        let categories: Vec<ChartCategory> = queue.iter().map(|v| v.category).collect();
        assert_eq!(
            categories,
            vec![ChartCategory::SupplierPie, ChartCategory::DetonationMap]
        );
    }
}
