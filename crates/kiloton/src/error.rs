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

use crate::queue::QueueError;
use thiserror::Error;
#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Dataset error: {0}")]
    Data(#[from] DataError),
    #[error("Chart request error: {0}")]
    Chart(#[from] ChartError),
    #[error("Visual queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
}
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to read dataset file '{path}': {source}")]
    DatasetFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse dataset file '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("Record {row} has no valid calendar date ({year}-{month}-{day})")]
    InvalidDate {
        row: usize,
        year: i32,
        month: u32,
        day: u32,
    },
    #[error("Dataset is empty")]
    EmptyDataset,
    #[error("Field '{field}' is missing from record {row}")]
    MissingField { field: String, row: usize },
}
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Unknown visual category label: '{label}'")]
    UnknownCategory { label: String },
    #[error("Chart request for '{name}' could not be rendered: {reason}")]
    RenderFailed { name: String, reason: String },
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read purpose catalogue '{path}': {source}")]
    CatalogueFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse purpose catalogue: {source}")]
    CatalogueParseError {
        #[from]
        source: serde_yaml::Error,
    },
    #[error("Purpose catalogue is empty")]
    EmptyCatalogue,
    #[error("Invalid queue capacity: {value}")]
    InvalidCapacity { value: usize },
}
#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },
}
pub type Result<T> = std::result::Result<T, ExplorerError>;
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
impl From<serde_json::Error> for ExplorerError {
    fn from(err: serde_json::Error) -> Self {
        ExplorerError::Serialisation(SerialisationError::JsonError { source: err })
    }
}
impl From<anyhow::Error> for ExplorerError {
    fn from(err: anyhow::Error) -> Self {
        ExplorerError::Chart(ChartError::RenderFailed {
            name: "unknown".to_string(),
            reason: err.to_string(),
        })
    }
}
impl ExplorerError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExplorerError::Data(DataError::EmptyDataset)
                | ExplorerError::Data(DataError::DatasetFileError { .. })
                | ExplorerError::Queue(QueueError::CapacityReached { .. })
        )
    }
    pub fn category(&self) -> &'static str {
        match self {
            ExplorerError::Data(_) => "Data",
            ExplorerError::Chart(_) => "Chart",
            ExplorerError::Queue(_) => "Queue",
            ExplorerError::Config(_) => "Configuration",
            ExplorerError::Io(_) => "I/O",
            ExplorerError::Serialisation(_) => "Serialisation",
        }
    }
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ExplorerError::Data(DataError::DatasetFileError { .. }) => vec![
                "Check that the dataset CSV is present next to the executable".to_string(),
                "Pass an explicit path to the dataset file".to_string(),
            ],
            ExplorerError::Data(DataError::CsvError { .. }) => vec![
                "Verify the file uses the expected detonation column schema".to_string(),
                "Check for truncated or hand-edited rows".to_string(),
            ],
            ExplorerError::Queue(QueueError::CapacityReached { cap }) => {
                vec![format!("At most {cap} visuals can be queued per session")]
            }
            _ => Vec::new(),
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            ExplorerError::Data(DataError::DatasetFileError { path, .. }) => {
                format!("Could not load the detonation dataset from '{path}'. The explorer will start with an empty dataset.")
            }
            ExplorerError::Data(DataError::EmptyDataset) => {
                "The dataset is empty; filters and visuals will show no detonations.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}
impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }
    pub fn colour_code(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "\x1b[36m",
            ErrorSeverity::Warning => "\x1b[33m",
            ErrorSeverity::Error => "\x1b[31m",
            ErrorSeverity::Critical => "\x1b[35m",
        }
    }
}
pub fn error_severity(error: &ExplorerError) -> ErrorSeverity {
    match error {
        ExplorerError::Data(DataError::EmptyDataset) => ErrorSeverity::Warning,
        ExplorerError::Queue(_) => ErrorSeverity::Warning,
        ExplorerError::Config(ConfigError::EmptyCatalogue) => ErrorSeverity::Warning,
        ExplorerError::Io(_) => ErrorSeverity::Error,
        _ => ErrorSeverity::Error,
    }
}
pub struct ErrorReporter {
    pub show_suggestions: bool,
    pub coloured_output: bool,
}
impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            show_suggestions: true,
            coloured_output: true,
        }
    }
    pub fn report(&self, error: &ExplorerError) -> String {
        let severity = error_severity(error);
        let mut output = String::new();
        if self.coloured_output {
            output.push_str(severity.colour_code());
        }
        output.push_str(&format!("[{}] {}\n", severity.as_str(), error));
        if self.coloured_output {
            output.push_str("\x1b[0m");
        }
        if self.show_suggestions {
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                output.push_str("\nSuggestions:\n");
                for suggestion in suggestions {
                    output.push_str(&format!("  • {suggestion}\n"));
                }
            }
        }
        output
    }
}
impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_is_recoverable() {
        let err = ExplorerError::Queue(QueueError::CapacityReached { cap: 10 });
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "Queue");
    }

    #[test]
    fn test_report_mentions_severity_and_message() {
        let reporter = ErrorReporter {
            show_suggestions: true,
            coloured_output: false,
        };
        let err = ExplorerError::Data(DataError::EmptyDataset);
        let text = reporter.report(&err);
        assert!(text.contains("WARNING"));
        assert!(text.contains("Dataset is empty"));
    }
}
