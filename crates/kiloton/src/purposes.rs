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

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dictionary from the dataset's abbreviated purpose codes to readable
/// descriptions. Unknown codes fall back to the raw code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurposeCatalogue {
    entries: HashMap<String, String>,
}
impl PurposeCatalogue {
    pub fn builtin() -> Self {
        let entries = [
            ("Combat", "Combat Test"),
            ("Fms", "Fission Material Safety"),
            ("Fms/Wr", "Fission Material Safety & Warhead Research"),
            ("Me", "Meteorological Experiment"),
            ("Nan", "Naval Accident"),
            ("Pne", "Peaceful Nuclear Explosion"),
            ("Pne/Wr", "Peaceful Nuc. Expl. & Warhead Research"),
            ("Pne:Plo", "Peaceful Expl. (Plowshare)"),
            ("Pne:V", "Peaceful Expl. (Vessel/Channel)"),
            ("Sam", "Surface Area Measurement"),
            ("Sb", "Seismic Benchmark"),
            ("Se", "Safety Experiment"),
            ("Se/Wr", "Safety & Warhead Research"),
            ("Transp", "Transportation Test"),
            ("We", "Weapon Experiment"),
            ("We/Sam", "Weapon & Surface Area"),
            ("We/Wr", "Weapon & Warhead Research"),
            ("Wr", "Warhead Research"),
            ("Wr/F/S", "Warhead, Fissile & Safety"),
            ("Wr/F/Sa", "Warhead, Fissile & Surface Area"),
            ("Wr/Fms", "Warhead & Fissile Material Safety"),
            ("Wr/P/S", "Warhead, Plowshare & Safety"),
            ("Wr/P/Sa", "Warhead, Plowshare & Surface Area"),
            ("Wr/Pne", "Warhead & Peaceful Expl."),
            ("Wr/Sam", "Warhead & Surface Area"),
            ("Wr/Se", "Warhead & Safety"),
            ("Wr/We", "Warhead & Weapon"),
            ("Wr/We/S", "Warhead, Weapon & Safety"),
        ]
        .into_iter()
        .map(|(code, label)| (code.to_string(), label.to_string()))
        .collect();
        Self { entries }
    }
    /// Loads an override catalogue from a YAML map of code -> description.
    pub fn from_yaml_file(path: &str) -> ConfigResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::CatalogueFileError {
                path: path.to_string(),
                source,
            })?;
        let entries: HashMap<String, String> = serde_yaml::from_str(&content)?;
        if entries.is_empty() {
            return Err(ConfigError::EmptyCatalogue);
        }
        Ok(Self { entries })
    }
    pub fn describe(&self, code: &str) -> String {
        self.entries
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
impl Default for PurposeCatalogue {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_known_code_maps_to_description() {
        let catalogue = PurposeCatalogue::builtin();
        assert_eq!(catalogue.describe("Wr"), "Warhead Research");
        assert_eq!(catalogue.describe("Pne:Plo"), "Peaceful Expl. (Plowshare)");
    }

    #[test]
    fn test_unknown_code_falls_back_to_raw_code() {
        let catalogue = PurposeCatalogue::builtin();
        assert_eq!(catalogue.describe("Xyz"), "Xyz");
    }

    #[test]
    fn test_yaml_override_replaces_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Wr: Research\nSe: Safety").unwrap();
        let catalogue = PurposeCatalogue::from_yaml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.describe("Wr"), "Research");
    }
}
