// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Repository settings, loaded from a `Shaders.toml` manifest.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors raised while loading [`RepositorySettings`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The manifest exists but could not be read.
    #[error("failed to read settings file '{path}': {source}")]
    Io {
        /// The manifest path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The manifest is not valid TOML for these settings.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables of a shader repository.
///
/// Every field has a default, so a manifest only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Version string used for files without a `#version` directive.
    pub default_version: String,
    /// Text placed after the `#version` line of every resolved unit.
    pub shared_header: String,
    /// Whether the sandbox starts a directory watcher.
    pub watch_for_changes: bool,
    /// Whether a failed compile also emits the numbered resolved text.
    pub dump_resolved_on_error: bool,
    /// Directory holding shader sources, relative to the manifest.
    pub source_root: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            default_version: "450 core".to_string(),
            shared_header: "#extension GL_ARB_separate_shader_objects : enable".to_string(),
            watch_for_changes: true,
            dump_resolved_on_error: false,
            source_root: "shaders".to_string(),
        }
    }
}

impl RepositorySettings {
    /// Parses settings from a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads settings from a manifest file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!(
                "No settings file at '{}', using defaults.",
                path.display()
            );
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_other_defaults() {
        let settings = RepositorySettings::from_toml_str(
            "default_version = \"330\"\ndump_resolved_on_error = true\n",
        )
        .unwrap();
        assert_eq!(settings.default_version, "330");
        assert!(settings.dump_resolved_on_error);
        assert!(settings.watch_for_changes);
        assert_eq!(settings.source_root, "shaders");
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = RepositorySettings::from_toml_str("watch_for_changes = \"yes\"").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = RepositorySettings::load(dir.path().join("Shaders.toml")).unwrap();
        assert_eq!(settings, RepositorySettings::default());
    }

    #[test]
    fn load_reads_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Shaders.toml");
        std::fs::write(&path, "source_root = \"assets/glsl\"\n").unwrap();
        let settings = RepositorySettings::load(&path).unwrap();
        assert_eq!(settings.source_root, "assets/glsl");
    }
}
