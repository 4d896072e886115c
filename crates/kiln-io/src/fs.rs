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

//! A [`SourceProvider`] backed by a directory on disk.

use kiln_core::{SourceError, SourceProvider};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Reads shader sources from a root directory.
///
/// Sources live directly under the root. Resolved text and compiled artifacts
/// are mapped to the `resolved/` and `compiled/` subdirectories.
#[derive(Debug, Clone)]
pub struct FsSourceProvider {
    root: PathBuf,
}

impl FsSourceProvider {
    /// Subdirectory holding resolved-text caches.
    pub const RESOLVED_DIR: &'static str = "resolved";
    /// Subdirectory holding compiled-artifact caches.
    pub const COMPILED_DIR: &'static str = "compiled";

    /// Creates a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory sources are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn join(&self, parts: &[&str]) -> String {
        let mut path = self.root.clone();
        for part in parts {
            path.push(part);
        }
        path.to_string_lossy().into_owned()
    }
}

impl SourceProvider for FsSourceProvider {
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send + '_>, SourceError> {
        match File::open(path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SourceError::NotFound {
                path: path.to_string(),
            }),
            Err(source) => Err(SourceError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    fn shader_source_path(&self, file: &str) -> String {
        self.join(&[file])
    }

    fn resolved_cache_path(&self, file: &str) -> String {
        self.join(&[Self::RESOLVED_DIR, file])
    }

    fn compiled_cache_path(&self, file: &str) -> String {
        self.join(&[Self::COMPILED_DIR, file])
    }
}
