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

//! An in-memory [`SourceProvider`], used by tests and tools.

use kiln_core::{SourceError, SourceProvider};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{PoisonError, RwLock};

/// Stores shader sources in a map keyed by path.
///
/// Cache paths are prefixed with `resolved/` and `compiled/` so they never
/// collide with source paths.
#[derive(Debug, Default)]
pub struct MemorySourceProvider {
    files: RwLock<HashMap<String, String>>,
}

impl MemorySourceProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a provider from `(path, text)` pairs.
    pub fn with_files<P, T>(files: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: Into<String>,
        T: Into<String>,
    {
        let provider = Self::new();
        for (path, text) in files {
            provider.set(path, text);
        }
        provider
    }

    /// Inserts or replaces the text stored at `path`.
    pub fn set(&self, path: impl Into<String>, text: impl Into<String>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), text.into());
    }

    /// Removes the file at `path`, returning its previous text.
    pub fn remove(&self, path: &str) -> Option<String> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }
}

impl SourceProvider for MemorySourceProvider {
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send + '_>, SourceError> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let text = files.get(path).ok_or_else(|| SourceError::NotFound {
            path: path.to_string(),
        })?;
        Ok(Box::new(Cursor::new(text.clone().into_bytes())))
    }

    fn shader_source_path(&self, file: &str) -> String {
        file.to_string()
    }

    fn resolved_cache_path(&self, file: &str) -> String {
        format!("resolved/{file}")
    }

    fn compiled_cache_path(&self, file: &str) -> String {
        format!("compiled/{file}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replace_and_remove() {
        let provider = MemorySourceProvider::with_files([("a.glsl", "one")]);
        assert_eq!(provider.read_source("a.glsl").unwrap(), "one");

        provider.set("a.glsl", "two");
        assert_eq!(provider.read_source("a.glsl").unwrap(), "two");

        assert_eq!(provider.remove("a.glsl").as_deref(), Some("two"));
        assert!(matches!(
            provider.read_source("a.glsl"),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn cache_paths_are_prefixed() {
        let provider = MemorySourceProvider::new();
        assert_eq!(provider.shader_source_path("x.comp"), "x.comp");
        assert_eq!(provider.resolved_cache_path("x.comp"), "resolved/x.comp");
        assert_eq!(provider.compiled_cache_path("x.comp"), "compiled/x.comp");
    }
}
