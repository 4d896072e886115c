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

//! The source storage collaborator.

use crate::error::SourceError;
use std::fmt::Debug;
use std::io::Read;

/// Opens shader text by path on behalf of the pipeline.
///
/// The pipeline never performs file I/O itself. It asks the provider to map a
/// shader file name onto a storage path, then opens that path as a stream.
pub trait SourceProvider: Send + Sync + Debug {
    /// Opens a stream for a storage path returned by one of the path methods.
    /// ## Errors
    /// * `SourceError` - If the path does not exist or cannot be opened.
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send + '_>, SourceError>;

    /// Maps a shader file name to the storage path of its source text.
    fn shader_source_path(&self, file: &str) -> String;

    /// Maps a shader file name to the storage path of its resolved-text cache.
    fn resolved_cache_path(&self, file: &str) -> String;

    /// Maps a shader file name to the storage path of its compiled-artifact cache.
    fn compiled_cache_path(&self, file: &str) -> String;

    /// Reads the whole source text of a shader file.
    /// ## Errors
    /// * `SourceError` - If the file cannot be opened, read, or is not UTF-8.
    fn read_source(&self, file: &str) -> Result<String, SourceError> {
        let path = self.shader_source_path(file);
        let mut stream = self.open(&path)?;
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?;
        String::from_utf8(bytes).map_err(|_| SourceError::InvalidUtf8 { path })
    }
}
