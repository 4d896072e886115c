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

//! Defines the error types raised by the external collaborators.
//!
//! Compile failures are not errors here. A shader that fails to compile is a
//! state of its program, reported through the diagnostics sink.

use std::fmt;

/// An error raised by a `SourceProvider` while opening or reading shader text.
#[derive(Debug)]
pub enum SourceError {
    /// No file exists at the requested path.
    NotFound {
        /// The storage path that was requested.
        path: String,
    },
    /// The file exists but could not be read.
    Io {
        /// The storage path that was requested.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The file content is not valid UTF-8 text.
    InvalidUtf8 {
        /// The storage path that was requested.
        path: String,
    },
}

impl SourceError {
    /// Returns the storage path the error refers to.
    pub fn path(&self) -> &str {
        match self {
            SourceError::NotFound { path }
            | SourceError::Io { path, .. }
            | SourceError::InvalidUtf8 { path } => path,
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::NotFound { path } => write!(f, "Shader source '{path}' not found"),
            SourceError::Io { path, source } => {
                write!(f, "Failed to read shader source '{path}': {source}")
            }
            SourceError::InvalidUtf8 { path } => {
                write!(f, "Shader source '{path}' is not valid UTF-8")
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// An error raised by a `ProgramDevice` when the backend itself misbehaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The backend could not create the requested object.
    ObjectCreationFailed(String),
    /// An error originating from the specific backend implementation.
    Backend(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::ObjectCreationFailed(msg) => {
                write!(f, "Device object creation failed: {msg}")
            }
            DeviceError::Backend(msg) => write!(f, "Backend-specific device error: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn source_error_display() {
        let err = SourceError::NotFound {
            path: "shaders/lit.frag".to_string(),
        };
        assert_eq!(format!("{err}"), "Shader source 'shaders/lit.frag' not found");
        assert_eq!(err.path(), "shaders/lit.frag");
        assert!(err.source().is_none());
    }

    #[test]
    fn source_error_exposes_io_cause() {
        let err = SourceError::Io {
            path: "a.glsl".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(format!("{err}").starts_with("Failed to read shader source 'a.glsl'"));
        assert!(err.source().is_some());
    }

    #[test]
    fn device_error_display() {
        assert_eq!(
            format!("{}", DeviceError::Backend("lost context".into())),
            "Backend-specific device error: lost context"
        );
    }
}
