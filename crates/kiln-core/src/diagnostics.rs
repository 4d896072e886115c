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

//! The write-only diagnostics channel of the shader pipeline.

use std::fmt;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    /// Only worth keeping in a log file.
    LogOnly,
    /// Developer-facing detail, such as a missing `#version` line.
    Debug,
    /// Informational notice.
    Notify,
    /// Something is suspicious but the pipeline carried on.
    Warning,
    /// Correct but slow usage.
    PerformanceWarning,
    /// A shader failed to compile or the include graph is broken.
    Error,
}

impl DiagnosticLevel {
    /// Maps the level onto the closest `log` level.
    pub fn log_level(self) -> log::Level {
        match self {
            DiagnosticLevel::LogOnly | DiagnosticLevel::Debug => log::Level::Debug,
            DiagnosticLevel::Notify => log::Level::Info,
            DiagnosticLevel::Warning | DiagnosticLevel::PerformanceWarning => log::Level::Warn,
            DiagnosticLevel::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticLevel::LogOnly => "log",
            DiagnosticLevel::Debug => "debug",
            DiagnosticLevel::Notify => "notify",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::PerformanceWarning => "performance warning",
            DiagnosticLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Receives leveled text messages from the shader pipeline.
///
/// The pipeline only ever writes to a sink. Sinks must be cheap to call, as
/// the repository emits through them from inside `update()`.
pub trait DiagnosticSink: Send + Sync + std::fmt::Debug {
    /// Emits one message.
    /// ## Arguments
    /// * `level` - The severity of the message.
    /// * `message` - The message text, possibly spanning several lines.
    fn emit(&self, level: DiagnosticLevel, message: &str);
}

/// The default sink, forwarding every message to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnosticSink;

impl LogDiagnosticSink {
    /// The `log` target diagnostics are written under.
    pub const TARGET: &'static str = "kiln::diagnostics";
}

impl DiagnosticSink for LogDiagnosticSink {
    fn emit(&self, level: DiagnosticLevel, message: &str) {
        log::log!(target: Self::TARGET, level.log_level(), "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_onto_log_levels() {
        assert_eq!(DiagnosticLevel::Debug.log_level(), log::Level::Debug);
        assert_eq!(DiagnosticLevel::Notify.log_level(), log::Level::Info);
        assert_eq!(DiagnosticLevel::PerformanceWarning.log_level(), log::Level::Warn);
        assert_eq!(DiagnosticLevel::Error.log_level(), log::Level::Error);
    }

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(DiagnosticLevel::Error > DiagnosticLevel::Warning);
        assert!(DiagnosticLevel::Debug > DiagnosticLevel::LogOnly);
    }
}
