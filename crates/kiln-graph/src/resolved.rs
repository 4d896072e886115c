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

//! Resolved compilation units and compiler-log localization.

use kiln_core::MacroDefinition;
use std::fmt;

/// Label of the section holding the version line, shared header and macros.
pub const PREAMBLE_LABEL: &str = "version, header and macros";

/// One row of a provenance table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceEntry {
    /// Offset of the section. A compiler line `n` (1-based) that falls in the
    /// section is line `n - start` of the origin.
    pub start: usize,
    /// The origin file path, or [`PREAMBLE_LABEL`].
    pub label: String,
}

/// Where a line of resolved text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOrigin {
    /// Line number inside the origin, 1-based.
    pub line: usize,
    /// The origin label.
    pub label: String,
}

impl fmt::Display for LineOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} in {}", self.line, self.label)
    }
}

/// The flattened text of one compile request plus its provenance table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedUnit {
    text: String,
    provenance: Vec<ProvenanceEntry>,
}

/// Splits text into lines, treating one trailing newline as a terminator.
fn lines_of(text: &str) -> std::str::Split<'_, char> {
    text.strip_suffix('\n').unwrap_or(text).split('\n')
}

impl ResolvedUnit {
    /// Builds a unit from an explicit text and provenance table.
    pub fn from_parts(text: impl Into<String>, provenance: Vec<ProvenanceEntry>) -> Self {
        Self {
            text: text.into(),
            provenance,
        }
    }

    /// Concatenates the preamble and the given `(label, parsed text)` sections.
    ///
    /// Each section is preceded by a `/* File: label */` marker line.
    pub fn assemble<'a>(
        version: &str,
        shared_header: &str,
        macros: &[MacroDefinition],
        sections: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut lines: Vec<String> = vec![format!("#version {version}")];
        if !shared_header.is_empty() {
            lines.extend(lines_of(shared_header).map(str::to_string));
        }
        lines.extend(macros.iter().map(MacroDefinition::to_define_line));

        let mut provenance = vec![ProvenanceEntry {
            start: 0,
            label: PREAMBLE_LABEL.to_string(),
        }];
        for (label, text) in sections {
            lines.push(format!("/* File: {label} */"));
            provenance.push(ProvenanceEntry {
                start: lines.len(),
                label: label.to_string(),
            });
            lines.extend(lines_of(text).map(str::to_string));
        }

        let mut text = lines.join("\n");
        text.push('\n');
        Self { text, provenance }
    }

    /// The text handed to the compiler.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The provenance table, ordered by start.
    pub fn provenance(&self) -> &[ProvenanceEntry] {
        &self.provenance
    }

    /// Maps a 1-based compiler line number back to its origin.
    pub fn line_origin(&self, line: usize) -> Option<LineOrigin> {
        let entry = self
            .provenance
            .iter()
            .take_while(|entry| entry.start <= line)
            .last()?;
        Some(LineOrigin {
            line: line - entry.start,
            label: entry.label.clone(),
        })
    }

    /// Copies a compiler log, adding an `At: line N in F` line under every
    /// line that carries a recognizable line number.
    pub fn localize_log(&self, log: &str) -> String {
        let mut output = String::with_capacity(log.len());
        for line in log.lines() {
            output.push_str(line);
            output.push('\n');
            if let Some(origin) = reported_line(line).and_then(|n| self.line_origin(n)) {
                output.push_str("At: ");
                output.push_str(&origin.to_string());
                output.push('\n');
            }
        }
        output
    }

    /// Renders the text with 1-based line numbers, for debugging.
    pub fn numbered_listing(&self) -> String {
        lines_of(&self.text)
            .enumerate()
            .map(|(index, line)| format!("{}: {line}\n", index + 1))
            .collect()
    }
}

/// Extracts the line number from either known vendor log format:
/// `ERROR: <source>:<line>: ...` or `<source>(<line>) ...`.
fn reported_line(line: &str) -> Option<usize> {
    labeled_line(line).or_else(|| terse_line(line))
}

fn labeled_line(line: &str) -> Option<usize> {
    let rest = line.strip_prefix("ERROR:")?;
    let mut fields = rest.split(':');
    fields.next()?;
    fields.next()?.trim().parse().ok()
}

fn terse_line(line: &str) -> Option<usize> {
    let rest = line.trim_start();
    let open = rest.find('(')?;
    if open == 0 || !rest[..open].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let inner = &rest[open + 1..];
    let close = inner.find(')')?;
    inner[..close].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResolvedUnit {
        ResolvedUnit::from_parts(
            "",
            vec![
                ProvenanceEntry { start: 0, label: "header".into() },
                ProvenanceEntry { start: 3, label: "a.glsl".into() },
                ProvenanceEntry { start: 10, label: "b.glsl".into() },
            ],
        )
    }

    #[test]
    fn line_origin_uses_last_entry_at_or_before() {
        let unit = sample();
        assert_eq!(unit.line_origin(12).unwrap().to_string(), "line 2 in b.glsl");
        assert_eq!(unit.line_origin(10).unwrap().to_string(), "line 0 in b.glsl");
        assert_eq!(unit.line_origin(4).unwrap().to_string(), "line 1 in a.glsl");
        assert_eq!(unit.line_origin(2).unwrap().to_string(), "line 2 in header");
    }

    #[test]
    fn both_vendor_formats_are_localized() {
        let unit = sample();
        let log = "ERROR: 0:12: 'foo' : undeclared identifier\n0(12) : error C1008: undefined variable \"foo\"\nwarning: nothing to map\n";
        let localized = unit.localize_log(log);
        let lines: Vec<_> = localized.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ERROR: 0:12: 'foo' : undeclared identifier",
                "At: line 2 in b.glsl",
                "0(12) : error C1008: undefined variable \"foo\"",
                "At: line 2 in b.glsl",
                "warning: nothing to map",
            ]
        );
    }

    #[test]
    fn unrecognized_numbers_are_left_alone() {
        assert_eq!(reported_line("ERROR: 0:abc: nope"), None);
        assert_eq!(reported_line("x(12) nope"), None);
        assert_eq!(reported_line("(12) nope"), None);
        assert_eq!(reported_line("ERROR: 0:7: yes"), Some(7));
        assert_eq!(reported_line("  3(41) : error"), Some(41));
    }

    #[test]
    fn assembled_provenance_points_at_file_lines() {
        let macros = [MacroDefinition::new("SHADOWS", "1")];
        let unit = ResolvedUnit::assemble(
            "450 core",
            "#extension GL_ARB_separate_shader_objects : enable",
            &macros,
            [("lib.glsl", "float f();\nfloat g();\n"), ("main.frag", "void main() {}")],
        );

        let lines: Vec<_> = unit.text().lines().collect();
        assert_eq!(lines[0], "#version 450 core");
        assert_eq!(lines[2], "#define SHADOWS 1");
        assert_eq!(lines[3], "/* File: lib.glsl */");
        assert_eq!(lines[6], "/* File: main.frag */");

        // Compiler lines are 1-based: "float g();" is line 6 of the unit.
        assert_eq!(lines[5], "float g();");
        assert_eq!(unit.line_origin(6).unwrap().to_string(), "line 2 in lib.glsl");
        assert_eq!(unit.line_origin(8).unwrap().to_string(), "line 1 in main.frag");
        assert_eq!(unit.line_origin(2).unwrap().label, PREAMBLE_LABEL);
    }

    #[test]
    fn provenance_starts_strictly_increase() {
        let unit = ResolvedUnit::assemble("450", "", &[], [("a", ""), ("b", "x"), ("c", "y\nz")]);
        let starts: Vec<_> = unit.provenance().iter().map(|e| e.start).collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn numbered_listing_is_one_based() {
        let unit = ResolvedUnit::assemble("450", "", &[], [("a.glsl", "x;")]);
        assert_eq!(
            unit.numbered_listing(),
            "1: #version 450\n2: /* File: a.glsl */\n3: x;\n"
        );
    }
}
