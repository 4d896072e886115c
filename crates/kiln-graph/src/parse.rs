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

//! Line-preserving `#version` and `#include` directive parsing.

use kiln_core::normalize_path;

/// Replaces a `#version` line in parsed text.
pub const VERSION_MARKER: &str = "//#version";
/// Replaces an `#include` line in parsed text.
pub const INCLUDE_MARKER: &str = "//#include";

/// The result of parsing one shader file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSource {
    /// The text with directives replaced by markers. Has exactly as many
    /// lines as the input.
    pub text: String,
    /// The argument of the first `#version` directive, if any.
    pub version: Option<String>,
    /// How many `#version` directives the file contains.
    pub version_count: usize,
    /// Normalized include paths, in the order they appear.
    pub includes: Vec<String>,
}

enum Directive<'a> {
    Version(&'a str),
    Include(&'a str),
}

/// Matches `<ws>#<keyword><ws><argument>` and returns the trimmed argument.
fn directive_argument<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.trim_start().strip_prefix('#')?.strip_prefix(keyword)?;
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let argument = rest.trim();
    (!argument.is_empty()).then_some(argument)
}

fn classify(line: &str) -> Option<Directive<'_>> {
    if let Some(argument) = directive_argument(line, "version") {
        return Some(Directive::Version(argument));
    }
    directive_argument(line, "include").map(Directive::Include)
}

/// Strips one pair of surrounding quotes or angle brackets and normalizes the path.
pub fn include_path(argument: &str) -> String {
    let argument = argument.trim();
    let unquoted = argument
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| argument.strip_prefix('<').and_then(|s| s.strip_suffix('>')))
        .unwrap_or(argument);
    normalize_path(unquoted)
}

/// Parses shader text, commenting out directives in place.
///
/// CRLF line endings are converted to LF. Every other character of a
/// non-directive line is kept, so line `n` of the output is line `n` of the
/// input.
pub fn parse_source(source: &str) -> ParsedSource {
    let source = source.replace("\r\n", "\n");
    let mut parsed = ParsedSource::default();
    let mut lines = Vec::new();

    for line in source.split('\n') {
        match classify(line) {
            Some(Directive::Version(argument)) => {
                if parsed.version.is_none() {
                    parsed.version = Some(argument.to_string());
                }
                parsed.version_count += 1;
                lines.push(VERSION_MARKER);
            }
            Some(Directive::Include(argument)) => {
                let path = include_path(argument);
                if !path.is_empty() {
                    parsed.includes.push(path);
                }
                lines.push(INCLUDE_MARKER);
            }
            None => lines.push(line),
        }
    }

    parsed.text = lines.join("\n");
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_become_markers_in_place() {
        let source = "#version 450 core\n#include \"common.glsl\"\nvoid main() {}\n";
        let parsed = parse_source(source);
        assert_eq!(parsed.text, "//#version\n//#include\nvoid main() {}\n");
        assert_eq!(parsed.version.as_deref(), Some("450 core"));
        assert_eq!(parsed.includes, vec!["common.glsl".to_string()]);
    }

    #[test]
    fn line_count_and_content_are_preserved() {
        let source = "// header\n  #include <lib/a.glsl>\n\nfloat x;\n   #version 330\nint y;";
        let parsed = parse_source(source);
        let before: Vec<_> = source.split('\n').collect();
        let after: Vec<_> = parsed.text.split('\n').collect();
        assert_eq!(before.len(), after.len());
        for (index, (original, output)) in before.iter().zip(&after).enumerate() {
            if classify(original).is_some() {
                assert!(output.len() <= original.len(), "line {index} grew");
                assert!(output.starts_with("//#"));
            } else {
                assert_eq!(original, output, "line {index} changed");
            }
        }
    }

    #[test]
    fn crlf_is_converted_without_changing_line_count() {
        let parsed = parse_source("a\r\n#include x.glsl\r\nb\r\n");
        assert_eq!(parsed.text, "a\n//#include\nb\n");
    }

    #[test]
    fn first_version_wins_and_all_are_counted() {
        let parsed = parse_source("#version 450\n#version 330\n");
        assert_eq!(parsed.version.as_deref(), Some("450"));
        assert_eq!(parsed.version_count, 2);
        assert_eq!(parsed.text, "//#version\n//#version\n");
    }

    #[test]
    fn missing_version_is_none() {
        let parsed = parse_source("void main() {}");
        assert_eq!(parsed.version, None);
        assert_eq!(parsed.version_count, 0);
    }

    #[test]
    fn near_miss_lines_are_not_directives() {
        for line in [
            "#includes \"a\"",
            "#include",
            "#include   ",
            "// #include \"a\"",
            "#versions 450",
            "x #version 450",
        ] {
            let parsed = parse_source(line);
            assert_eq!(parsed.text, line);
            assert!(parsed.includes.is_empty());
            assert!(parsed.version.is_none());
        }
    }

    #[test]
    fn include_arguments_are_unquoted_and_normalized() {
        assert_eq!(include_path("\"common/./math.glsl\""), "common/math.glsl");
        assert_eq!(include_path("<lib\\noise.glsl>"), "lib/noise.glsl");
        assert_eq!(include_path("  plain.glsl "), "plain.glsl");
        assert_eq!(include_path("\"a/../b.glsl\""), "b.glsl");
    }
}
