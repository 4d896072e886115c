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

//! Preprocessor macro definitions injected into resolved shader text.

use std::fmt;
use std::str::FromStr;

/// One `#define name value` line, as requested by the caller of a program.
///
/// The order of definitions is part of a program's identity, so lists of
/// these are kept exactly as the caller supplied them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacroDefinition {
    /// The macro name.
    pub name: String,
    /// The replacement text, possibly empty.
    pub value: String,
}

impl MacroDefinition {
    /// Creates a new definition.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parses the command-line form `NAME` or `NAME=VALUE`.
    pub fn parse(text: &str) -> Option<Self> {
        let (name, value) = match text.split_once('=') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => (text.trim(), ""),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value))
    }

    /// Renders the `#define` line, without a trailing newline.
    pub fn to_define_line(&self) -> String {
        format!("#define {} {}", self.name, self.value)
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for MacroDefinition {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

impl fmt::Display for MacroDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}={}", self.name, self.value)
        }
    }
}

impl FromStr for MacroDefinition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid macro definition '{s}', expected NAME[=VALUE]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_define_line() {
        let def = MacroDefinition::new("MAX_LIGHTS", "16");
        assert_eq!(def.to_define_line(), "#define MAX_LIGHTS 16");
    }

    #[test]
    fn parses_command_line_form() {
        assert_eq!(
            MacroDefinition::parse("SHADOWS=1"),
            Some(MacroDefinition::new("SHADOWS", "1"))
        );
        assert_eq!(
            MacroDefinition::parse("DEBUG"),
            Some(MacroDefinition::new("DEBUG", ""))
        );
        assert_eq!(MacroDefinition::parse("=1"), None);
    }

    #[test]
    fn from_tuple() {
        let def: MacroDefinition = ("A", "2").into();
        assert_eq!(def.to_string(), "A=2");
    }
}
