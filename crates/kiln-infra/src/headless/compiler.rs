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

//! The rule set the headless device "compiles" shader text with.

use kiln_core::ShaderStage;

/// Which vendor style compile logs are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// `ERROR: 0:<line>: <message>`
    #[default]
    Labeled,
    /// `0(<line>) : error C0000: <message>`
    Terse,
}

/// What a compile attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompileOutput {
    pub linked: bool,
    pub log: String,
    pub work_group_size: [u32; 3],
    pub uniforms: Vec<String>,
}

/// Checks `source` for a stage.
///
/// A source fails when any line starts with `#error` or when it does not begin
/// with a `#version` line. Compute sources report the sizes declared by
/// `layout(local_size_x = ...)`.
pub(crate) fn compile(stage: ShaderStage, source: &str, format: LogFormat) -> CompileOutput {
    let mut errors = Vec::new();

    if !source.trim_start().starts_with("#version") {
        errors.push((1, "missing #version directive".to_string()));
    }
    for (index, line) in source.lines().enumerate() {
        if let Some(message) = line.trim_start().strip_prefix("#error") {
            errors.push((index + 1, format!("#error{message}")));
        }
    }

    let log = errors
        .iter()
        .map(|(line, message)| match format {
            LogFormat::Labeled => format!("ERROR: 0:{line}: {message}\n"),
            LogFormat::Terse => format!("0({line}) : error C0000: {message}\n"),
        })
        .collect();

    let work_group_size = if stage == ShaderStage::Compute {
        local_size(source)
    } else {
        [0; 3]
    };

    CompileOutput {
        linked: errors.is_empty(),
        log,
        work_group_size,
        uniforms: uniform_names(source),
    }
}

/// Reads `layout(local_size_x = X, local_size_y = Y, local_size_z = Z) in;`.
/// Missing dimensions default to 1.
fn local_size(source: &str) -> [u32; 3] {
    let mut size = [1; 3];
    for line in source.lines() {
        let line = line.trim();
        let Some(body) = line
            .strip_prefix("layout")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.split_once(')'))
            .filter(|(_, tail)| tail.trim_start().starts_with("in"))
            .map(|(body, _)| body)
        else {
            continue;
        };
        for qualifier in body.split(',') {
            let Some((key, value)) = qualifier.split_once('=') else {
                continue;
            };
            let slot = match key.trim() {
                "local_size_x" => 0,
                "local_size_y" => 1,
                "local_size_z" => 2,
                _ => continue,
            };
            if let Ok(value) = value.trim().parse() {
                size[slot] = value;
            }
        }
    }
    size
}

/// Collects the names of plain `uniform <type> <name>;` declarations.
fn uniform_names(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let declaration = line.trim().strip_prefix("uniform ")?.strip_suffix(';')?;
            let name = declaration.split_whitespace().last()?;
            let name = name.split('[').next().unwrap_or(name);
            let is_identifier =
                !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            is_identifier.then(|| name.to_string())
        })
        .collect()
}
