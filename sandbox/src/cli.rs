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

use clap::{value_parser, Args, Parser, Subcommand};
use kiln_core::{MacroDefinition, RepositorySettings, ShaderStage};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "kiln-sandbox", version)]
#[command(about = "Resolve, compile and hot-reload GLSL shaders against a headless device")]
pub struct CliArgs {
    /// Settings manifest. Missing files fall back to defaults.
    #[arg(long, default_value = "Shaders.toml")]
    pub config: PathBuf,

    /// Shader source directory. Overrides `source_root` from the manifest.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Version used for files without a `#version` line.
    #[arg(long)]
    pub default_version: Option<String>,

    /// Print the numbered resolved text of programs that fail to compile.
    #[arg(long)]
    pub dump_resolved: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct ProgramArgs {
    /// Entry files, relative to the source root.
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Stage to compile for. Guessed from the file extension when omitted.
    #[arg(long, value_parser = value_parser!(ShaderStage))]
    pub stage: Option<ShaderStage>,

    /// Macro to inject, as NAME or NAME=VALUE. Repeatable; order is kept.
    #[arg(short = 'D', long = "define", value_parser = value_parser!(MacroDefinition))]
    pub defines: Vec<MacroDefinition>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the text a program is compiled from.
    Resolve {
        #[command(flatten)]
        program: ProgramArgs,
        /// Prefix every line with its number.
        #[arg(long)]
        numbered: bool,
        /// Also write the text to the resolved-cache path.
        #[arg(long)]
        write: bool,
    },
    /// Compile programs once and report their state.
    Compile {
        #[command(flatten)]
        program: ProgramArgs,
    },
    /// Compile programs, then recompile them whenever their sources change.
    Watch {
        #[command(flatten)]
        program: ProgramArgs,
        /// Delay between update passes, in milliseconds.
        #[arg(long, default_value_t = 100)]
        poll_ms: u64,
        /// Stop after this many update passes.
        #[arg(long)]
        iterations: Option<u64>,
    },
}

impl CliArgs {
    /// Loads the manifest and applies command-line overrides.
    ///
    /// Returns the settings and the directory sources are read from.
    pub fn settings(&self) -> anyhow::Result<(RepositorySettings, PathBuf)> {
        let mut settings = RepositorySettings::load(&self.config)?;
        if let Some(version) = &self.default_version {
            settings.default_version = version.clone();
        }
        if self.dump_resolved {
            settings.dump_resolved_on_error = true;
        }

        let root = match &self.root {
            Some(root) => {
                settings.source_root = root.to_string_lossy().into_owned();
                root.clone()
            }
            None => self
                .config
                .parent()
                .unwrap_or(Path::new(""))
                .join(&settings.source_root),
        };
        Ok((settings, root))
    }
}

impl ProgramArgs {
    /// The stage for `file`: the explicit `--stage`, or the one its extension implies.
    pub fn stage_for(&self, file: &str) -> anyhow::Result<ShaderStage> {
        self.stage
            .or_else(|| ShaderStage::from_path(file))
            .ok_or_else(|| anyhow::anyhow!("cannot guess the stage of '{file}', pass --stage"))
    }
}
