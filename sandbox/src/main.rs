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

// Kiln Sandbox
// Resolves, compiles and hot-reloads shaders against the headless device.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{CliArgs, Command, ProgramArgs};
use kiln_infra::HeadlessDevice;
use kiln_io::FsSourceProvider;
use kiln_shaders::{ProgramId, ShaderRepository};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn load_programs(repo: &mut ShaderRepository, args: &ProgramArgs) -> Result<Vec<ProgramId>> {
    args.files
        .iter()
        .map(|file| {
            let stage = args.stage_for(file)?;
            Ok(repo.get_or_create_program(file, stage, &args.defines))
        })
        .collect()
}

fn report(repo: &ShaderRepository, programs: &[ProgramId]) -> usize {
    let mut failed = 0;
    for &id in programs {
        let Some(program) = repo.program(id) else {
            continue;
        };
        if program.is_valid() {
            log::info!("{}: ok", program.key());
        } else {
            log::error!("{}: {:?}", program.key(), program.state());
            failed += 1;
        }
    }
    failed
}

fn resolve(repo: &mut ShaderRepository, args: &ProgramArgs, numbered: bool, write: bool) -> Result<()> {
    for (file, id) in args.files.iter().zip(load_programs(repo, args)?) {
        let unit = repo
            .resolve_program(id)
            .with_context(|| format!("program for '{file}' disappeared"))?;
        if numbered {
            print!("{}", unit.numbered_listing());
        } else {
            print!("{}", unit.text());
        }

        if write {
            let path = repo.provider().resolved_cache_path(file);
            if let Some(parent) = Path::new(&path).parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create '{}'", parent.display()))?;
            }
            std::fs::write(&path, unit.text())
                .with_context(|| format!("failed to write '{path}'"))?;
            log::info!("Wrote resolved text of {file} to {path}");
        }
    }
    Ok(())
}

fn compile(repo: &mut ShaderRepository, args: &ProgramArgs) -> Result<()> {
    let programs = load_programs(repo, args)?;
    let failed = report(repo, &programs);
    if failed > 0 {
        bail!("{failed} of {} programs failed to compile", programs.len());
    }
    Ok(())
}

fn watch(
    repo: &mut ShaderRepository,
    root: &Path,
    args: &ProgramArgs,
    poll: Duration,
    iterations: Option<u64>,
) -> Result<()> {
    let programs = load_programs(repo, args)?;
    report(repo, &programs);
    if !repo.settings().watch_for_changes {
        log::warn!("watch_for_changes is disabled in the settings, nothing to do");
        return Ok(());
    }

    repo.start_file_watcher(root)?;
    let mut pass = 0u64;
    while iterations.is_none_or(|limit| pass < limit) {
        if repo.update() > 0 {
            report(repo, &programs);
        }
        std::thread::sleep(poll);
        pass += 1;
    }
    Ok(())
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("notify", log::LevelFilter::Warn)
        .init();

    let args = CliArgs::parse();
    let (settings, root) = args.settings()?;
    log::debug!("Shader root: {}", root.display());

    let device = Arc::new(HeadlessDevice::new());
    let provider = Arc::new(FsSourceProvider::new(&root));
    let mut repo = ShaderRepository::new(device, provider, settings);

    let result = match &args.command {
        Command::Resolve {
            program,
            numbered,
            write,
        } => resolve(&mut repo, program, *numbered, *write),
        Command::Compile { program } => compile(&mut repo, program),
        Command::Watch {
            program,
            poll_ms,
            iterations,
        } => watch(
            &mut repo,
            &root,
            program,
            Duration::from_millis(*poll_ms),
            *iterations,
        ),
    };

    log::info!("{}", repo.stats());
    result
}
