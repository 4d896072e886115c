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

//! The shader repository: caches, pipeline binding and hot reload.

use crate::error::RepositoryError;
use crate::pipeline::{Pipeline, PipelineDescriptor, PipelineId};
use crate::program::{CompiledProgram, ProgramId, ProgramKey};
use kiln_core::{
    normalize_path, DiagnosticSink, LogDiagnosticSink, MacroDefinition, ProgramDevice,
    RepositorySettings, ShaderStage, SourceProvider,
};
use kiln_graph::{ResolvedUnit, SourceGraph, SourceId, SourceNode};
use kiln_io::{ChangeNotifier, ChangeQueue, DirectoryWatcher};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Counters describing a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepositoryStats {
    /// Interned source files.
    pub sources: usize,
    /// Cached programs.
    pub programs: usize,
    /// Cached pipelines.
    pub pipelines: usize,
    /// Compile attempts, initial and hot-reload.
    pub compilations: u64,
    /// Compile attempts that left a program Invalid.
    pub failed_compilations: u64,
}

impl fmt::Display for RepositoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sources, {} programs, {} pipelines, {} compilations ({} failed)",
            self.sources, self.programs, self.pipelines, self.compilations, self.failed_compilations
        )
    }
}

/// Owns every source node, program and pipeline of one graphics context.
///
/// All mutation happens on the owning thread. The only state shared with
/// other threads is the change queue, fed by the directory watcher or by
/// [`ChangeNotifier`]s and drained by [`ShaderRepository::update`].
#[derive(Debug)]
pub struct ShaderRepository {
    device: Arc<dyn ProgramDevice>,
    provider: Arc<dyn SourceProvider>,
    sink: Arc<dyn DiagnosticSink>,
    settings: RepositorySettings,
    graph: SourceGraph,
    programs: Vec<CompiledProgram>,
    program_index: HashMap<ProgramKey, ProgramId>,
    /// Programs by entry node.
    usages: HashMap<SourceId, Vec<ProgramId>>,
    pipelines: Vec<Pipeline>,
    pipeline_index: HashMap<PipelineDescriptor, PipelineId>,
    /// Pipelines by program.
    dependents: HashMap<ProgramId, Vec<PipelineId>>,
    bound_pipeline: Option<PipelineId>,
    changes: ChangeQueue,
    watcher: Option<DirectoryWatcher>,
    compilations: u64,
    failed_compilations: u64,
}

impl ShaderRepository {
    /// Creates a repository reporting diagnostics through the `log` facade.
    pub fn new(
        device: Arc<dyn ProgramDevice>,
        provider: Arc<dyn SourceProvider>,
        settings: RepositorySettings,
    ) -> Self {
        Self::with_diagnostics(device, provider, Arc::new(LogDiagnosticSink), settings)
    }

    /// Creates a repository reporting diagnostics to `sink`.
    pub fn with_diagnostics(
        device: Arc<dyn ProgramDevice>,
        provider: Arc<dyn SourceProvider>,
        sink: Arc<dyn DiagnosticSink>,
        settings: RepositorySettings,
    ) -> Self {
        Self {
            device,
            provider,
            sink,
            graph: SourceGraph::new(settings.default_version.clone()),
            settings,
            programs: Vec::new(),
            program_index: HashMap::new(),
            usages: HashMap::new(),
            pipelines: Vec::new(),
            pipeline_index: HashMap::new(),
            dependents: HashMap::new(),
            bound_pipeline: None,
            changes: ChangeQueue::new(),
            watcher: None,
            compilations: 0,
            failed_compilations: 0,
        }
    }

    /// The settings this repository was created with.
    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    /// The storage sources are read from.
    pub fn provider(&self) -> &dyn SourceProvider {
        self.provider.as_ref()
    }

    /// The source graph.
    pub fn graph(&self) -> &SourceGraph {
        &self.graph
    }

    /// Returns the interned node for `path`, parsing it on first reference.
    pub fn get_or_create_source(&mut self, path: &str) -> SourceId {
        self.graph
            .get_or_create(path, self.provider.as_ref(), self.sink.as_ref())
    }

    /// The node behind an id returned by this repository.
    pub fn source(&self, id: SourceId) -> &SourceNode {
        self.graph.node(id)
    }

    /// Returns the program for `(path, stage, macros)`, compiling it on first request.
    ///
    /// Equal keys always return the same id. A compile failure still yields a
    /// program, in the Invalid state; the failure goes to the diagnostics sink.
    pub fn get_or_create_program(
        &mut self,
        path: &str,
        stage: ShaderStage,
        macros: &[MacroDefinition],
    ) -> ProgramId {
        let key = ProgramKey {
            path: normalize_path(path),
            stage,
            macros: macros.to_vec(),
        };
        if let Some(&id) = self.program_index.get(&key) {
            return id;
        }

        let entry = self.get_or_create_source(&key.path);
        let id = ProgramId(self.programs.len());
        self.programs
            .push(CompiledProgram::new(key.clone(), entry, self.device.clone()));
        self.program_index.insert(key, id);
        self.usages.entry(entry).or_default().push(id);
        self.compile_program(id);
        id
    }

    /// Looks up a cached program without creating it.
    pub fn find_program(
        &self,
        path: &str,
        stage: ShaderStage,
        macros: &[MacroDefinition],
    ) -> Option<ProgramId> {
        let key = ProgramKey {
            path: normalize_path(path),
            stage,
            macros: macros.to_vec(),
        };
        self.program_index.get(&key).copied()
    }

    /// The program behind `id`.
    pub fn program(&self, id: ProgramId) -> Option<&CompiledProgram> {
        self.programs.get(id.0)
    }

    /// Mutable access to a program, for setting uniforms and block bindings.
    pub fn program_mut(&mut self, id: ProgramId) -> Option<&mut CompiledProgram> {
        self.programs.get_mut(id.0)
    }

    /// Iterates over every cached program.
    pub fn programs(&self) -> impl Iterator<Item = (ProgramId, &CompiledProgram)> {
        self.programs
            .iter()
            .enumerate()
            .map(|(index, program)| (ProgramId(index), program))
    }

    /// Builds the text a program is compiled from, as it would be right now.
    pub fn resolve_program(&self, id: ProgramId) -> Option<ResolvedUnit> {
        let program = self.programs.get(id.0)?;
        Some(self.graph.resolve(
            program.entry(),
            &self.settings.shared_header,
            program.macros(),
            self.sink.as_ref(),
        ))
    }

    fn compile_program(&mut self, id: ProgramId) -> bool {
        let (entry, macros) = {
            let program = &self.programs[id.0];
            (program.entry(), program.macros().to_vec())
        };
        let unit = self.graph.resolve(
            entry,
            &self.settings.shared_header,
            &macros,
            self.sink.as_ref(),
        );
        let compiled = self.programs[id.0].compile(
            &unit,
            self.sink.as_ref(),
            self.settings.dump_resolved_on_error,
        );
        self.compilations += 1;
        if !compiled {
            self.failed_compilations += 1;
        }
        compiled
    }

    /// Returns the pipeline for `descriptor`, creating it on first request.
    ///
    /// Equal descriptors share one pipeline. Its driver object is built on the
    /// first bind.
    /// ## Errors
    /// * `RepositoryError` - If the descriptor is empty, names an unknown
    ///   program, or puts a program in a slot of another stage.
    pub fn get_or_create_pipeline(
        &mut self,
        descriptor: PipelineDescriptor,
    ) -> Result<PipelineId, RepositoryError> {
        if descriptor.is_empty() {
            return Err(RepositoryError::EmptyPipeline);
        }
        for (slot, program_id) in descriptor.programs() {
            let program = self
                .programs
                .get(program_id.0)
                .ok_or(RepositoryError::UnknownProgram(program_id))?;
            if program.stage() != slot {
                return Err(RepositoryError::StageMismatch {
                    program: program_id,
                    slot,
                    actual: program.stage(),
                });
            }
        }

        if let Some(&id) = self.pipeline_index.get(&descriptor) {
            return Ok(id);
        }
        let id = PipelineId(self.pipelines.len());
        self.pipelines.push(Pipeline::new(descriptor));
        self.pipeline_index.insert(descriptor, id);
        for (_, program_id) in descriptor.programs() {
            self.dependents.entry(program_id).or_default().push(id);
        }
        log::debug!("Created {id} with {} stages", descriptor.programs().count());
        Ok(id)
    }

    /// The pipeline behind `id`.
    pub fn pipeline(&self, id: PipelineId) -> Option<&Pipeline> {
        self.pipelines.get(id.0)
    }

    /// Makes a pipeline current, rebuilding it first if it is dirty.
    ///
    /// Binding the pipeline that is already bound and clean issues no driver call.
    /// ## Errors
    /// * `RepositoryError` - If the id is unknown or the driver object could not be created.
    pub fn bind_pipeline(&mut self, id: PipelineId) -> Result<(), RepositoryError> {
        let pipeline = self
            .pipelines
            .get_mut(id.0)
            .ok_or(RepositoryError::UnknownPipeline(id))?;

        let handle = if pipeline.is_dirty() {
            pipeline.rebuild(self.device.as_ref(), &self.programs)?
        } else if self.bound_pipeline == Some(id) {
            return Ok(());
        } else {
            match pipeline.handle() {
                Some(handle) => handle,
                None => pipeline.rebuild(self.device.as_ref(), &self.programs)?,
            }
        };

        self.device.bind_pipeline(handle);
        self.bound_pipeline = Some(id);
        Ok(())
    }

    /// The pipeline bound last, if the binding is still known.
    pub fn bound_pipeline(&self) -> Option<PipelineId> {
        self.bound_pipeline
    }

    /// Forgets which pipeline is bound, so the next bind always reaches the driver.
    ///
    /// Call this after other code changed the driver's pipeline binding.
    pub fn invalidate_bindings(&mut self) {
        self.bound_pipeline = None;
    }

    /// The Valid compute program of the bound, clean pipeline.
    fn bound_compute_program(&self) -> Option<&CompiledProgram> {
        let pipeline = self.pipelines.get(self.bound_pipeline?.0)?;
        if pipeline.is_dirty() {
            log::warn!("Dispatch skipped: the bound pipeline must be rebound after a reload");
            return None;
        }
        let id = pipeline.descriptor().stage(ShaderStage::Compute)?;
        self.programs.get(id.0).filter(|program| program.is_valid())
    }

    /// Dispatches work groups with the bound pipeline's compute stage.
    ///
    /// Does nothing if no compute pipeline is bound or its program is Invalid.
    pub fn dispatch_compute_groups(&self, x: u32, y: u32, z: u32) {
        if self.bound_compute_program().is_some() {
            self.device.dispatch_compute([x, y, z]);
        }
    }

    /// Dispatches enough work groups to cover `x * y * z` invocations.
    pub fn dispatch_compute_threads(&self, x: u32, y: u32, z: u32) {
        let Some(program) = self.bound_compute_program() else {
            return;
        };
        let [gx, gy, gz] = program.work_group_size();
        if gx == 0 || gy == 0 || gz == 0 {
            return;
        }
        self.device
            .dispatch_compute([x.div_ceil(gx), y.div_ceil(gy), z.div_ceil(gz)]);
    }

    /// A producer handle for the change queue drained by [`Self::update`].
    pub fn change_notifier(&self) -> ChangeNotifier {
        self.changes.notifier()
    }

    /// Starts watching `root` for changes. Paths are reported relative to it.
    /// ## Errors
    /// * `RepositoryError::Watch` - If the directory cannot be watched.
    pub fn start_file_watcher(&mut self, root: impl AsRef<Path>) -> Result<(), RepositoryError> {
        self.watcher = Some(DirectoryWatcher::start(root, self.changes.notifier())?);
        Ok(())
    }

    /// Stops the directory watcher, if any.
    pub fn stop_file_watcher(&mut self) {
        self.watcher = None;
    }

    /// `true` while a directory watcher is running.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Applies every queued file change.
    ///
    /// Changed nodes are re-parsed, then every program whose entry file is a
    /// changed node or transitively includes one is recompiled once, and the
    /// pipelines using those programs are marked dirty. Returns the number of
    /// recompiled programs. Everything happens before this returns.
    pub fn update(&mut self) -> usize {
        if self.changes.is_empty() {
            return 0;
        }

        let changed = self.changes.drain();
        let mut seeds = Vec::new();
        for path in &changed {
            match self.graph.find(path) {
                Some(id) => {
                    self.graph
                        .reparse(id, self.provider.as_ref(), self.sink.as_ref());
                    seeds.push(id);
                }
                None => log::trace!("Ignoring change to unused shader file {path}"),
            }
        }
        if seeds.is_empty() {
            return 0;
        }

        let affected = self.graph.includers_closure(seeds);
        let programs: BTreeSet<ProgramId> = affected
            .iter()
            .filter_map(|source| self.usages.get(source))
            .flatten()
            .copied()
            .collect();

        for &id in &programs {
            self.compile_program(id);
            if let Some(pipelines) = self.dependents.get(&id) {
                for pipeline in pipelines {
                    self.pipelines[pipeline.0].mark_dirty();
                }
            }
        }

        log::info!(
            "Shader reload: {} file(s) changed, {} program(s) recompiled",
            changed.len(),
            programs.len()
        );
        programs.len()
    }

    /// Current counters.
    pub fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            sources: self.graph.len(),
            programs: self.programs.len(),
            pipelines: self.pipelines.len(),
            compilations: self.compilations,
            failed_compilations: self.failed_compilations,
        }
    }
}

impl Drop for ShaderRepository {
    fn drop(&mut self) {
        for pipeline in &mut self.pipelines {
            pipeline.dispose(self.device.as_ref());
        }
        for program in &mut self.programs {
            program.dispose();
        }
        log::debug!(
            "ShaderRepository: Destroyed {} programs and {} pipelines",
            self.programs.len(),
            self.pipelines.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_infra::{DeviceCall, HeadlessDevice};
    use kiln_io::MemorySourceProvider;

    fn repository(files: &[(&str, &str)]) -> (ShaderRepository, Arc<HeadlessDevice>) {
        let device = Arc::new(HeadlessDevice::new());
        let provider = Arc::new(MemorySourceProvider::with_files(files.iter().copied()));
        let repo = ShaderRepository::new(device.clone(), provider, RepositorySettings::default());
        (repo, device)
    }

    #[test]
    fn empty_descriptor_is_rejected() {
        let (mut repo, _) = repository(&[]);
        assert!(matches!(
            repo.get_or_create_pipeline(PipelineDescriptor::new()),
            Err(RepositoryError::EmptyPipeline)
        ));
    }

    #[test]
    fn unknown_program_is_rejected() {
        let (mut repo, _) = repository(&[]);
        let err = repo
            .get_or_create_pipeline(PipelineDescriptor::compute(ProgramId(3)))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownProgram(ProgramId(3))));
    }

    #[test]
    fn stage_mismatch_is_rejected() {
        let (mut repo, _) = repository(&[("a.frag", "#version 450\nvoid main() {}\n")]);
        let fragment = repo.get_or_create_program("a.frag", ShaderStage::Fragment, &[]);
        let err = repo
            .get_or_create_pipeline(PipelineDescriptor::compute(fragment))
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::StageMismatch {
                slot: ShaderStage::Compute,
                actual: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn rebinding_a_clean_pipeline_is_skipped_until_invalidated() {
        let (mut repo, device) = repository(&[("c.comp", "layout(local_size_x = 8) in;\nvoid main() {}\n")]);
        let program = repo.get_or_create_program("c.comp", ShaderStage::Compute, &[]);
        let pipeline = repo
            .get_or_create_pipeline(PipelineDescriptor::compute(program))
            .unwrap();
        device.clear_calls();

        repo.bind_pipeline(pipeline).unwrap();
        repo.bind_pipeline(pipeline).unwrap();
        let binds = |calls: Vec<DeviceCall>| {
            calls
                .into_iter()
                .filter(|c| matches!(c, DeviceCall::BindPipeline(_)))
                .count()
        };
        assert_eq!(binds(device.calls()), 1);

        repo.invalidate_bindings();
        repo.bind_pipeline(pipeline).unwrap();
        assert_eq!(binds(device.calls()), 2);
        assert_eq!(repo.pipeline(pipeline).unwrap().build_count(), 1);
    }

    #[test]
    fn dispatch_threads_rounds_up_to_whole_groups() {
        let (mut repo, device) = repository(&[("c.comp", "layout(local_size_x = 8, local_size_y = 4) in;\n")]);
        let program = repo.get_or_create_program("c.comp", ShaderStage::Compute, &[]);
        let pipeline = repo
            .get_or_create_pipeline(PipelineDescriptor::compute(program))
            .unwrap();

        repo.dispatch_compute_groups(1, 1, 1);
        assert!(!device.calls().contains(&DeviceCall::DispatchCompute([1, 1, 1])));

        repo.bind_pipeline(pipeline).unwrap();
        repo.dispatch_compute_threads(17, 4, 1);
        repo.dispatch_compute_groups(2, 2, 2);
        let calls = device.calls();
        assert!(calls.contains(&DeviceCall::DispatchCompute([3, 1, 1])));
        assert!(calls.contains(&DeviceCall::DispatchCompute([2, 2, 2])));
    }

    #[test]
    fn drop_releases_every_driver_object() {
        let (mut repo, device) = repository(&[
            ("a.vert", "void main() {}\n"),
            ("a.frag", "void main() {}\n"),
        ]);
        let vertex = repo.get_or_create_program("a.vert", ShaderStage::Vertex, &[]);
        let fragment = repo.get_or_create_program("a.frag", ShaderStage::Fragment, &[]);
        let pipeline = repo
            .get_or_create_pipeline(PipelineDescriptor::graphics(vertex, fragment))
            .unwrap();
        repo.bind_pipeline(pipeline).unwrap();
        assert_eq!(device.live_programs(), 2);
        assert_eq!(device.live_pipelines(), 1);

        drop(repo);
        assert_eq!(device.live_programs(), 0);
        assert_eq!(device.live_pipelines(), 0);
    }

    #[test]
    fn stats_count_failures() {
        let (mut repo, _) = repository(&[("bad.frag", "#error nope\n"), ("good.frag", "void main() {}\n")]);
        repo.get_or_create_program("bad.frag", ShaderStage::Fragment, &[]);
        repo.get_or_create_program("good.frag", ShaderStage::Fragment, &[]);
        let stats = repo.stats();
        assert_eq!(stats.sources, 2);
        assert_eq!(stats.programs, 2);
        assert_eq!(stats.compilations, 2);
        assert_eq!(stats.failed_compilations, 1);
    }
}
