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

//! Compiled shader programs and their retained state.

use kiln_core::{
    DiagnosticLevel, DiagnosticSink, LabeledObject, MacroDefinition, ProgramDescriptor,
    ProgramDevice, ProgramHandle, ShaderStage, UniformLocation, UniformValue,
};
use kiln_graph::{ResolvedUnit, SourceId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Index of a [`CompiledProgram`] inside its repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) usize);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

/// The identity of a compiled program.
///
/// Two requests with equal keys share one program. The macro list is part of
/// the identity in the order it was given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    /// Normalized entry file path.
    pub path: String,
    /// The stage the program is compiled for.
    pub stage: ShaderStage,
    /// Macros injected as `#define` lines.
    pub macros: Vec<MacroDefinition>,
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.stage)?;
        if !self.macros.is_empty() {
            let macros: Vec<String> = self.macros.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", macros.join(", "))?;
        }
        Ok(())
    }
}

/// Where a program is in its compile cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramState {
    /// Never compiled, or disposed.
    Uncompiled,
    /// A compile attempt is in progress.
    Compiling,
    /// The last compile succeeded and the program has a live handle.
    Valid,
    /// The last compile failed; the program has no handle.
    Invalid,
}

/// One program compiled for one stage from one entry file.
///
/// Uniform values and block bindings are retained across recompilations and
/// replayed on every successful compile. While Invalid, setters only update
/// the retained state.
#[derive(Debug)]
pub struct CompiledProgram {
    key: ProgramKey,
    entry: SourceId,
    device: Arc<dyn ProgramDevice>,
    handle: Option<ProgramHandle>,
    state: ProgramState,
    work_group_size: [u32; 3],
    uniform_values: BTreeMap<String, UniformValue>,
    uniform_locations: HashMap<String, Option<UniformLocation>>,
    uniform_blocks: BTreeMap<String, u32>,
    storage_blocks: BTreeMap<String, u32>,
    compile_count: u64,
}

impl CompiledProgram {
    pub(crate) fn new(key: ProgramKey, entry: SourceId, device: Arc<dyn ProgramDevice>) -> Self {
        Self {
            key,
            entry,
            device,
            handle: None,
            state: ProgramState::Uncompiled,
            work_group_size: [0; 3],
            uniform_values: BTreeMap::new(),
            uniform_locations: HashMap::new(),
            uniform_blocks: BTreeMap::new(),
            storage_blocks: BTreeMap::new(),
            compile_count: 0,
        }
    }

    /// The identity of this program.
    pub fn key(&self) -> &ProgramKey {
        &self.key
    }

    /// The entry file path.
    pub fn path(&self) -> &str {
        &self.key.path
    }

    /// The stage this program is compiled for.
    pub fn stage(&self) -> ShaderStage {
        self.key.stage
    }

    /// The macros injected into this program.
    pub fn macros(&self) -> &[MacroDefinition] {
        &self.key.macros
    }

    /// The source node of the entry file.
    pub fn entry(&self) -> SourceId {
        self.entry
    }

    /// The current driver handle, present only while Valid.
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }

    /// The current compile state.
    pub fn state(&self) -> ProgramState {
        self.state
    }

    /// `true` if the last compile succeeded.
    pub fn is_valid(&self) -> bool {
        self.state == ProgramState::Valid
    }

    /// The local work-group size of a Valid compute program, `[0, 0, 0]` otherwise.
    pub fn work_group_size(&self) -> [u32; 3] {
        self.work_group_size
    }

    /// How many compile attempts this program has gone through.
    pub fn compile_count(&self) -> u64 {
        self.compile_count
    }

    /// The value last set for a uniform, whether or not it reached the driver.
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniform_values.get(name)
    }

    /// Compiles `unit` into a fresh handle, replacing the previous one.
    ///
    /// Returns `true` on success. A failure releases the handle, marks the
    /// program Invalid and reports the localized compiler log to `sink`.
    pub(crate) fn compile(
        &mut self,
        unit: &ResolvedUnit,
        sink: &dyn DiagnosticSink,
        dump_on_error: bool,
    ) -> bool {
        self.state = ProgramState::Compiling;
        self.compile_count += 1;
        self.release_handle();
        self.work_group_size = [0; 3];

        let descriptor = ProgramDescriptor {
            label: Some(self.key.path.as_str()),
            stage: self.key.stage,
            source: unit.text(),
        };
        let handle = match self.device.create_program(&descriptor) {
            Ok(handle) => handle,
            Err(e) => {
                self.state = ProgramState::Invalid;
                sink.emit(
                    DiagnosticLevel::Error,
                    &format!("Error creating {} shader {}: {e}", self.key.stage, self.key.path),
                );
                return false;
            }
        };

        if !self.device.program_link_status(handle) {
            let log = self.device.program_info_log(handle);
            self.device.delete_program(handle);
            self.state = ProgramState::Invalid;
            sink.emit(
                DiagnosticLevel::Error,
                &format!(
                    "Error compiling {} shader {}\n{}",
                    self.key.stage,
                    self.key.path,
                    unit.localize_log(&log)
                ),
            );
            if dump_on_error {
                sink.emit(DiagnosticLevel::Debug, &unit.numbered_listing());
            }
            return false;
        }

        self.handle = Some(handle);
        self.state = ProgramState::Valid;
        if self.key.stage == ShaderStage::Compute {
            self.work_group_size = self.device.work_group_size(handle);
        }
        self.device
            .set_object_label(LabeledObject::Program(handle), &self.key.path);
        self.replay(handle);
        log::debug!("Compiled {}", self.key);
        true
    }

    /// Reissues every retained uniform and binding against a new handle.
    fn replay(&mut self, handle: ProgramHandle) {
        self.uniform_locations.clear();

        let values: Vec<(String, UniformValue)> = self
            .uniform_values
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        for (name, value) in values {
            match self.location(&name) {
                Some(location) => value.apply(self.device.as_ref(), handle, location),
                None => log::trace!(
                    "{}: uniform {} {} is not active, kept for later compiles",
                    self.key,
                    value.type_name(),
                    name
                ),
            }
        }
        for (block, &binding) in &self.uniform_blocks {
            self.device.bind_uniform_block(handle, block, binding);
        }
        for (block, &binding) in &self.storage_blocks {
            self.device.bind_storage_block(handle, block, binding);
        }
    }

    /// Looks up a uniform location, caching the answer until the next compile.
    ///
    /// Invalid programs answer `None` without asking the driver.
    pub fn location(&mut self, name: &str) -> Option<UniformLocation> {
        let handle = self.handle.filter(|_| self.is_valid())?;
        if let Some(&cached) = self.uniform_locations.get(name) {
            return cached;
        }
        let location = self.device.uniform_location(handle, name);
        self.uniform_locations.insert(name.to_string(), location);
        location
    }

    /// Sets a uniform, forwarding it to the driver only if Valid and changed.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        let value = value.into();
        let previous = self.uniform_values.insert(name.to_string(), value);
        if previous == Some(value) {
            return;
        }
        let Some(handle) = self.handle.filter(|_| self.is_valid()) else {
            return;
        };
        match self.location(name) {
            Some(location) => value.apply(self.device.as_ref(), handle, location),
            None => log::trace!("{}: no active uniform {} {}", self.key, value.type_name(), name),
        }
    }

    /// Sets a `float` uniform.
    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, value);
    }

    /// Sets a `vec2` uniform.
    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) {
        self.set_uniform(name, value);
    }

    /// Sets a `vec3` uniform.
    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) {
        self.set_uniform(name, value);
    }

    /// Sets a `vec4` uniform.
    pub fn set_vec4(&mut self, name: &str, value: [f32; 4]) {
        self.set_uniform(name, value);
    }

    /// Sets an `int` uniform.
    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, value);
    }

    /// Sets an `ivec2` uniform.
    pub fn set_ivec2(&mut self, name: &str, value: [i32; 2]) {
        self.set_uniform(name, value);
    }

    /// Sets an `ivec3` uniform.
    pub fn set_ivec3(&mut self, name: &str, value: [i32; 3]) {
        self.set_uniform(name, value);
    }

    /// Sets an `ivec4` uniform.
    pub fn set_ivec4(&mut self, name: &str, value: [i32; 4]) {
        self.set_uniform(name, value);
    }

    /// Sets a `double` uniform.
    pub fn set_double(&mut self, name: &str, value: f64) {
        self.set_uniform(name, value);
    }

    /// Sets a `dvec2` uniform.
    pub fn set_dvec2(&mut self, name: &str, value: [f64; 2]) {
        self.set_uniform(name, value);
    }

    /// Sets a `dvec3` uniform.
    pub fn set_dvec3(&mut self, name: &str, value: [f64; 3]) {
        self.set_uniform(name, value);
    }

    /// Sets a `dvec4` uniform.
    pub fn set_dvec4(&mut self, name: &str, value: [f64; 4]) {
        self.set_uniform(name, value);
    }

    /// Sets a column-major `mat2` uniform.
    pub fn set_mat2(&mut self, name: &str, value: [[f32; 2]; 2]) {
        self.set_uniform(name, value);
    }

    /// Sets a column-major `mat3` uniform.
    pub fn set_mat3(&mut self, name: &str, value: [[f32; 3]; 3]) {
        self.set_uniform(name, value);
    }

    /// Sets a column-major `mat4` uniform.
    pub fn set_mat4(&mut self, name: &str, value: [[f32; 4]; 4]) {
        self.set_uniform(name, value);
    }

    /// Assigns a uniform block to a binding point. Retained across recompiles.
    pub fn bind_uniform_block(&mut self, block: &str, binding: u32) {
        self.uniform_blocks.insert(block.to_string(), binding);
        if let Some(handle) = self.handle.filter(|_| self.is_valid()) {
            self.device.bind_uniform_block(handle, block, binding);
        }
    }

    /// Assigns a shader storage block to a binding point. Retained across recompiles.
    pub fn bind_storage_block(&mut self, block: &str, binding: u32) {
        self.storage_blocks.insert(block.to_string(), binding);
        if let Some(handle) = self.handle.filter(|_| self.is_valid()) {
            self.device.bind_storage_block(handle, block, binding);
        }
    }

    fn release_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.device.delete_program(handle);
        }
    }

    /// Releases the driver handle. Retained state is kept.
    pub(crate) fn dispose(&mut self) {
        self.release_handle();
        self.state = ProgramState::Uncompiled;
    }
}
