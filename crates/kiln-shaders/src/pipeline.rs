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

//! Pipeline descriptors and the pipelines built from them.

use crate::program::{CompiledProgram, ProgramId};
use kiln_core::{DeviceError, LabeledObject, PipelineHandle, ProgramDevice, ShaderStage};
use std::fmt;

/// Index of a [`Pipeline`] inside its repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(pub(crate) usize);

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline#{}", self.0)
    }
}

/// Six stage slots, each empty or holding a program.
///
/// Equality and hashing are structural over the slots, so two descriptors
/// naming the same programs in the same slots are the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipelineDescriptor {
    stages: [Option<ProgramId>; ShaderStage::COUNT],
}

impl PipelineDescriptor {
    /// A descriptor with every slot empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// A vertex + fragment descriptor.
    pub fn graphics(vertex: ProgramId, fragment: ProgramId) -> Self {
        Self::new()
            .with_stage(ShaderStage::Vertex, vertex)
            .with_stage(ShaderStage::Fragment, fragment)
    }

    /// A compute-only descriptor.
    pub fn compute(program: ProgramId) -> Self {
        Self::new().with_stage(ShaderStage::Compute, program)
    }

    /// Returns a copy with `program` in the `stage` slot.
    pub fn with_stage(mut self, stage: ShaderStage, program: ProgramId) -> Self {
        self.stages[stage.slot()] = Some(program);
        self
    }

    /// The program in a slot.
    pub fn stage(&self, stage: ShaderStage) -> Option<ProgramId> {
        self.stages[stage.slot()]
    }

    /// Iterates over the occupied slots in stage order.
    pub fn programs(&self) -> impl Iterator<Item = (ShaderStage, ProgramId)> + '_ {
        ShaderStage::ALL
            .into_iter()
            .filter_map(move |stage| self.stage(stage).map(|program| (stage, program)))
    }

    /// `true` if every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(Option::is_none)
    }
}

/// A linked set of stage programs usable as one bindable unit.
///
/// The driver object is built lazily: a new or dirty pipeline is (re)built on
/// its next bind.
#[derive(Debug)]
pub struct Pipeline {
    descriptor: PipelineDescriptor,
    handle: Option<PipelineHandle>,
    dirty: bool,
    build_count: u64,
}

impl Pipeline {
    pub(crate) fn new(descriptor: PipelineDescriptor) -> Self {
        Self {
            descriptor,
            handle: None,
            dirty: true,
            build_count: 0,
        }
    }

    /// The descriptor this pipeline was created from.
    pub fn descriptor(&self) -> &PipelineDescriptor {
        &self.descriptor
    }

    /// The driver handle, absent until the first bind.
    pub fn handle(&self) -> Option<PipelineHandle> {
        self.handle
    }

    /// `true` if the pipeline must be rebuilt before its next use.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// How many times the driver object has been built.
    pub fn build_count(&self) -> u64 {
        self.build_count
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Regenerates the driver object and attaches the current handle of every
    /// Valid stage program. Invalid stages are left empty.
    pub(crate) fn rebuild(
        &mut self,
        device: &dyn ProgramDevice,
        programs: &[CompiledProgram],
    ) -> Result<PipelineHandle, DeviceError> {
        self.release(device);
        let handle = device.create_pipeline()?;

        let mut label = Vec::new();
        for (stage, id) in self.descriptor.programs() {
            let Some(program) = programs.get(id.0) else {
                continue;
            };
            label.push(program.path());
            match program.handle().filter(|_| program.is_valid()) {
                Some(program_handle) => device.attach_stage(handle, stage, program_handle),
                None => log::debug!("Skipping invalid {stage} stage {} of pipeline", program.path()),
            }
        }
        device.set_object_label(LabeledObject::Pipeline(handle), &label.join(" + "));

        self.handle = Some(handle);
        self.dirty = false;
        self.build_count += 1;
        Ok(handle)
    }

    fn release(&mut self, device: &dyn ProgramDevice) {
        if let Some(handle) = self.handle.take() {
            device.delete_pipeline(handle);
        }
    }

    pub(crate) fn dispose(&mut self, device: &dyn ProgramDevice) {
        self.release(device);
        self.dirty = true;
    }
}
