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

use super::compiler::{compile, LogFormat};
use kiln_core::{
    DeviceError, LabeledObject, PipelineHandle, ProgramDescriptor, ProgramDevice, ProgramHandle,
    ShaderStage, UniformLocation, UniformValue,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One call received by a [`HeadlessDevice`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// `create_program`
    CreateProgram {
        /// The new handle.
        program: ProgramHandle,
        /// The requested stage.
        stage: ShaderStage,
    },
    /// `uniform_location`
    UniformLocation {
        /// The queried program.
        program: ProgramHandle,
        /// The uniform name.
        name: String,
    },
    /// `set_uniform`
    SetUniform {
        /// The target program.
        program: ProgramHandle,
        /// The uniform location.
        location: UniformLocation,
        /// The written value.
        value: UniformValue,
    },
    /// `bind_uniform_block`
    BindUniformBlock {
        /// The target program.
        program: ProgramHandle,
        /// The block name.
        block: String,
        /// The binding point.
        binding: u32,
    },
    /// `bind_storage_block`
    BindStorageBlock {
        /// The target program.
        program: ProgramHandle,
        /// The block name.
        block: String,
        /// The binding point.
        binding: u32,
    },
    /// `delete_program`
    DeleteProgram(ProgramHandle),
    /// `create_pipeline`
    CreatePipeline(PipelineHandle),
    /// `attach_stage`
    AttachStage {
        /// The target pipeline.
        pipeline: PipelineHandle,
        /// The stage slot.
        stage: ShaderStage,
        /// The attached program.
        program: ProgramHandle,
    },
    /// `bind_pipeline`
    BindPipeline(PipelineHandle),
    /// `delete_pipeline`
    DeletePipeline(PipelineHandle),
    /// `dispatch_compute`
    DispatchCompute([u32; 3]),
    /// `set_object_label`
    SetObjectLabel {
        /// The labeled object.
        object: LabeledObject,
        /// The label.
        label: String,
    },
}

#[derive(Debug)]
struct HeadlessProgram {
    stage: ShaderStage,
    source: String,
    linked: bool,
    log: String,
    work_group_size: [u32; 3],
    locations: HashMap<String, UniformLocation>,
    values: HashMap<UniformLocation, UniformValue>,
}

#[derive(Debug, Default)]
struct HeadlessPipeline {
    stages: [Option<ProgramHandle>; ShaderStage::COUNT],
}

#[derive(Debug, Default)]
struct HeadlessState {
    programs: HashMap<ProgramHandle, HeadlessProgram>,
    pipelines: HashMap<PipelineHandle, HeadlessPipeline>,
    labels: HashMap<LabeledObject, String>,
    bound_pipeline: Option<PipelineHandle>,
    calls: Vec<DeviceCall>,
}

/// A [`ProgramDevice`] that runs entirely on the CPU.
///
/// Handles are allocated from monotonically increasing counters starting at 1,
/// so a released handle is never reused. Every call is appended to a log that
/// tests can inspect with [`HeadlessDevice::calls`].
#[derive(Debug)]
pub struct HeadlessDevice {
    state: Mutex<HeadlessState>,
    log_format: LogFormat,
    next_program_id: AtomicU32,
    next_pipeline_id: AtomicU32,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Creates a device writing compile logs in the labeled format.
    pub fn new() -> Self {
        Self::with_log_format(LogFormat::default())
    }

    /// Creates a device writing compile logs in the given vendor format.
    pub fn with_log_format(log_format: LogFormat) -> Self {
        Self {
            state: Mutex::new(HeadlessState::default()),
            log_format,
            next_program_id: AtomicU32::new(1),
            next_pipeline_id: AtomicU32::new(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the state for calls that can report failure.
    fn try_state(&self) -> Result<MutexGuard<'_, HeadlessState>, DeviceError> {
        self.state
            .lock()
            .map_err(|e| DeviceError::Backend(format!("Failed to lock HeadlessDevice state: {e}")))
    }

    /// A copy of every call received so far.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Number of programs created and not yet deleted.
    pub fn live_programs(&self) -> usize {
        self.state().programs.len()
    }

    /// Number of pipelines created and not yet deleted.
    pub fn live_pipelines(&self) -> usize {
        self.state().pipelines.len()
    }

    /// The source text a live program was created from.
    pub fn program_source(&self, program: ProgramHandle) -> Option<String> {
        self.state()
            .programs
            .get(&program)
            .map(|p| p.source.clone())
    }

    /// The value last written to a uniform of a live program.
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        let state = self.state();
        let entry = state.programs.get(&program)?;
        let location = entry.locations.get(name)?;
        entry.values.get(location).copied()
    }

    /// The program attached to a stage of a live pipeline.
    pub fn attached_program(&self, pipeline: PipelineHandle, stage: ShaderStage) -> Option<ProgramHandle> {
        self.state()
            .pipelines
            .get(&pipeline)
            .and_then(|p| p.stages[stage.slot()])
    }

    /// The pipeline bound last.
    pub fn bound_pipeline(&self) -> Option<PipelineHandle> {
        self.state().bound_pipeline
    }

    /// The debug label of an object.
    pub fn label(&self, object: LabeledObject) -> Option<String> {
        self.state().labels.get(&object).cloned()
    }
}

impl ProgramDevice for HeadlessDevice {
    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramHandle, DeviceError> {
        let id = self.next_program_id.fetch_add(1, Ordering::Relaxed);
        if id == u32::MAX {
            return Err(DeviceError::ObjectCreationFailed(
                "program handles exhausted".to_string(),
            ));
        }
        let program = ProgramHandle(id);
        let output = compile(descriptor.stage, descriptor.source, self.log_format);
        let locations = output
            .uniforms
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name, UniformLocation(index as i32)))
            .collect();

        let mut state = self.try_state()?;
        state.calls.push(DeviceCall::CreateProgram {
            program,
            stage: descriptor.stage,
        });
        state.programs.insert(
            program,
            HeadlessProgram {
                stage: descriptor.stage,
                source: descriptor.source.to_string(),
                linked: output.linked,
                log: output.log,
                work_group_size: output.work_group_size,
                locations,
                values: HashMap::new(),
            },
        );
        log::trace!(
            "HeadlessDevice: Created {} program {:?} (label: {:?})",
            descriptor.stage,
            program,
            descriptor.label
        );
        Ok(program)
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        self.state()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.state()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn work_group_size(&self, program: ProgramHandle) -> [u32; 3] {
        self.state()
            .programs
            .get(&program)
            .filter(|p| p.stage == ShaderStage::Compute)
            .map_or([0; 3], |p| p.work_group_size)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let mut state = self.state();
        state.calls.push(DeviceCall::UniformLocation {
            program,
            name: name.to_string(),
        });
        state.programs.get(&program)?.locations.get(name).copied()
    }

    fn set_uniform(&self, program: ProgramHandle, location: UniformLocation, value: &UniformValue) {
        let mut state = self.state();
        state.calls.push(DeviceCall::SetUniform {
            program,
            location,
            value: *value,
        });
        match state.programs.get_mut(&program) {
            Some(entry) if entry.linked => {
                entry.values.insert(location, *value);
            }
            _ => log::warn!("HeadlessDevice: set_uniform on unusable program {program:?}"),
        }
    }

    fn bind_uniform_block(&self, program: ProgramHandle, block_name: &str, binding: u32) {
        self.state().calls.push(DeviceCall::BindUniformBlock {
            program,
            block: block_name.to_string(),
            binding,
        });
    }

    fn bind_storage_block(&self, program: ProgramHandle, block_name: &str, binding: u32) {
        self.state().calls.push(DeviceCall::BindStorageBlock {
            program,
            block: block_name.to_string(),
            binding,
        });
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state();
        state.calls.push(DeviceCall::DeleteProgram(program));
        if state.programs.remove(&program).is_some() {
            state.labels.remove(&LabeledObject::Program(program));
            log::trace!("HeadlessDevice: Destroyed program {program:?}");
        } else {
            log::warn!("HeadlessDevice: delete_program on unknown program {program:?}");
        }
    }

    fn create_pipeline(&self) -> Result<PipelineHandle, DeviceError> {
        let id = self.next_pipeline_id.fetch_add(1, Ordering::Relaxed);
        if id == u32::MAX {
            return Err(DeviceError::ObjectCreationFailed(
                "pipeline handles exhausted".to_string(),
            ));
        }
        let pipeline = PipelineHandle(id);
        let mut state = self.try_state()?;
        state.calls.push(DeviceCall::CreatePipeline(pipeline));
        state.pipelines.insert(pipeline, HeadlessPipeline::default());
        Ok(pipeline)
    }

    fn attach_stage(&self, pipeline: PipelineHandle, stage: ShaderStage, program: ProgramHandle) {
        let mut state = self.state();
        state.calls.push(DeviceCall::AttachStage {
            pipeline,
            stage,
            program,
        });
        if let Some(entry) = state.pipelines.get_mut(&pipeline) {
            entry.stages[stage.slot()] = Some(program);
        }
    }

    fn bind_pipeline(&self, pipeline: PipelineHandle) {
        let mut state = self.state();
        state.calls.push(DeviceCall::BindPipeline(pipeline));
        state.bound_pipeline = Some(pipeline);
    }

    fn delete_pipeline(&self, pipeline: PipelineHandle) {
        let mut state = self.state();
        state.calls.push(DeviceCall::DeletePipeline(pipeline));
        state.pipelines.remove(&pipeline);
        state.labels.remove(&LabeledObject::Pipeline(pipeline));
        if state.bound_pipeline == Some(pipeline) {
            state.bound_pipeline = None;
        }
        log::trace!("HeadlessDevice: Destroyed pipeline {pipeline:?}");
    }

    fn dispatch_compute(&self, groups: [u32; 3]) {
        self.state().calls.push(DeviceCall::DispatchCompute(groups));
    }

    fn set_object_label(&self, object: LabeledObject, label: &str) {
        let mut state = self.state();
        state.calls.push(DeviceCall::SetObjectLabel {
            object,
            label: label.to_string(),
        });
        state.labels.insert(object, label.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(stage: ShaderStage, source: &str) -> ProgramDescriptor<'_> {
        ProgramDescriptor {
            label: Some("test"),
            stage,
            source,
        }
    }

    #[test]
    fn poisoned_state_fails_object_creation() {
        let device = std::sync::Arc::new(HeadlessDevice::new());
        let holder = device.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.state.lock().unwrap();
            panic!("poison the device state");
        })
        .join();

        assert!(matches!(device.create_pipeline(), Err(DeviceError::Backend(_))));
        assert!(matches!(
            device.create_program(&descriptor(ShaderStage::Vertex, "#version 450\n")),
            Err(DeviceError::Backend(_))
        ));
        // Inspection keeps working on the recovered state.
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn handles_are_unique_and_never_reused() {
        let device = HeadlessDevice::new();
        let a = device
            .create_program(&descriptor(ShaderStage::Vertex, "#version 450\n"))
            .unwrap();
        device.delete_program(a);
        let b = device
            .create_program(&descriptor(ShaderStage::Vertex, "#version 450\n"))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(device.live_programs(), 1);
    }

    #[test]
    fn failed_compile_still_returns_a_handle() {
        let device = HeadlessDevice::with_log_format(LogFormat::Terse);
        let program = device
            .create_program(&descriptor(ShaderStage::Fragment, "#version 450\n#error nope\n"))
            .unwrap();
        assert!(!device.program_link_status(program));
        assert_eq!(device.program_info_log(program), "0(2) : error C0000: #error nope\n");
    }

    #[test]
    fn uniforms_are_stored_per_location() {
        let device = HeadlessDevice::new();
        let program = device
            .create_program(&descriptor(ShaderStage::Fragment, "#version 450\nuniform float x;\n"))
            .unwrap();
        let location = device.uniform_location(program, "x").unwrap();
        device.set_uniform(program, location, &UniformValue::Float(5.0));
        assert_eq!(device.uniform_value(program, "x"), Some(UniformValue::Float(5.0)));
        assert_eq!(device.uniform_location(program, "y"), None);
    }

    #[test]
    fn pipelines_track_stages_and_binding() {
        let device = HeadlessDevice::new();
        let program = device
            .create_program(&descriptor(ShaderStage::Compute, "#version 450\nlayout(local_size_x = 64) in;\n"))
            .unwrap();
        assert_eq!(device.work_group_size(program), [64, 1, 1]);

        let pipeline = device.create_pipeline().unwrap();
        device.attach_stage(pipeline, ShaderStage::Compute, program);
        device.bind_pipeline(pipeline);
        assert_eq!(device.attached_program(pipeline, ShaderStage::Compute), Some(program));
        assert_eq!(device.bound_pipeline(), Some(pipeline));

        device.delete_pipeline(pipeline);
        assert_eq!(device.bound_pipeline(), None);
        assert_eq!(device.live_pipelines(), 0);
    }

    #[test]
    fn labels_are_recorded() {
        let device = HeadlessDevice::new();
        let pipeline = device.create_pipeline().unwrap();
        device.set_object_label(LabeledObject::Pipeline(pipeline), "main.vert + main.frag");
        assert_eq!(
            device.label(LabeledObject::Pipeline(pipeline)).as_deref(),
            Some("main.vert + main.frag")
        );
    }
}
