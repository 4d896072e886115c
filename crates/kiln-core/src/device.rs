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

//! The GPU driver boundary.
//!
//! Everything the shader pipeline needs from the graphics driver goes through
//! [`ProgramDevice`]. The repository never touches raw driver state; it only
//! owns the opaque handles a device hands back.

use crate::error::DeviceError;
use crate::handle::{PipelineHandle, ProgramHandle, UniformLocation};
use crate::stage::ShaderStage;
use crate::uniform::UniformValue;
use std::fmt::Debug;

/// Describes one separable program to compile from fully resolved text.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor<'a> {
    /// An optional debug label, usually the entry file path.
    pub label: Option<&'a str>,
    /// The pipeline stage the program is compiled for.
    pub stage: ShaderStage,
    /// The complete source text, version line included.
    pub source: &'a str,
}

/// A driver object that can carry a debug label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabeledObject {
    /// A compiled program.
    Program(ProgramHandle),
    /// A program pipeline.
    Pipeline(PipelineHandle),
}

/// The set of driver operations the shader pipeline relies on.
///
/// Implementations are used from the single thread that owns the graphics
/// context. The `Send + Sync` bound only allows the device to be shared behind
/// an `Arc` by the objects that hold handles to it.
pub trait ProgramDevice: Send + Sync + Debug + 'static {
    /// Compiles and links a separable program for one stage.
    /// ## Arguments
    /// * `descriptor` - The stage, source text and label of the program.
    /// ## Returns
    /// The handle of the new program object. A program that failed to compile
    /// still gets a handle; query [`ProgramDevice::program_link_status`] and
    /// [`ProgramDevice::program_info_log`] to find out.
    /// ## Errors
    /// * `DeviceError` - If the backend could not create a program object at all.
    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramHandle, DeviceError>;

    /// Returns `true` if the program compiled and linked successfully.
    fn program_link_status(&self, program: ProgramHandle) -> bool;

    /// Returns the compiler and linker log of the program (may be empty).
    fn program_info_log(&self, program: ProgramHandle) -> String;

    /// Returns the local work-group size declared by a compute program.
    ///
    /// Non-compute programs report `[0, 0, 0]`.
    fn work_group_size(&self, program: ProgramHandle) -> [u32; 3];

    /// Looks up the location of an active uniform.
    /// ## Returns
    /// `None` if the program has no active uniform with that name.
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Writes a uniform value directly into the program object.
    fn set_uniform(&self, program: ProgramHandle, location: UniformLocation, value: &UniformValue);

    /// Assigns a uniform block of the program to a buffer binding point.
    fn bind_uniform_block(&self, program: ProgramHandle, block_name: &str, binding: u32);

    /// Assigns a shader storage block of the program to a buffer binding point.
    fn bind_storage_block(&self, program: ProgramHandle, block_name: &str, binding: u32);

    /// Releases a program object.
    fn delete_program(&self, program: ProgramHandle);

    /// Creates an empty program pipeline object.
    /// ## Errors
    /// * `DeviceError` - If the backend could not create a pipeline object.
    fn create_pipeline(&self) -> Result<PipelineHandle, DeviceError>;

    /// Attaches the program as the given stage of the pipeline.
    fn attach_stage(&self, pipeline: PipelineHandle, stage: ShaderStage, program: ProgramHandle);

    /// Makes the pipeline current for subsequent draws and dispatches.
    fn bind_pipeline(&self, pipeline: PipelineHandle);

    /// Releases a pipeline object.
    fn delete_pipeline(&self, pipeline: PipelineHandle);

    /// Dispatches compute work groups with the currently bound pipeline.
    fn dispatch_compute(&self, groups: [u32; 3]);

    /// Attaches a human-readable label to a driver object for debuggers.
    fn set_object_label(&self, object: LabeledObject, label: &str);
}
