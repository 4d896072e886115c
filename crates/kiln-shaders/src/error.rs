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

use crate::pipeline::PipelineId;
use crate::program::ProgramId;
use kiln_core::{DeviceError, ShaderStage};
use kiln_io::WatchError;

/// Errors returned by [`crate::ShaderRepository`] operations.
///
/// Shader compile failures are not errors: they mark the program Invalid and
/// go to the diagnostics sink.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The id does not name a program of this repository.
    #[error("unknown program {0}")]
    UnknownProgram(ProgramId),
    /// The id does not name a pipeline of this repository.
    #[error("unknown pipeline {0}")]
    UnknownPipeline(PipelineId),
    /// A program was placed in a stage slot it was not compiled for.
    #[error("program {program} is a {actual} program but was placed in the {slot} slot")]
    StageMismatch {
        /// The misplaced program.
        program: ProgramId,
        /// The slot it was placed in.
        slot: ShaderStage,
        /// The stage it was compiled for.
        actual: ShaderStage,
    },
    /// A pipeline descriptor with every slot empty.
    #[error("pipeline descriptor has no stages")]
    EmptyPipeline,
    /// The device failed to create an object.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// The source directory could not be watched.
    #[error(transparent)]
    Watch(#[from] WatchError),
}
