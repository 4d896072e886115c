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

//! # Kiln Shaders
//!
//! The compile side of the shader pipeline.
//!
//! A [`ShaderRepository`] interns source files, compiles [`CompiledProgram`]s
//! keyed by entry path, stage and macro list, deduplicates [`Pipeline`]s by
//! the programs in their stage slots, and recompiles whatever a changed file
//! affects each time [`ShaderRepository::update`] runs.

#![warn(missing_docs)]

pub mod error;
pub mod pipeline;
pub mod program;
pub mod repository;

pub use error::RepositoryError;
pub use pipeline::{Pipeline, PipelineDescriptor, PipelineId};
pub use program::{CompiledProgram, ProgramId, ProgramKey, ProgramState};
pub use repository::{RepositoryStats, ShaderRepository};
