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

//! # Kiln Core
//!
//! Foundational crate containing the types and contracts shared by the shader
//! pipeline: stage kinds, opaque GPU handles, the device, storage and
//! diagnostics collaborators, uniform values and repository settings.
//!
//! Nothing in here talks to a driver or a filesystem. Concrete collaborators
//! live in `kiln-io` and `kiln-infra`; the graph and the repository live in
//! `kiln-graph` and `kiln-shaders`.

#![warn(missing_docs)]

pub mod device;
pub mod diagnostics;
pub mod error;
pub mod handle;
pub mod macros;
pub mod path;
pub mod settings;
pub mod source;
pub mod stage;
pub mod uniform;

pub use device::{LabeledObject, ProgramDescriptor, ProgramDevice};
pub use diagnostics::{DiagnosticLevel, DiagnosticSink, LogDiagnosticSink};
pub use error::{DeviceError, SourceError};
pub use handle::{PipelineHandle, ProgramHandle, UniformLocation};
pub use macros::MacroDefinition;
pub use path::normalize_path;
pub use settings::{RepositorySettings, SettingsError};
pub use source::SourceProvider;
pub use stage::ShaderStage;
pub use uniform::UniformValue;
