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

//! # Kiln Graph
//!
//! The source side of the shader pipeline. Files are parsed into
//! [`SourceNode`]s held by a [`SourceGraph`] arena, flattened into a
//! dependency-first order and assembled into a [`ResolvedUnit`] whose
//! provenance table maps compiler line numbers back to the authored files.

#![warn(missing_docs)]

pub mod graph;
pub mod parse;
pub mod resolved;

pub use graph::{SourceGraph, SourceId, SourceNode};
pub use parse::{parse_source, ParsedSource};
pub use resolved::{LineOrigin, ProvenanceEntry, ResolvedUnit};
