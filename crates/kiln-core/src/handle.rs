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

//! Opaque handles to driver objects.
//!
//! A handle is only meaningful to the `ProgramDevice` that produced it. Zero
//! is never handed out, so it is free to mean "nothing" at the driver level.

/// An opaque handle to a compiled, separable GPU program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

/// An opaque handle to a GPU program pipeline object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineHandle(pub u32);

/// The driver-assigned location of a uniform inside one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub i32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_equality() {
        assert_eq!(ProgramHandle(3), ProgramHandle(3));
        assert_ne!(ProgramHandle(3), ProgramHandle(4));
        assert_ne!(PipelineHandle(1), PipelineHandle(2));
    }
}
