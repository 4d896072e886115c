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

//! Pipeline stage kinds.

use std::fmt;
use std::str::FromStr;

/// One programmable phase of a GPU pipeline.
///
/// The discriminant doubles as the slot index inside a pipeline descriptor,
/// so the order here is the order of the six pipeline slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    /// The vertex shader stage.
    Vertex,
    /// The tessellation control (hull) stage.
    TessControl,
    /// The tessellation evaluation (domain) stage.
    TessEvaluation,
    /// The geometry shader stage.
    Geometry,
    /// The fragment (or pixel) shader stage.
    Fragment,
    /// The compute shader stage.
    Compute,
}

impl ShaderStage {
    /// Number of distinct stages, and therefore of pipeline slots.
    pub const COUNT: usize = 6;

    /// Every stage, in slot order.
    pub const ALL: [ShaderStage; Self::COUNT] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEvaluation,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    /// Returns the pipeline slot this stage occupies.
    pub fn slot(self) -> usize {
        self as usize
    }

    /// Returns a short lowercase name, also used as a file extension hint.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tess_control",
            ShaderStage::TessEvaluation => "tess_evaluation",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }

    /// Guesses the stage from a conventional file extension (`.vert`, `.frag`, ...).
    ///
    /// Both `foo.frag` and `foo.frag.glsl` are recognized.
    pub fn from_path(path: &str) -> Option<ShaderStage> {
        let mut parts = path.rsplit('.');
        let last = parts.next()?;
        let ext = if last.eq_ignore_ascii_case("glsl") {
            parts.next()?
        } else {
            last
        };
        match ext.to_ascii_lowercase().as_str() {
            "vert" | "vs" => Some(ShaderStage::Vertex),
            "tesc" => Some(ShaderStage::TessControl),
            "tese" => Some(ShaderStage::TessEvaluation),
            "geom" | "gs" => Some(ShaderStage::Geometry),
            "frag" | "fs" => Some(ShaderStage::Fragment),
            "comp" | "cs" => Some(ShaderStage::Compute),
            _ => None,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShaderStage {
    type Err = String;

    /// Accepts a stage name (`vertex`, `tess_control`, ...) or a conventional
    /// extension (`vert`, `frag`, `comp`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        ShaderStage::ALL
            .into_iter()
            .find(|stage| stage.name() == lowered)
            .or_else(|| ShaderStage::from_path(&format!("x.{lowered}")))
            .ok_or_else(|| format!("unknown shader stage '{s}'"))
    }
}
