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

//! Uniform values retained by compiled programs.

use crate::device::ProgramDevice;
use crate::handle::{ProgramHandle, UniformLocation};

/// A single uniform value, in any of the shapes a program can declare.
///
/// Values compare by content. Programs keep the last value written under each
/// uniform name and use this comparison to skip redundant driver calls.
/// Matrices are stored column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `int`
    Int(i32),
    /// `ivec2`
    IVec2([i32; 2]),
    /// `ivec3`
    IVec3([i32; 3]),
    /// `ivec4`
    IVec4([i32; 4]),
    /// `double`
    Double(f64),
    /// `dvec2`
    DVec2([f64; 2]),
    /// `dvec3`
    DVec3([f64; 3]),
    /// `dvec4`
    DVec4([f64; 4]),
    /// `mat2`
    Mat2([[f32; 2]; 2]),
    /// `mat3`
    Mat3([[f32; 3]; 3]),
    /// `mat4`
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    /// Writes this value to `location` of `program` on the device.
    pub fn apply(&self, device: &dyn ProgramDevice, program: ProgramHandle, location: UniformLocation) {
        device.set_uniform(program, location, self);
    }

    /// Returns the shading-language type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Int(_) => "int",
            UniformValue::IVec2(_) => "ivec2",
            UniformValue::IVec3(_) => "ivec3",
            UniformValue::IVec4(_) => "ivec4",
            UniformValue::Double(_) => "double",
            UniformValue::DVec2(_) => "dvec2",
            UniformValue::DVec3(_) => "dvec3",
            UniformValue::DVec4(_) => "dvec4",
            UniformValue::Mat2(_) => "mat2",
            UniformValue::Mat3(_) => "mat3",
            UniformValue::Mat4(_) => "mat4",
        }
    }
}

macro_rules! impl_from_uniform {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(value: $ty) -> Self {
                    UniformValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_uniform! {
    f32 => Float,
    [f32; 2] => Vec2,
    [f32; 3] => Vec3,
    [f32; 4] => Vec4,
    i32 => Int,
    [i32; 2] => IVec2,
    [i32; 3] => IVec3,
    [i32; 4] => IVec4,
    f64 => Double,
    [f64; 2] => DVec2,
    [f64; 3] => DVec3,
    [f64; 4] => DVec4,
    [[f32; 2]; 2] => Mat2,
    [[f32; 3]; 3] => Mat3,
    [[f32; 4]; 4] => Mat4,
}
