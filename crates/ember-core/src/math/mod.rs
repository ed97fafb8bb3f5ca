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

//! Math types used across the renderer.
//!
//! Vector, matrix and quaternion types come from `glam`; colors and integer
//! extents are defined here.

pub mod color;
pub mod dimension;

pub use self::color::LinearRgba;
pub use self::dimension::{Extent2D, Extent3D};
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
