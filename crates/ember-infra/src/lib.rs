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

//! Concrete backends for the ember renderer: a `wgpu` graphics device and
//! presentation surface, a `winit` window and the logger setup.

pub mod graphics;
pub mod logging;
pub mod platform;

pub use graphics::wgpu::{create_backend, WgpuDevice, WgpuSurface};
pub use logging::init_logging;
pub use platform::{WinitWindow, WinitWindowBuilder};
