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

//! Backend-agnostic GPU contracts for the ember renderer.
//!
//! `api` holds the plain data (handles, descriptors, vertex layouts, the
//! growable buffer), `traits` the interfaces a backend implements, and
//! `error` the error types those interfaces report. The renderer proper in
//! `ember-render` only ever talks to these; `ember-infra` provides the wgpu
//! implementation.

pub mod api;
pub mod error;
pub mod traits;

pub use self::api::*;
pub use self::error::{ResourceError, SurfaceError};
pub use self::traits::{
    CommandEncoder, GraphicsDevice, PresentOutcome, PresentationSurface, RenderPass, SurfaceFrame,
};
