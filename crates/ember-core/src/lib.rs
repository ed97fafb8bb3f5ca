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

//! # Ember Core
//!
//! Foundational crate of the ember renderer: the API-neutral GPU contracts,
//! the asset and scene types consumed by the renderer, and the growable
//! buffer abstraction every batch is built on.

#![warn(missing_docs)]

pub mod asset;
pub mod collections;
pub mod math;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod renderer;
pub mod scene;

pub use collections::{Keyed, SortedVec};
