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

use crate::asset::ModelDefinition;
use crate::math::{Mat4, Vec3};
use std::sync::{Arc, Mutex};

/// Identity of a live actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

/// The model an actor is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorModel {
    /// The model.
    pub definition: Arc<ModelDefinition>,
    /// Skin of the model.
    pub skin: usize,
}

/// A dynamic object of the level.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    /// Identity.
    pub id: ActorId,
    /// The model, `None` for invisible logic actors.
    pub model: Option<ActorModel>,
    /// Model-to-world transform.
    pub transform: Mat4,
    /// LOD chosen by the LOD worker.
    pub lod: usize,
    /// Whether the actor is drawn.
    pub visible: bool,
}

impl Actor {
    /// Creates a visible actor at the origin using LOD 0.
    pub fn new(id: ActorId, model: Option<ActorModel>) -> Self {
        Self {
            id,
            model,
            transform: Mat4::IDENTITY,
            lod: 0,
            visible: true,
        }
    }

    /// World-space position.
    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }
}

/// The lockable, ordered actor collection shared between threads.
pub type ActorList = Arc<Mutex<Vec<Actor>>>;
