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

//! Per-frame statistics.

/// Counters for a single frame, reset by `begin_frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// A sequential counter for presented frames.
    pub frame_number: u64,
    /// Non-indexed draw calls (debug overlay).
    pub draws: u32,
    /// Indexed draw calls (sky, UI).
    pub indexed_draws: u32,
    /// Draw commands issued through indirect multi-draws.
    pub indirect_draws: u32,
    /// Indirect multi-draw calls encoded.
    pub multi_draw_calls: u32,
    /// Pipeline binds encoded.
    pub pipeline_switches: u32,
    /// Visible actors drawn.
    pub visible_actors: u32,
    /// Vertex and index bytes uploaded this frame.
    pub upload_bytes: u64,
}

impl FrameStats {
    /// Every draw call encoded, counting each multi-draw once.
    pub fn draw_calls(&self) -> u32 {
        self.draws + self.indexed_draws + self.multi_draw_calls
    }
}
