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

//! The mutex shared between the render thread and the LOD worker.
//!
//! The render thread holds it while it begins and ends the render pass and
//! while it writes textures and table slots; the LOD worker holds it while it
//! walks the actor list. Every acquisition is a scoped guard, so every exit
//! path, including `?`, releases it exactly once.

use crate::error::RendererError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

#[derive(Debug, Default)]
struct LodLockInner {
    mutex: Mutex<()>,
    acquisitions: AtomicUsize,
}

/// A cloneable handle to the LOD mutex.
#[derive(Debug, Clone, Default)]
pub struct LodLock {
    inner: Arc<LodLockInner>,
}

/// Proof that the LOD mutex is held. Releases it when dropped.
#[must_use = "the LOD lock is released as soon as the guard is dropped"]
pub struct LodGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl LodLock {
    /// Creates an unlocked mutex.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the mutex is acquired.
    ///
    /// ## Errors
    /// * `RendererError::LockPoisoned` - The other side panicked while holding
    ///   it. This is fatal.
    pub fn enter(&self) -> Result<LodGuard<'_>, RendererError> {
        let guard = self
            .inner
            .mutex
            .lock()
            .map_err(|_| RendererError::LockPoisoned("lod"))?;
        self.inner.acquisitions.fetch_add(1, Ordering::Relaxed);
        Ok(LodGuard { _guard: guard })
    }

    /// Returns `true` if some thread currently holds the mutex.
    pub fn is_held(&self) -> bool {
        match self.inner.mutex.try_lock() {
            Ok(_) => false,
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(_)) => false,
        }
    }

    /// Number of successful acquisitions since creation.
    pub fn acquisitions(&self) -> usize {
        self.inner.acquisitions.load(Ordering::Relaxed)
    }
}
