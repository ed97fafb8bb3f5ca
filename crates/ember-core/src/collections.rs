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

//! Ordered containers used by the renderer's residency caches.
//!
//! Locking is composed on top (`Mutex<Vec<T>>`, `Mutex<SortedVec<T>>`) rather
//! than built into the containers themselves.

/// A value that can be stored in a [`SortedVec`], ordered by its key.
pub trait Keyed {
    /// The ordering key.
    type Key: Ord + Copy;

    /// Returns the key of this value.
    fn key(&self) -> Self::Key;
}

/// A vector kept sorted by [`Keyed::key`], with binary-search lookup.
///
/// Keys are unique: inserting a value whose key is already present replaces
/// the stored value.
#[derive(Debug, Clone)]
pub struct SortedVec<T: Keyed> {
    items: Vec<T>,
}

impl<T: Keyed> Default for SortedVec<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> SortedVec<T> {
    /// Creates an empty `SortedVec`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty `SortedVec` with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Inserts `value` at its sorted position. Returns the previous value
    /// stored under the same key, if any.
    pub fn insert(&mut self, value: T) -> Option<T> {
        match self.items.binary_search_by_key(&value.key(), |item| item.key()) {
            Ok(index) => Some(std::mem::replace(&mut self.items[index], value)),
            Err(index) => {
                self.items.insert(index, value);
                None
            }
        }
    }

    /// Finds the value stored under `key`.
    pub fn get(&self, key: T::Key) -> Option<&T> {
        self.items
            .binary_search_by_key(&key, |item| item.key())
            .ok()
            .map(|index| &self.items[index])
    }

    /// Finds the value stored under `key` for mutation. The key of the value
    /// must not be changed through the returned reference.
    pub fn get_mut(&mut self, key: T::Key) -> Option<&mut T> {
        match self.items.binary_search_by_key(&key, |item| item.key()) {
            Ok(index) => Some(&mut self.items[index]),
            Err(_) => None,
        }
    }

    /// Returns `true` if a value is stored under `key`.
    pub fn contains(&self, key: T::Key) -> bool {
        self.get(key).is_some()
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: T::Key) -> Option<T> {
        match self.items.binary_search_by_key(&key, |item| item.key()) {
            Ok(index) => Some(self.items.remove(index)),
            Err(_) => None,
        }
    }

    /// Keeps only the values for which `keep` returns `true`. Order is preserved.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the values in key order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The values as a sorted slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T: Keyed> IntoIterator for &'a SortedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
