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

//! Compact "set of small integers" used both as a per-entity membership
//! fingerprint and as a filter's include/exclude predicate.

use std::fmt;

use telos_core::ecs::TypeIndex;

/// An unordered set of component type indices.
///
/// Stored as a small linear array rather than a fixed-width bitset:
/// components-per-entity counts are small (single digits to low tens), so a
/// short array wins on memory and branch predictability, and it keeps the
/// type-index space unbounded. Membership, not position, is the observable
/// property; the array order is incidental.
#[derive(Clone, Default)]
pub struct ComponentMask {
    bits: Vec<TypeIndex>,
}

impl ComponentMask {
    const MIN_CAPACITY: usize = 8;

    /// Creates an empty mask with a small pre-allocated capacity.
    pub fn new() -> Self {
        Self {
            bits: Vec::with_capacity(Self::MIN_CAPACITY),
        }
    }

    /// Adds or removes an id. Adding an id already present, or removing one
    /// already absent, is a no-op. Removal shifts later ids left by one;
    /// the backing array grows by doubling.
    pub fn set(&mut self, bit: TypeIndex, present: bool) {
        let found = self.bits.iter().position(|&b| b == bit);
        match (found, present) {
            (None, true) => self.bits.push(bit),
            (Some(i), false) => {
                self.bits.remove(i);
            }
            _ => {}
        }
    }

    /// Linear membership test.
    #[inline]
    pub fn get(&self, bit: TypeIndex) -> bool {
        self.bits.contains(&bit)
    }

    /// True when no id is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of ids currently set.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Removes every id.
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    /// True when every id in `other` is present in `self`. Short-circuits
    /// on the first miss. Every mask is a superset of the empty mask.
    pub fn is_superset_of(&self, other: &ComponentMask) -> bool {
        other.bits.iter().all(|b| self.bits.contains(b))
    }

    /// True when any id is shared between `self` and `other`. Short-circuits
    /// on the first hit.
    pub fn intersects(&self, other: &ComponentMask) -> bool {
        self.bits.iter().any(|b| other.bits.contains(b))
    }

    /// Filter compatibility: `self` covers every included id and shares none
    /// of the excluded ids. An empty mask is never compatible (a filter
    /// always requires at least one component).
    pub fn is_compatible(&self, include: &ComponentMask, exclude: &ComponentMask) -> bool {
        !self.bits.is_empty()
            && include.bits.len() <= self.bits.len()
            && self.is_superset_of(include)
            && !self.intersects(exclude)
    }

    /// Replaces this mask's content with `other`'s, reusing capacity.
    pub fn copy_from(&mut self, other: &ComponentMask) {
        self.bits.clear();
        self.bits.extend_from_slice(&other.bits);
    }

    /// Order-insensitive equality: same ids, regardless of insertion order.
    pub fn set_eq(&self, other: &ComponentMask) -> bool {
        self.bits.len() == other.bits.len() && self.is_superset_of(other)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.bits.iter()).finish()
    }
}
