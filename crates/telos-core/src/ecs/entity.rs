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

//! Defines core types related to entities in the database.

use std::fmt;

/// A unique identifier for an entity: a row in the component database.
///
/// The id is a bare index. When an entity is removed its id is released and
/// reused for a later entity (LIFO), with no generation counter attached —
/// a handle kept across a removal will silently resolve to whatever entity
/// next occupies the slot. Debug builds assert liveness on every operation
/// to catch stale handles early; release builds do not.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub(crate) u32);

impl Entity {
    /// Builds an entity handle from a raw index.
    ///
    /// Intended for the supervisor and for diagnostics; a handle fabricated
    /// from an arbitrary index is not guaranteed to refer to a live entity.
    #[inline]
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this entity.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marker trait tagging a "kind" of entity.
///
/// A filter may restrict itself to entities created with one specific kind;
/// the supervisor then skips notifying it for entities of any other kind,
/// even when the component masks match. Kinds are plain marker types:
///
/// ```
/// use telos_core::ecs::EntityKind;
///
/// struct Projectile;
/// impl EntityKind for Projectile {}
/// ```
pub trait EntityKind: 'static {}
