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

//! Explicit per-supervisor registries mapping component and entity-kind
//! types to their monotonically assigned indices.
//!
//! These registries are owned by one supervisor instance, not by the
//! process: independent supervisors each carry their own index spaces and
//! pools, and tear down deterministically when dropped.

use std::{any::TypeId, collections::HashMap};

use telos_core::ecs::{Component, EntityKind, KindIndex, TypeIndex};

use crate::ecs::pool::{AnyPool, ComponentPool};

/// Owns one [`ComponentPool`] per registered component type and the mapping
/// from Rust type to [`TypeIndex`].
///
/// A type is registered the first time its pool is needed; the assigned
/// index is stable for the registry's lifetime and doubles as the bit id
/// used in [`ComponentMask`](crate::ecs::ComponentMask)s.
pub struct ComponentRegistry {
    /// Pools indexed by their assigned `TypeIndex`.
    pools: Vec<Box<dyn AnyPool>>,
    by_type: HashMap<TypeId, TypeIndex>,
    pool_capacity: usize,
}

impl ComponentRegistry {
    pub(crate) fn new(pool_capacity: usize) -> Self {
        Self {
            pools: Vec::new(),
            by_type: HashMap::new(),
            pool_capacity,
        }
    }

    /// Returns `T`'s type index, creating and registering its pool on first
    /// use.
    pub fn type_index_of<T: Component + Default>(&mut self) -> TypeIndex {
        if let Some(&index) = self.by_type.get(&TypeId::of::<T>()) {
            return index;
        }
        let index = self.pools.len() as TypeIndex;
        self.pools
            .push(Box::new(ComponentPool::<T>::new(index, self.pool_capacity)));
        self.by_type.insert(TypeId::of::<T>(), index);
        log::debug!(
            "registered component pool #{index} for `{}`",
            std::any::type_name::<T>()
        );
        index
    }

    /// Returns `T`'s type index if its pool already exists, without
    /// registering anything.
    pub fn registered_index<T: Component>(&self) -> Option<TypeIndex> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Typed access to `T`'s pool under its known index.
    pub fn pool<T: Component>(&self, index: TypeIndex) -> &ComponentPool<T> {
        // The index was assigned to T's pool at registration; the downcast
        // cannot fail for an index obtained from this registry.
        self.pools[index as usize]
            .as_any()
            .downcast_ref::<ComponentPool<T>>()
            .unwrap()
    }

    /// Mutable typed access to `T`'s pool under its known index.
    pub fn pool_mut<T: Component>(&mut self, index: TypeIndex) -> &mut ComponentPool<T> {
        self.pools[index as usize]
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
            .unwrap()
    }

    /// Type-erased access to the pool under `index`.
    pub(crate) fn any_pool(&self, index: TypeIndex) -> &dyn AnyPool {
        &*self.pools[index as usize]
    }

    /// Mutable type-erased access to the pool under `index`.
    pub(crate) fn any_pool_mut(&mut self, index: TypeIndex) -> &mut dyn AnyPool {
        &mut *self.pools[index as usize]
    }

    /// Number of registered component types.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// True when no component type has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Trims every pool's backing storage.
    pub(crate) fn shrink_all(&mut self) {
        for pool in &mut self.pools {
            pool.shrink();
        }
    }
}

/// Maps entity-kind marker types to their assigned indices.
#[derive(Default)]
pub struct EntityKindRegistry {
    by_type: HashMap<TypeId, KindIndex>,
}

impl EntityKindRegistry {
    /// Returns `K`'s kind index, assigning one on first use.
    pub fn kind_index_of<K: EntityKind>(&mut self) -> KindIndex {
        let next = self.by_type.len() as KindIndex;
        *self.by_type.entry(TypeId::of::<K>()).or_insert(next)
    }

    /// Number of distinct entity kinds seen so far.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// True when no entity kind has been used yet.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
