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

//! Recycling storage for component instances, one pool per component type.

use std::any::Any;

use telos_core::ecs::{Component, TypeIndex};

/// Dense storage for instances of one component type.
///
/// Live instances sit in a dense array addressed by slot index; recycled
/// slots are pushed onto a LIFO free-list and handed back out before any new
/// slot is constructed, so instances are reused, never reallocated
/// individually. "Entity E has component T" is represented elsewhere (by the
/// supervisor) as an index into this pool.
pub struct ComponentPool<T: Component> {
    items: Vec<T>,
    /// Slot indices available for reuse. LIFO: the most recently recycled
    /// slot is the next one handed out.
    reserved: Vec<u32>,
    factory: Box<dyn Fn() -> T>,
    type_index: TypeIndex,
    min_capacity: usize,
}

impl<T: Component + Default> ComponentPool<T> {
    /// Creates an empty pool for component type `T` under the given
    /// registry-assigned type index.
    pub(crate) fn new(type_index: TypeIndex, min_capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(min_capacity),
            reserved: Vec::with_capacity(min_capacity),
            factory: Box::new(T::default),
            type_index,
            min_capacity,
        }
    }
}

impl<T: Component> ComponentPool<T> {
    /// Hands out a slot: the most recently recycled one if any, otherwise a
    /// newly constructed instance appended at the tail. O(1) amortized; the
    /// backing array grows by doubling.
    pub fn request_slot(&mut self) -> u32 {
        if let Some(slot) = self.reserved.pop() {
            slot
        } else {
            let slot = self.items.len() as u32;
            self.items.push((self.factory)());
            slot
        }
    }

    /// Returns a slot to the free-list.
    ///
    /// Runs the type's reset hook if it declares `AUTO_RESET`. Debug builds
    /// then verify no reference-bearing field still holds a value; a
    /// retained reference is a leak defect and fatal. Release builds skip
    /// the check entirely.
    pub fn recycle(&mut self, slot: u32) {
        if T::AUTO_RESET {
            self.get_mut(slot).reset();
        }
        #[cfg(debug_assertions)]
        if let Some(field) = self.get(slot).leaked_reference() {
            log::error!(
                "retained reference in recycled `{}`: field `{field}` still holds a value",
                std::any::type_name::<T>()
            );
            panic!(
                "retained reference in recycled `{}`: field `{field}` was not cleared before release \
                 (stop reporting it from leaked_reference() if the retention is intentional)",
                std::any::type_name::<T>()
            );
        }
        self.reserved.push(slot);
    }

    /// Direct access to the instance in `slot`.
    ///
    /// The caller is responsible for slot validity: debug builds
    /// bounds-check, release builds do not.
    #[inline]
    pub fn get(&self, slot: u32) -> &T {
        #[cfg(debug_assertions)]
        {
            &self.items[slot as usize]
        }
        #[cfg(not(debug_assertions))]
        // SAFETY: slots are only produced by `request_slot` and stay in
        // range for the lifetime of the pool; passing anything else is a
        // caller bug the release build does not pay to detect.
        unsafe {
            self.items.get_unchecked(slot as usize)
        }
    }

    /// Mutable variant of [`get`](Self::get); same validity contract.
    #[inline]
    pub fn get_mut(&mut self, slot: u32) -> &mut T {
        #[cfg(debug_assertions)]
        {
            &mut self.items[slot as usize]
        }
        #[cfg(not(debug_assertions))]
        // SAFETY: see `get`.
        unsafe {
            self.items.get_unchecked_mut(slot as usize)
        }
    }

    /// Registers a custom constructor used whenever the pool needs a fresh
    /// instance, replacing `T::default`.
    pub fn set_factory(&mut self, factory: impl Fn() -> T + 'static) {
        self.factory = Box::new(factory);
    }

    /// Grows the backing array so it can hold at least `capacity` instances
    /// without reallocating. No-op if already large enough.
    pub fn set_capacity(&mut self, capacity: usize) {
        if capacity > self.items.capacity() {
            self.items.reserve_exact(capacity - self.items.len());
        }
    }

    /// Trims the backing arrays to the next power of two at or above their
    /// current counts, never below the pool's minimum floor.
    pub fn shrink(&mut self) {
        let floor = self.min_capacity;
        self.items
            .shrink_to(self.items.len().max(floor).next_power_of_two());
        self.reserved
            .shrink_to(self.reserved.len().max(floor).next_power_of_two());
    }

    /// Number of instances ever constructed (live plus recycled).
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Current capacity of the instance array.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// True when no instance has been constructed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of slots currently sitting in the free-list.
    #[inline]
    pub fn reserved_len(&self) -> usize {
        self.reserved.len()
    }
}

/// Type-erased capability surface of a [`ComponentPool`], for the
/// supervisor's registry.
///
/// Each pool implements this explicitly; the registry maps component types
/// to pools at registration time, so no runtime reflection is involved
/// anywhere. Typed access goes through [`as_any`](AnyPool::as_any) and a
/// downcast to the concrete `ComponentPool<T>`.
pub trait AnyPool {
    /// Returns the slot to the free-list (reset hook and debug leak check
    /// included), without knowing the component type.
    fn recycle_slot(&mut self, slot: u32);

    /// The registry-assigned index of the pooled component type.
    fn type_index(&self) -> TypeIndex;

    /// Whether the pooled type is stripped by the one-frame sweep.
    fn is_one_frame(&self) -> bool;

    /// Whether the pooled type is kept out of filter mirror arrays.
    fn is_ignore_in_filter(&self) -> bool;

    /// Name of the pooled component type, for diagnostics.
    fn component_name(&self) -> &'static str;

    /// Trims backing storage; see [`ComponentPool::shrink`].
    fn shrink(&mut self);

    /// Upcast for downcasting to the concrete pool type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete pool type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyPool for ComponentPool<T> {
    fn recycle_slot(&mut self, slot: u32) {
        self.recycle(slot);
    }

    fn type_index(&self) -> TypeIndex {
        self.type_index
    }

    fn is_one_frame(&self) -> bool {
        T::ONE_FRAME
    }

    fn is_ignore_in_filter(&self) -> bool {
        T::IGNORE_IN_FILTER
    }

    fn component_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn shrink(&mut self) {
        ComponentPool::shrink(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
