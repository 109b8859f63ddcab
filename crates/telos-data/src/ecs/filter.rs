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

//! Live query result sets, incrementally maintained by the supervisor.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use telos_core::ecs::{Component, Entity, EntityKind, KindIndex, TypeIndex};

use crate::ecs::mask::ComponentMask;
use crate::ecs::registry::{ComponentRegistry, EntityKindRegistry};
use crate::ecs::supervisor::EntitySupervisor;

/// Observer of one filter's add/remove events.
///
/// Callbacks run synchronously, in listener registration order, after the
/// filter's entity list has been updated. The supervisor passes itself in so
/// a listener can issue further mutations — those are captured into the
/// deferred queue and become visible only after the next flush, never
/// during the callback.
pub trait FilterListener {
    /// The entity's mask newly became compatible with the filter.
    fn on_entity_added(&mut self, world: &mut EntitySupervisor, entity: Entity);

    /// The entity stopped being compatible, or was destroyed.
    fn on_entity_removed(&mut self, world: &mut EntitySupervisor, entity: Entity);
}

/// A shared, clonable listener registration.
pub type SharedListener = Rc<RefCell<dyn FilterListener>>;

/// One required or forbidden type in a [`FilterSpec`], resolved against the
/// supervisor's registry when the filter is built.
#[derive(Clone, Copy)]
struct TypeReq {
    name: &'static str,
    register: fn(&mut ComponentRegistry) -> TypeIndex,
}

/// Declares a filter's shape: 1–N required component types, any number of
/// forbidden types, and an optional entity-kind restriction.
///
/// ```ignore
/// let moving = world.filter(
///     FilterSpec::new()
///         .include::<Position>()
///         .include::<Velocity>()
///         .exclude::<Frozen>(),
/// );
/// ```
#[derive(Default, Clone)]
pub struct FilterSpec {
    includes: Vec<TypeReq>,
    excludes: Vec<TypeReq>,
    kind: Option<fn(&mut EntityKindRegistry) -> KindIndex>,
}

impl FilterSpec {
    /// Starts an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires component type `T`. Declaring the same type twice is a
    /// configuration error caught at registration in debug builds.
    pub fn include<T: Component + Default>(mut self) -> Self {
        self.includes.push(TypeReq {
            name: std::any::type_name::<T>(),
            register: ComponentRegistry::type_index_of::<T>,
        });
        self
    }

    /// Forbids component type `T`.
    pub fn exclude<T: Component + Default>(mut self) -> Self {
        self.excludes.push(TypeReq {
            name: std::any::type_name::<T>(),
            register: ComponentRegistry::type_index_of::<T>,
        });
        self
    }

    /// Restricts the filter to entities created with kind `K`; entities of
    /// any other kind are skipped even when their masks match.
    pub fn of_kind<K: EntityKind>(mut self) -> Self {
        self.kind = Some(EntityKindRegistry::kind_index_of::<K>);
        self
    }

    pub(crate) fn resolve(
        &self,
        components: &mut ComponentRegistry,
        kinds: &mut EntityKindRegistry,
    ) -> ResolvedSpec {
        let include_types: Vec<TypeIndex> =
            self.includes.iter().map(|r| (r.register)(components)).collect();
        let exclude_types: Vec<TypeIndex> =
            self.excludes.iter().map(|r| (r.register)(components)).collect();
        let kind = self.kind.map(|resolve| resolve(kinds));

        let mut include_mask = ComponentMask::new();
        for &t in &include_types {
            include_mask.set(t, true);
        }
        let mut exclude_mask = ComponentMask::new();
        for &t in &exclude_types {
            exclude_mask.set(t, true);
        }

        #[cfg(debug_assertions)]
        {
            assert!(
                !self.includes.is_empty(),
                "invalid filter: at least one included component type is required"
            );
            assert!(
                include_mask.len() == self.includes.len()
                    && exclude_mask.len() == self.excludes.len(),
                "invalid filter {self:?}: possible duplicated component types"
            );
            assert!(
                !include_mask.intersects(&exclude_mask),
                "invalid filter {self:?}: include types intersect with exclude types"
            );
        }

        ResolvedSpec {
            include_types,
            exclude_types,
            include_mask,
            exclude_mask,
            kind,
        }
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSpec")
            .field("include", &self.includes.iter().map(|r| r.name).collect::<Vec<_>>())
            .field("exclude", &self.excludes.iter().map(|r| r.name).collect::<Vec<_>>())
            .finish()
    }
}

/// A [`FilterSpec`] with every type resolved to its registry index.
pub(crate) struct ResolvedSpec {
    pub(crate) include_types: Vec<TypeIndex>,
    pub(crate) exclude_types: Vec<TypeIndex>,
    pub(crate) include_mask: ComponentMask,
    pub(crate) exclude_mask: ComponentMask,
    pub(crate) kind: Option<KindIndex>,
}

/// The state of one registered filter.
///
/// `entities` holds the currently matching ids in insertion order. For each
/// included type that is not ignore-in-filter, `mirrors` holds a parallel
/// array of pool slots aligned index-for-index with `entities`, giving
/// consumers O(1) access to the matched instances without an entity→slot
/// lookup.
pub struct Filter {
    pub(crate) include_mask: ComponentMask,
    pub(crate) exclude_mask: ComponentMask,
    /// Included types in declaration order; `mirrors` is parallel to this.
    pub(crate) include_types: Vec<TypeIndex>,
    pub(crate) kind: Option<KindIndex>,
    pub(crate) entities: Vec<Entity>,
    pub(crate) mirrors: Vec<Option<Vec<u32>>>,
    pub(crate) listeners: Vec<SharedListener>,
}

impl Filter {
    /// Entity-kind gate plus mask compatibility.
    pub(crate) fn matches(&self, mask: &ComponentMask, kind: Option<KindIndex>) -> bool {
        (self.kind.is_none() || self.kind == kind)
            && mask.is_compatible(&self.include_mask, &self.exclude_mask)
    }

    /// Appends a newly compatible entity. `slots` is the entity's pool slot
    /// per included type, in declaration order; only mirrored types store
    /// theirs.
    pub(crate) fn push_entity(&mut self, entity: Entity, slots: &[u32]) {
        debug_assert_eq!(slots.len(), self.include_types.len());
        for (mirror, &slot) in self.mirrors.iter_mut().zip(slots) {
            if let Some(mirror) = mirror {
                mirror.push(slot);
            }
        }
        self.entities.push(entity);
    }

    /// Removes an entity by linear scan, shifting every later entry (and
    /// the mirror arrays, in lockstep) left by one to preserve insertion
    /// order. O(n) in filter size — the documented trade-off favoring
    /// stable iteration order over swap-removal.
    pub(crate) fn remove_entity(&mut self, entity: Entity) -> bool {
        match self.entities.iter().position(|&e| e == entity) {
            Some(i) => {
                self.entities.remove(i);
                for mirror in self.mirrors.iter_mut().flatten() {
                    mirror.remove(i);
                }
                true
            }
            None => false,
        }
    }
}

/// A cheap-to-clone handle on a registered filter.
///
/// Handles are handed out by [`EntitySupervisor::filter`] and stay valid for
/// the supervisor's lifetime; one filter instance exists per declared shape,
/// so repeated acquisition yields handles on the same state.
#[derive(Clone)]
pub struct FilterHandle {
    pub(crate) core: Rc<RefCell<Filter>>,
    pub(crate) scans: Rc<Cell<u32>>,
}

impl FilterHandle {
    /// True when no entity currently matches.
    pub fn is_empty(&self) -> bool {
        self.core.borrow().entities.is_empty()
    }

    /// Number of currently matching entities.
    pub fn len(&self) -> usize {
        self.core.borrow().entities.len()
    }

    /// The i-th matching entity, in insertion order.
    pub fn entity(&self, index: usize) -> Entity {
        self.core.borrow().entities[index]
    }

    /// True when `entity` is currently in the result set.
    pub fn contains(&self, entity: Entity) -> bool {
        self.core.borrow().entities.contains(&entity)
    }

    /// Iterates the currently matching entity ids in insertion order.
    ///
    /// The iterator registers itself as an in-flight scan: for its entire
    /// lifetime the supervisor captures mutations into the deferred queue
    /// instead of applying them, so the result set cannot change mid-scan.
    /// Drop the iterator before flushing.
    pub fn iter(&self) -> FilterIter<'_> {
        let guard = ScanGuard::new(Rc::clone(&self.scans));
        let filter = self.core.borrow();
        let count = filter.entities.len();
        FilterIter {
            filter,
            count,
            index: 0,
            _guard: guard,
        }
    }

    /// Subscribes a listener to this filter's add/remove events.
    ///
    /// Registering the same listener (by identity) twice is a programming
    /// error, fatal in debug builds.
    pub fn add_listener(&self, listener: SharedListener) {
        let mut filter = self.core.borrow_mut();
        #[cfg(debug_assertions)]
        assert!(
            !filter.listeners.iter().any(|l| Rc::ptr_eq(l, &listener)),
            "listener already subscribed"
        );
        filter.listeners.push(listener);
    }

    /// Unsubscribes a listener (by identity). Unknown listeners are ignored.
    pub fn remove_listener(&self, listener: &SharedListener) {
        let mut filter = self.core.borrow_mut();
        if let Some(i) = filter.listeners.iter().position(|l| Rc::ptr_eq(l, listener)) {
            filter.listeners.remove(i);
        }
    }
}

struct ScanGuard {
    scans: Rc<Cell<u32>>,
}

impl ScanGuard {
    fn new(scans: Rc<Cell<u32>>) -> Self {
        scans.set(scans.get() + 1);
        Self { scans }
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.scans.set(self.scans.get() - 1);
    }
}

/// Lazy, restartable iterator over a filter's entity list.
///
/// The length is snapshotted at creation; since every mutation issued while
/// the iterator lives is deferred, the underlying list cannot change out
/// from under it.
pub struct FilterIter<'a> {
    filter: Ref<'a, Filter>,
    count: usize,
    index: usize,
    _guard: ScanGuard,
}

impl Iterator for FilterIter<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        if self.index < self.count {
            let entity = self.filter.entities[self.index];
            self.index += 1;
            Some(entity)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FilterIter<'_> {}
