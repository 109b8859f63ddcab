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

//! The entity/component authority: owns the entity→mask table, the id
//! lifecycle, the pool registry, the active filters, and the
//! deferred-mutation queue.

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use telos_core::ecs::{
    Component, EcsError, Entity, EntityKind, KindIndex, SupervisorConfig, TypeIndex,
};

use crate::ecs::command::PendingOp;
use crate::ecs::filter::{Filter, FilterHandle, FilterSpec};
use crate::ecs::mask::ComponentMask;
use crate::ecs::registry::{ComponentRegistry, EntityKindRegistry};

/// Fails a lookup: panic with diagnostics in debug builds, undefined
/// (unreachable) in release builds. The release behavior is the documented
/// safety-for-throughput trade-off of the unchecked fast path; callers who
/// want a checked lookup use the `try_*` variants.
macro_rules! lookup_failure {
    ($err:expr) => {{
        let _err = $err;
        #[cfg(debug_assertions)]
        panic!("{}", _err);
        #[cfg(not(debug_assertions))]
        // SAFETY: reaching this arm means the caller violated the fast
        // path's precondition (entity alive and component present); the
        // contract makes that unreachable.
        unsafe {
            std::hint::unreachable_unchecked()
        }
    }};
}

/// "Entity E has component T": T's pool slot, recorded on E.
#[derive(Clone, Copy)]
struct ComponentLink {
    type_index: TypeIndex,
    slot: u32,
}

/// Per-entity row of the authority table.
struct EntityRecord {
    mask: ComponentMask,
    /// Pool slots for every component currently attached. Order is not
    /// observable; removal swaps with the tail.
    links: Vec<ComponentLink>,
    kind: Option<KindIndex>,
    alive: bool,
}

/// Canonical identity of a filter shape, for singleton reuse.
#[derive(PartialEq, Eq, Hash)]
struct FilterKey {
    includes: Vec<TypeIndex>,
    excludes: Vec<TypeIndex>,
    kind: Option<KindIndex>,
}

/// A point-in-time snapshot of the supervisor's bookkeeping, for
/// diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorStats {
    /// Entities currently alive.
    pub live_entities: usize,
    /// Released ids awaiting reuse.
    pub reserved_entities: usize,
    /// Registered component pools.
    pub component_pools: usize,
    /// Registered filters.
    pub filters: usize,
    /// Mutations sitting in the deferred queue.
    pub pending_ops: usize,
}

/// The single authority over entities, components, masks and filters.
///
/// All mutation flows through the supervisor: it updates the entity's mask,
/// re-evaluates the mask against every registered filter, and fires
/// add/remove notifications into the filters that changed their mind. A
/// mutation arriving while a filter is being notified or iterated is not
/// applied — it is captured into a FIFO queue and replayed by
/// [`process_delayed_updates`](Self::process_delayed_updates), which the
/// scheduling layer must call at the boundary after every discrete step.
///
/// The supervisor is strictly single-threaded; a concurrent embedding must
/// serialize every entry point externally.
pub struct EntitySupervisor {
    components: ComponentRegistry,
    kinds: EntityKindRegistry,
    entities: Vec<EntityRecord>,
    /// Released entity ids, reused LIFO before any new id is allocated.
    reserved_entities: Vec<u32>,
    filters: Vec<Rc<RefCell<Filter>>>,
    filter_index: HashMap<FilterKey, usize>,
    pending: VecDeque<PendingOp>,
    /// Depth of in-flight listener dispatch.
    notify_depth: u32,
    /// In-flight filter iterations, shared with every handed-out
    /// [`FilterHandle`].
    active_scans: Rc<Cell<u32>>,
    filter_capacity: usize,
}

impl Default for EntitySupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntitySupervisor {
    /// Creates an empty supervisor with default capacities.
    pub fn new() -> Self {
        Self::with_config(SupervisorConfig::default())
    }

    /// Creates an empty supervisor with the given initial capacities.
    pub fn with_config(config: SupervisorConfig) -> Self {
        Self {
            components: ComponentRegistry::new(config.pool_capacity),
            kinds: EntityKindRegistry::default(),
            entities: Vec::with_capacity(config.entity_capacity),
            reserved_entities: Vec::with_capacity(config.entity_capacity),
            filters: Vec::new(),
            filter_index: HashMap::new(),
            pending: VecDeque::new(),
            notify_depth: 0,
            active_scans: Rc::new(Cell::new(0)),
            filter_capacity: config.filter_capacity,
        }
    }

    // ---- entity lifecycle ----

    /// Allocates a fresh or recycled entity id with an empty mask and no
    /// kind tag. Always applied immediately, even during notification: an
    /// empty mask cannot satisfy any filter, so no scan can tell.
    pub fn create_entity(&mut self) -> Entity {
        self.spawn(None)
    }

    /// [`create_entity`](Self::create_entity) with a kind tag, letting
    /// kind-scoped filters restrict themselves to this entity class.
    pub fn create_entity_of<K: EntityKind>(&mut self) -> Entity {
        let kind = self.kinds.kind_index_of::<K>();
        self.spawn(Some(kind))
    }

    /// Creates an entity and immediately attaches a `T`.
    pub fn create_entity_with<T: Component + Default>(&mut self) -> (Entity, &mut T) {
        let entity = self.spawn(None);
        let component = self.add_component::<T>(entity);
        (entity, component)
    }

    fn spawn(&mut self, kind: Option<KindIndex>) -> Entity {
        let entity = if let Some(index) = self.reserved_entities.pop() {
            let record = &mut self.entities[index as usize];
            debug_assert!(record.mask.is_empty() && record.links.is_empty());
            record.alive = true;
            record.kind = kind;
            Entity::from_raw(index)
        } else {
            let index = self.entities.len() as u32;
            self.entities.push(EntityRecord {
                mask: ComponentMask::new(),
                links: Vec::new(),
                kind,
                alive: true,
            });
            Entity::from_raw(index)
        };
        log::trace!("created entity {entity}");
        entity
    }

    /// True when `entity` refers to a currently-live entity.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities
            .get(entity.index() as usize)
            .is_some_and(|r| r.alive)
    }

    /// Removes an entity: every component it holds is removed (recycling
    /// the pool slot and notifying the filters that lose it), then the id
    /// is released for reuse. Deferred if a notification or scan is in
    /// flight.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.debug_assert_alive(entity);
        if self.deferred() {
            self.pending.push_back(PendingOp::RemoveEntity { entity });
            return;
        }
        self.apply_entity_removal(entity);
    }

    // ---- component mutation ----

    /// Attaches a `T` to the entity and returns the pooled instance.
    ///
    /// The pool slot is allocated and linked to the entity immediately, so
    /// the instance is usable (and visible to `get_component`) even when
    /// the mask update and filter re-evaluation are deferred by an
    /// in-flight notification or scan.
    ///
    /// The entity must not already hold a `T`: debug builds panic, release
    /// builds return the existing instance. Use
    /// [`ensure_component`](Self::ensure_component) for add-or-get.
    pub fn add_component<T: Component + Default>(&mut self, entity: Entity) -> &mut T {
        self.debug_assert_alive(entity);
        let type_index = self.components.type_index_of::<T>();
        if let Some(slot) = self.link_slot(entity, type_index) {
            if cfg!(debug_assertions) {
                panic!(
                    "entity {entity} already has a `{}` component; use ensure_component \
                     for add-or-get semantics",
                    std::any::type_name::<T>()
                );
            }
            return self.components.pool_mut::<T>(type_index).get_mut(slot);
        }
        let slot = self.attach(entity, type_index, |registry| {
            registry.pool_mut::<T>(type_index).request_slot()
        });
        self.components.pool_mut::<T>(type_index).get_mut(slot)
    }

    /// Returns the entity's `T`, attaching one first if absent. The flag is
    /// `true` when the instance was newly attached.
    pub fn ensure_component<T: Component + Default>(
        &mut self,
        entity: Entity,
    ) -> (&mut T, bool) {
        self.debug_assert_alive(entity);
        let type_index = self.components.type_index_of::<T>();
        if let Some(slot) = self.link_slot(entity, type_index) {
            return (self.components.pool_mut::<T>(type_index).get_mut(slot), false);
        }
        let slot = self.attach(entity, type_index, |registry| {
            registry.pool_mut::<T>(type_index).request_slot()
        });
        (self.components.pool_mut::<T>(type_index).get_mut(slot), true)
    }

    /// Detaches the entity's `T`, recycling its pool slot and notifying the
    /// filters that lose the entity. Deferred if a notification or scan is
    /// in flight (the instance stays readable until the flush).
    ///
    /// The entity must hold a `T`: debug builds panic, release builds
    /// silently no-op.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) {
        self.debug_assert_alive(entity);
        let present = self
            .components
            .registered_index::<T>()
            .filter(|&t| self.link_slot(entity, t).is_some());
        let Some(type_index) = present else {
            #[cfg(debug_assertions)]
            panic!(
                "entity {entity} has no `{}` component to remove",
                std::any::type_name::<T>()
            );
            #[cfg(not(debug_assertions))]
            return;
        };
        if self.deferred() {
            self.pending.push_back(PendingOp::RemoveComponent { entity, type_index });
            return;
        }
        self.apply_component_removal(entity, type_index);
    }

    // ---- component lookup ----

    /// Direct access to the entity's `T` — the unchecked fast path.
    ///
    /// Requesting a component the entity does not hold is lookup misuse:
    /// fatal in debug builds, undefined in release builds. See
    /// [`try_get_component`](Self::try_get_component) for the checked
    /// variant.
    pub fn get_component<T: Component>(&self, entity: Entity) -> &T {
        match self.lookup_slot::<T>(entity) {
            Ok((type_index, slot)) => self.components.pool::<T>(type_index).get(slot),
            Err(err) => lookup_failure!(err),
        }
    }

    /// Mutable variant of [`get_component`](Self::get_component); same
    /// contract.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        match self.lookup_slot::<T>(entity) {
            Ok((type_index, slot)) => self.components.pool_mut::<T>(type_index).get_mut(slot),
            Err(err) => lookup_failure!(err),
        }
    }

    /// Checked lookup of the entity's `T`.
    pub fn try_get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        let (type_index, slot) = self.lookup_slot::<T>(entity)?;
        Ok(self.components.pool::<T>(type_index).get(slot))
    }

    /// Checked mutable lookup of the entity's `T`.
    pub fn try_get_component_mut<T: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<&mut T, EcsError> {
        let (type_index, slot) = self.lookup_slot::<T>(entity)?;
        Ok(self.components.pool_mut::<T>(type_index).get_mut(slot))
    }

    /// True when the (live) entity currently holds a `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.lookup_slot::<T>(entity).is_ok()
    }

    fn lookup_slot<T: Component>(&self, entity: Entity) -> Result<(TypeIndex, u32), EcsError> {
        let record = self
            .entities
            .get(entity.index() as usize)
            .filter(|r| r.alive)
            .ok_or(EcsError::DeadEntity(entity))?;
        let type_index = self
            .components
            .registered_index::<T>()
            .ok_or(EcsError::UnknownComponentType(std::any::type_name::<T>()))?;
        let slot = record
            .links
            .iter()
            .find(|l| l.type_index == type_index)
            .map(|l| l.slot)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            })?;
        Ok((type_index, slot))
    }

    // ---- filters ----

    /// Returns the filter for the declared shape, creating and registering
    /// it on first request; later requests for the same shape return a
    /// handle on the same instance.
    ///
    /// A filter registered while entities already exist is populated with
    /// the currently compatible ones in a single pass; from then on it is
    /// maintained purely incrementally.
    pub fn filter(&mut self, spec: FilterSpec) -> FilterHandle {
        let resolved = spec.resolve(&mut self.components, &mut self.kinds);

        let mut key = FilterKey {
            includes: resolved.include_types.clone(),
            excludes: resolved.exclude_types.clone(),
            kind: resolved.kind,
        };
        key.includes.sort_unstable();
        key.excludes.sort_unstable();
        if let Some(&index) = self.filter_index.get(&key) {
            return self.handle(index);
        }

        let mirrors = resolved
            .include_types
            .iter()
            .map(|&t| {
                if self.components.any_pool(t).is_ignore_in_filter() {
                    None
                } else {
                    Some(Vec::with_capacity(self.filter_capacity))
                }
            })
            .collect();
        let mut filter = Filter {
            include_mask: resolved.include_mask,
            exclude_mask: resolved.exclude_mask,
            include_types: resolved.include_types,
            kind: resolved.kind,
            entities: Vec::with_capacity(self.filter_capacity),
            mirrors,
            listeners: Vec::new(),
        };

        // One-time backfill for filters registered after entities exist.
        // No listeners can be subscribed yet, so nothing is notified.
        for (index, record) in self.entities.iter().enumerate() {
            if record.alive && filter.matches(&record.mask, record.kind) {
                let entity = Entity::from_raw(index as u32);
                let slots = Self::slots_for(record, &filter.include_types);
                filter.push_entity(entity, &slots);
            }
        }

        log::debug!(
            "registered filter +{:?} -{:?} (kind {:?}), {} matching",
            filter.include_mask,
            filter.exclude_mask,
            filter.kind,
            filter.entities.len()
        );
        let index = self.filters.len();
        self.filters.push(Rc::new(RefCell::new(filter)));
        self.filter_index.insert(key, index);
        self.handle(index)
    }

    /// The `T` instance mirrored at position `index` of the filter's entity
    /// list — direct access during iteration without an entity→slot lookup.
    ///
    /// `T` must be one of the filter's included types and not declared
    /// ignore-in-filter; violations are lookup misuse (fatal in debug
    /// builds, undefined in release builds).
    pub fn filter_component<T: Component>(&self, handle: &FilterHandle, index: usize) -> &T {
        match self.mirror_slot::<T>(handle, index) {
            Ok((type_index, slot)) => self.components.pool::<T>(type_index).get(slot),
            Err(err) => lookup_failure!(err),
        }
    }

    /// Mutable variant of [`filter_component`](Self::filter_component).
    pub fn filter_component_mut<T: Component>(
        &mut self,
        handle: &FilterHandle,
        index: usize,
    ) -> &mut T {
        match self.mirror_slot::<T>(handle, index) {
            Ok((type_index, slot)) => self.components.pool_mut::<T>(type_index).get_mut(slot),
            Err(err) => lookup_failure!(err),
        }
    }

    fn mirror_slot<T: Component>(
        &self,
        handle: &FilterHandle,
        index: usize,
    ) -> Result<(TypeIndex, u32), &'static str> {
        let type_index = self
            .components
            .registered_index::<T>()
            .ok_or("component type is not registered")?;
        let filter = handle.core.borrow();
        let position = filter
            .include_types
            .iter()
            .position(|&t| t == type_index)
            .ok_or("component type is not included in this filter")?;
        let mirror = filter.mirrors[position]
            .as_ref()
            .ok_or("component type is declared ignore-in-filter and not mirrored")?;
        let slot = *mirror
            .get(index)
            .ok_or("index is past the end of the filter")?;
        Ok((type_index, slot))
    }

    // ---- scheduling-cycle entry points ----

    /// Replays every mutation captured while a notification or scan was in
    /// flight, in original request order, then leaves the queue empty.
    /// Mutations enqueued by listeners *during* the replay are drained in
    /// the same call.
    ///
    /// The scheduling layer must call this at the boundary after every
    /// discrete step, before the next step begins. Must not be called while
    /// a filter iteration is alive.
    pub fn process_delayed_updates(&mut self) {
        debug_assert_eq!(self.notify_depth, 0, "flush during notification");
        debug_assert_eq!(
            self.active_scans.get(),
            0,
            "flush while a filter iteration is in flight"
        );
        while let Some(op) = self.pending.pop_front() {
            match op {
                PendingOp::AddComponent { entity, type_index } => {
                    self.apply_mask_set(entity, type_index);
                }
                PendingOp::RemoveComponent { entity, type_index } => {
                    self.apply_component_removal(entity, type_index);
                }
                PendingOp::RemoveEntity { entity } => {
                    self.apply_entity_removal(entity);
                }
            }
        }
    }

    /// Strips every component whose type is declared one-frame from every
    /// entity currently holding one. Invoked by the scheduling layer once
    /// per full cycle, at a flush boundary.
    pub fn remove_one_frame_components(&mut self) {
        debug_assert_eq!(self.notify_depth, 0, "one-frame sweep during notification");
        debug_assert_eq!(
            self.active_scans.get(),
            0,
            "one-frame sweep while a filter iteration is in flight"
        );
        let mut doomed = Vec::new();
        for (index, record) in self.entities.iter().enumerate() {
            if !record.alive {
                continue;
            }
            for link in &record.links {
                if self.components.any_pool(link.type_index).is_one_frame() {
                    doomed.push((Entity::from_raw(index as u32), link.type_index));
                }
            }
        }
        for (entity, type_index) in doomed {
            self.apply_component_removal(entity, type_index);
        }
    }

    // ---- diagnostics ----

    /// Snapshot of the supervisor's bookkeeping counts.
    pub fn stats(&self) -> SupervisorStats {
        SupervisorStats {
            live_entities: self.entities.iter().filter(|r| r.alive).count(),
            reserved_entities: self.reserved_entities.len(),
            component_pools: self.components.len(),
            filters: self.filters.len(),
            pending_ops: self.pending.len(),
        }
    }

    /// Trims every pool's backing storage down to its power-of-two floor.
    pub fn shrink_pools(&mut self) {
        self.components.shrink_all();
    }

    /// Registers a custom constructor for `T`'s pool, replacing
    /// `T::default` for every instance constructed from now on.
    pub fn set_component_factory<T: Component + Default>(
        &mut self,
        factory: impl Fn() -> T + 'static,
    ) {
        let index = self.components.type_index_of::<T>();
        self.components.pool_mut::<T>(index).set_factory(factory);
    }

    /// Pre-grows `T`'s pool to hold at least `capacity` instances. No-op if
    /// the pool is already large enough.
    pub fn set_component_capacity<T: Component + Default>(&mut self, capacity: usize) {
        let index = self.components.type_index_of::<T>();
        self.components.pool_mut::<T>(index).set_capacity(capacity);
    }

    /// The component registry, for direct pool configuration
    /// (`set_factory`, `set_capacity`).
    pub fn components(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    // ---- internals ----

    /// True while mutations must be captured instead of applied: a listener
    /// dispatch is on the stack, a filter iteration is alive, or earlier
    /// mutations are already queued (applying out of order would let a
    /// later mutation overtake a queued one — e.g. recycling an id a queued
    /// op still targets).
    fn deferred(&self) -> bool {
        self.notify_depth > 0 || self.active_scans.get() > 0 || !self.pending.is_empty()
    }

    fn handle(&self, index: usize) -> FilterHandle {
        FilterHandle {
            core: Rc::clone(&self.filters[index]),
            scans: Rc::clone(&self.active_scans),
        }
    }

    fn debug_assert_alive(&self, entity: Entity) {
        debug_assert!(
            self.is_alive(entity),
            "operation on dead entity {entity} (stale id reuse?)"
        );
    }

    fn link_slot(&self, entity: Entity, type_index: TypeIndex) -> Option<u32> {
        self.entities[entity.index() as usize]
            .links
            .iter()
            .find(|l| l.type_index == type_index)
            .map(|l| l.slot)
    }

    /// Allocates a slot, links it to the entity, and either applies the
    /// mask/filter update now or defers it. Returns the slot.
    fn attach(
        &mut self,
        entity: Entity,
        type_index: TypeIndex,
        request: impl FnOnce(&mut ComponentRegistry) -> u32,
    ) -> u32 {
        let slot = request(&mut self.components);
        self.entities[entity.index() as usize]
            .links
            .push(ComponentLink { type_index, slot });
        log::trace!(
            "attached `{}` (slot {slot}) to entity {entity}",
            self.components.any_pool(type_index).component_name()
        );
        if self.deferred() {
            self.pending.push_back(PendingOp::AddComponent { entity, type_index });
        } else {
            self.apply_mask_set(entity, type_index);
        }
        slot
    }

    /// Sets the mask bit and re-evaluates filters. Tolerant when replayed
    /// from the queue: skips quietly if the precondition has vanished (the
    /// entity died or the link was removed in the meantime).
    fn apply_mask_set(&mut self, entity: Entity, type_index: TypeIndex) {
        let Some(record) = self.entities.get_mut(entity.index() as usize) else {
            return;
        };
        if !record.alive
            || record.mask.get(type_index)
            || !record.links.iter().any(|l| l.type_index == type_index)
        {
            return;
        }
        let old_mask = record.mask.clone();
        record.mask.set(type_index, true);
        self.reevaluate_filters(entity, &old_mask);
    }

    /// Clears the mask bit, re-evaluates filters, then unlinks and recycles
    /// the pool slot. Tolerant when replayed from the queue.
    fn apply_component_removal(&mut self, entity: Entity, type_index: TypeIndex) {
        let Some(record) = self.entities.get_mut(entity.index() as usize) else {
            return;
        };
        if !record.alive || !record.links.iter().any(|l| l.type_index == type_index) {
            return;
        }
        let old_mask = record.mask.clone();
        record.mask.set(type_index, false);
        // Listeners observing the removal may still read the instance; the
        // link survives until after dispatch, the slot is recycled last.
        self.reevaluate_filters(entity, &old_mask);

        let record = &mut self.entities[entity.index() as usize];
        if let Some(position) = record.links.iter().position(|l| l.type_index == type_index) {
            let link = record.links.swap_remove(position);
            self.components.any_pool_mut(type_index).recycle_slot(link.slot);
            log::trace!(
                "detached `{}` (slot {}) from entity {entity}",
                self.components.any_pool(type_index).component_name(),
                link.slot
            );
        }
    }

    /// Removes every component (each with its own filter notifications),
    /// then releases the id. Tolerant when replayed from the queue.
    fn apply_entity_removal(&mut self, entity: Entity) {
        let index = entity.index() as usize;
        let Some(record) = self.entities.get(index) else {
            return;
        };
        if !record.alive {
            return;
        }
        while let Some(link) = self.entities[index].links.last().copied() {
            self.apply_component_removal(entity, link.type_index);
        }
        let record = &mut self.entities[index];
        debug_assert!(record.mask.is_empty());
        record.mask.clear();
        record.kind = None;
        record.alive = false;
        self.reserved_entities.push(entity.index());
        log::trace!("removed entity {entity}");
    }

    /// Pool slot per included type, in declaration order. Only called when
    /// the record's mask covers the include mask, so every lookup hits.
    fn slots_for(record: &EntityRecord, include_types: &[TypeIndex]) -> Vec<u32> {
        include_types
            .iter()
            .map(|&t| {
                record
                    .links
                    .iter()
                    .find(|l| l.type_index == t)
                    .map(|l| l.slot)
                    // A compatible mask implies a link for every included
                    // type; masks and links only change together.
                    .unwrap()
            })
            .collect()
    }

    /// Compares the entity's compatibility before and after a mask change
    /// against every registered filter, in registration order, and fires
    /// add/remove notifications into the ones whose answer flipped.
    fn reevaluate_filters(&mut self, entity: Entity, old_mask: &ComponentMask) {
        let record = &self.entities[entity.index() as usize];
        let new_mask = record.mask.clone();
        let kind = record.kind;
        // Filters registered *during* this dispatch backfill themselves and
        // are intentionally not revisited here.
        for index in 0..self.filters.len() {
            let filter = Rc::clone(&self.filters[index]);
            let (was, now) = {
                let filter = filter.borrow();
                (filter.matches(old_mask, kind), filter.matches(&new_mask, kind))
            };
            if was == now {
                continue;
            }
            if now {
                let slots = {
                    let record = &self.entities[entity.index() as usize];
                    Self::slots_for(record, &filter.borrow().include_types)
                };
                filter.borrow_mut().push_entity(entity, &slots);
                self.dispatch(&filter, entity, true);
            } else if filter.borrow_mut().remove_entity(entity) {
                self.dispatch(&filter, entity, false);
            }
        }
    }

    /// Fires listener callbacks for one filter event, after the filter's
    /// arrays were updated. Mutations issued by a callback land in the
    /// deferred queue; `notify_depth` is what routes them there.
    fn dispatch(&mut self, filter: &Rc<RefCell<Filter>>, entity: Entity, added: bool) {
        let listeners = filter.borrow().listeners.clone();
        if listeners.is_empty() {
            return;
        }
        self.notify_depth += 1;
        for listener in &listeners {
            if added {
                listener.borrow_mut().on_entity_added(self, entity);
            } else {
                listener.borrow_mut().on_entity_removed(self, entity);
            }
        }
        self.notify_depth -= 1;
    }
}
