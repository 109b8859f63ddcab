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

//! The entity/component database.
//!
//! Four pieces, leaves first:
//!
//! - [`ComponentMask`] — compact set of type indices, used both as a
//!   per-entity membership fingerprint and as a filter's include/exclude
//!   predicate.
//! - [`ComponentPool`] — per-type recycling storage; instances are reused
//!   through a LIFO free-list, never reallocated individually.
//! - [`Filter`] / [`FilterHandle`] — live query result sets, maintained
//!   incrementally as entities mutate, never by rescans.
//! - [`EntitySupervisor`] — the authority that keeps all of the above
//!   consistent, deferring any mutation that arrives while a filter is
//!   being notified or iterated until
//!   [`process_delayed_updates`](EntitySupervisor::process_delayed_updates).
//!
//! The scheduling layer that sequences systems, calls the flush after each
//! step, and runs the one-frame sweep once per cycle is an external
//! collaborator, not part of this crate.

mod command;
mod filter;
mod mask;
mod pool;
mod registry;
mod supervisor;

pub use filter::{Filter, FilterHandle, FilterIter, FilterListener, FilterSpec, SharedListener};
pub use mask::ComponentMask;
pub use pool::{AnyPool, ComponentPool};
pub use registry::{ComponentRegistry, EntityKindRegistry};
pub use supervisor::{EntitySupervisor, SupervisorStats};

pub use telos_core::ecs::{
    Component, EcsError, Entity, EntityKind, KindIndex, SupervisorConfig, TypeIndex,
};

#[cfg(test)]
mod tests;
