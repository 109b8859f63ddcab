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

//! Tagged mutation commands captured while filters are being notified or
//! iterated, replayed FIFO at the supervisor's flush point.

use telos_core::ecs::{Entity, TypeIndex};

/// One deferred mutation.
///
/// There is no add-entity variant: entity creation is always applied
/// immediately, because a freshly created entity has an empty mask and an
/// empty mask can never satisfy a filter (filters require at least one
/// included type), so no in-flight scan can observe the difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingOp {
    /// Set the mask bit and re-evaluate filters for a component whose pool
    /// slot was already allocated at request time.
    AddComponent {
        entity: Entity,
        type_index: TypeIndex,
    },
    /// Clear the mask bit, re-evaluate filters, unlink and recycle.
    RemoveComponent {
        entity: Entity,
        type_index: TypeIndex,
    },
    /// Remove every component, then release the id for reuse.
    RemoveEntity { entity: Entity },
}
