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

//! Error types for the checked lookup variants.
//!
//! Every detected defect in this database is a programming error, not a
//! runtime condition: configuration errors, leak defects and lookup misuse
//! panic in debug builds and are unchecked in release builds. [`EcsError`]
//! exists solely for the opt-in `try_*` lookups, for callers that prefer a
//! `Result` over the unchecked fast path.

use thiserror::Error;

use crate::ecs::Entity;

/// Failure of a checked entity/component lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    /// The entity id does not refer to a currently-live entity.
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    /// The entity does not currently hold a component of the requested type.
    #[error("entity {entity} has no {component} component")]
    MissingComponent {
        /// The entity that was queried.
        entity: Entity,
        /// Name of the requested component type.
        component: &'static str,
    },

    /// The requested component type has never been registered with this
    /// supervisor (no pool exists for it).
    #[error("component type {0} is not registered")]
    UnknownComponentType(&'static str),
}
