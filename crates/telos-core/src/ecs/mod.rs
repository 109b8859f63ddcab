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

//! Core types and contracts shared by the entity/component database.

mod component;
mod config;
mod entity;
mod error;

pub use component::Component;
pub use config::SupervisorConfig;
pub use entity::{Entity, EntityKind};
pub use error::EcsError;

/// Index of a registered component type, assigned monotonically by the
/// supervisor's registry the first time a type's pool is created.
pub type TypeIndex = u32;

/// Index of a registered entity kind, assigned monotonically on first use.
pub type KindIndex = u32;
