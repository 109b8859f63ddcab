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

//! # Telos Core
//!
//! Foundational crate containing the contracts of the entity/component
//! database: entity identifiers, the [`Component`](ecs::Component) trait and
//! its per-type traits, entity kind tags, supervisor configuration, and
//! error types. The implementation lives in `telos-data`.

#![warn(missing_docs)]

pub mod ecs;
