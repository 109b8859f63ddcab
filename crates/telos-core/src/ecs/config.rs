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

//! Supervisor construction parameters.

/// Initial capacities for the supervisor's backing storage.
///
/// These are starting sizes, not limits: every buffer grows by doubling
/// when it overflows. Tuning them only avoids early regrowth in worlds
/// whose population is known up front.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Initial capacity of the entity table and id free-list.
    pub entity_capacity: usize,
    /// Initial capacity of each component pool's item and free-list arrays.
    /// Also the floor below which a pool shrink never trims.
    pub pool_capacity: usize,
    /// Initial capacity of each filter's entity list and mirror arrays.
    pub filter_capacity: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 256,
            pool_capacity: 8,
            filter_capacity: 32,
        }
    }
}
