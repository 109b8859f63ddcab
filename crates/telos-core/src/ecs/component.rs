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

//! The [`Component`] trait and the per-type traits fixed at registration.

/// A type that can be attached to an entity and stored in a per-type pool.
///
/// The associated constants are the type's static traits; they are read once
/// when the type's pool is created and never re-evaluated:
///
/// - [`IGNORE_IN_FILTER`](Self::IGNORE_IN_FILTER) — the type participates in
///   filter matching but is never mirrored into a filter's direct-access
///   arrays.
/// - [`ONE_FRAME`](Self::ONE_FRAME) — instances are stripped from every
///   entity by the supervisor's one-frame sweep, once per scheduling cycle.
/// - [`AUTO_RESET`](Self::AUTO_RESET) — recycling a pooled instance invokes
///   [`reset`](Self::reset) instead of leaving stale field values behind.
///
/// Pooled instances are reused, never reallocated individually: a recycled
/// slot handed back out may hold whatever the previous owner left in it
/// unless the type opts into `AUTO_RESET`. Types holding owned references
/// (`Option<Rc<_>>`, boxed resources, ...) must clear them before release;
/// debug builds verify this through [`leaked_reference`](Self::leaked_reference).
pub trait Component: 'static {
    /// Participate in matching but never mirror instances into filters.
    const IGNORE_IN_FILTER: bool = false;

    /// Automatically removed from all entities once per scheduling cycle.
    const ONE_FRAME: bool = false;

    /// Invoke [`reset`](Self::reset) whenever an instance is recycled.
    const AUTO_RESET: bool = false;

    /// Reset hook for `AUTO_RESET` types. The post-reset state is the
    /// type's own invariant; the default does nothing.
    fn reset(&mut self) {}

    /// Reports a reference-bearing field that still holds a value, by name.
    ///
    /// Called on recycle in debug builds only; returning `Some` is a
    /// retained-reference defect and aborts with a diagnostic. Fields a type
    /// intentionally keeps across recycles are simply not reported. The
    /// default reports nothing.
    fn leaked_reference(&self) -> Option<&'static str> {
        None
    }
}
