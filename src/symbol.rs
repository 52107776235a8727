// Copyright 2026 Planner Core Contributors
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

use std::cell::Cell;
use std::fmt;

/// An opaque column name, unique within one plan.
///
/// Symbols produced by the allocator are never reused, so two nodes emitting
/// the same symbol are by construction talking about the same value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(String);

impl Symbol {
    /// A symbol with an exact name, for plan construction sites (binder,
    /// tests) that own the namespace themselves.
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic symbol allocator, owned by a single planning session.
///
/// Uses a `Cell` so that rules can allocate through a shared reference; the
/// planning pass is single-threaded by contract.
#[derive(Debug, Default)]
pub struct SymbolAllocator {
    next_id: Cell<u32>,
}

impl SymbolAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh symbol named after `hint`.
    pub fn new_symbol(&self, hint: &str) -> Symbol {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Symbol(format!("{}_{}", hint, id))
    }
}
