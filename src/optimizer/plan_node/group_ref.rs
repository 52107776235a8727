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

use std::fmt;

use super::PlanNodeId;

/// Identifier of a memo group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Opaque handle standing in for a memoized subtree.
///
/// A `GroupRef` carries no structure of its own; it must be resolved
/// through a [`Lookup`](crate::optimizer::lookup::Lookup) before the
/// concrete node can be inspected. Rules that resolve their inputs never
/// observe one.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRef {
    id: PlanNodeId,
    group: GroupId,
}

impl GroupRef {
    pub fn new(id: PlanNodeId, group: GroupId) -> Self {
        Self { id, group }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn group(&self) -> GroupId {
        self.group
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupRef {{ group: {} }}", self.group)
    }
}
