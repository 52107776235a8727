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

//! Memo-aware node resolution.
//!
//! Rules never inspect a [`GroupRef`] directly; they resolve children
//! through a [`Lookup`] so that the same rule code runs over plain trees
//! and over memoized plans alike.

use std::collections::HashMap;

use crate::optimizer::plan_node::{
    GroupId, GroupRef, PlanNode, PlanNodeIdAllocator, PlanRef,
};

/// Resolves an indirection reference to its current concrete node.
///
/// Resolution is pure and idempotent: resolving an already-concrete node
/// returns it unchanged, and resolving the same reference twice yields the
/// same node. Implementations must never mutate the referenced node.
pub trait Lookup {
    /// Resolves a memo group to its current representative node.
    fn resolve_group(&self, group: GroupId) -> PlanRef;

    /// Resolves `node` if it is a [`GroupRef`], otherwise returns it as is.
    fn resolve(&self, node: &PlanRef) -> PlanRef {
        match node.as_ref() {
            PlanNode::GroupRef(group_ref) => self.resolve_group(group_ref.group()),
            _ => node.clone(),
        }
    }
}

/// The identity lookup for plans that carry no memo references.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLookup;

impl Lookup for NoLookup {
    fn resolve_group(&self, group: GroupId) -> PlanRef {
        // A group handle outside its memo is a broken plan, not a
        // recoverable condition.
        panic!("group reference {} escaped its memo", group);
    }
}

/// An arena of memoized subtrees addressed by [`GroupId`].
#[derive(Debug, Default)]
pub struct Memo {
    groups: HashMap<GroupId, PlanRef>,
    next_group: u32,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `node` in a fresh group and returns the [`GroupRef`] node
    /// standing in for it.
    pub fn intern(&mut self, node: PlanRef, ids: &PlanNodeIdAllocator) -> PlanRef {
        let group = GroupId(self.next_group);
        self.next_group += 1;
        self.groups.insert(group, node);
        GroupRef::new(ids.next(), group).into()
    }
}

impl Lookup for Memo {
    fn resolve_group(&self, group: GroupId) -> PlanRef {
        self.groups
            .get(&group)
            .unwrap_or_else(|| panic!("unknown memo group {}", group))
            .clone()
    }
}
