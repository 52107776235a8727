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

//! Define all [`Rule`]s.

use crate::error::Result;
use crate::optimizer::lookup::Lookup;
use crate::optimizer::plan_node::{PlanNode, PlanNodeIdAllocator, PlanNodeKind, PlanRef};
use crate::session::Session;
use crate::symbol::SymbolAllocator;

/// The node tag a rule may fire on, letting the engine skip rules without
/// invoking [`Rule::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    kind: PlanNodeKind,
}

impl Pattern {
    pub fn node(kind: PlanNodeKind) -> Self {
        Self { kind }
    }

    pub fn matches(&self, node: &PlanNode) -> bool {
        node.kind() == self.kind
    }
}

/// Capabilities available to a rule application, all scoped to one
/// planning session.
///
/// The allocators are the only mutable state a rule may touch, and only on
/// the path that returns a rewritten node; a "not applicable" verdict must
/// leave them untouched so the engine can re-test rules freely.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub lookup: &'a dyn Lookup,
    pub ids: &'a PlanNodeIdAllocator,
    pub symbols: &'a SymbolAllocator,
    pub session: &'a Session,
}

/// A one-to-one transform of a plan node.
///
/// `Ok(None)` means the rule is not applicable to this node: the expected,
/// frequent outcome, recovered locally and never an error. `Ok(Some(..))`
/// replaces the node with the rewritten subtree. `Err(..)` is an invariant
/// violation that aborts the whole planning pass.
///
/// Rules are pure functions of their input plus the context: testing a rule
/// repeatedly on unchanged input must always return the same verdict.
pub trait Rule: Description {
    fn pattern(&self) -> Pattern;

    fn apply(&self, node: &PlanRef, ctx: &RuleContext<'_>) -> Result<Option<PlanRef>>;
}

pub trait Description {
    fn description(&self) -> &str;
}

pub type BoxedRule = Box<dyn Rule>;

mod scalar_agg_to_join;
pub use scalar_agg_to_join::*;

#[macro_export]
macro_rules! for_all_rules {
    ($macro:ident $(, $x:tt)*) => {
        $macro! {
            [$($x),*]
            ,{ScalarAggToJoinRule}
        }
    };
}

macro_rules! impl_description {
    ([], $( { $name:ident }),*) => {
        paste::paste!{
            $(impl Description for [<$name>] {
                fn description(&self) -> &str {
                    stringify!([<$name>])
                }
            })*
        }
    }
}

for_all_rules! {impl_description}
