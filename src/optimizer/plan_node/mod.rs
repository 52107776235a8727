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

//! Defines all kinds of node in the plan tree, each node represents a
//! relational expression.
//!
//! We use an immutable style tree structure: every node is immutable and
//! cannot be modified after it has been created. If you want to modify a
//! node, such as rewriting an expression in a `Project` or changing a node's
//! input, you need to create a new node. We use `Rc` as the node reference
//! and a node just stores its inputs' references, so changing a node only
//! needs one new node, not the entire sub-tree.
//!
//! The set of node kinds is closed: adding a kind means adding a variant to
//! [`PlanNode`] and updating the match arms, not subclassing. A child may
//! also be a [`GroupRef`], an opaque handle into a memo that must be
//! resolved through [`Lookup`](crate::optimizer::lookup::Lookup) before the
//! concrete node can be inspected.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use enum_as_inner::EnumAsInner;

use crate::error::{PlanError, Result};
use crate::optimizer::lookup::Lookup;
use crate::symbol::Symbol;

mod aggregation;
pub use aggregation::{AggCall, AggKind, Aggregation};
mod enforce_single_row;
pub use enforce_single_row::EnforceSingleRow;
mod group_ref;
pub use group_ref::{GroupId, GroupRef};
mod join;
pub use join::{Join, JoinType};
mod lateral_join;
pub use lateral_join::LateralJoin;
mod project;
pub use project::{Assignments, Project};
mod values;
pub use values::Values;

/// Reference to an immutable plan subtree.
pub type PlanRef = Rc<PlanNode>;

/// Unique identifier of a plan node within one planning session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlanNodeId(pub u32);

impl fmt::Display for PlanNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic plan-node-id allocator, owned by a single planning session.
#[derive(Debug, Default)]
pub struct PlanNodeIdAllocator {
    next_id: Cell<u32>,
}

impl PlanNodeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> PlanNodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        PlanNodeId(id)
    }
}

/// `for_all_plan_nodes` includes all plan node kinds. If you add a new plan
/// node, be sure to add it here as well.
///
/// See the implementations below for how it is used.
#[macro_export]
macro_rules! for_all_plan_nodes {
    ($macro:ident $(, $x:tt)*) => {
        $macro! {
            [$($x),*]
            , { LateralJoin }
            , { Aggregation }
            , { Project }
            , { EnforceSingleRow }
            , { Join }
            , { Values }
            , { GroupRef }
        }
    };
}

/// A node of the query plan tree.
///
/// Rules dispatch on the tag of this enum (see
/// [`Pattern`](crate::optimizer::rule::Pattern)); the searcher and the
/// rewriter match on it exhaustively.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum PlanNode {
    LateralJoin(LateralJoin),
    Aggregation(Aggregation),
    Project(Project),
    EnforceSingleRow(EnforceSingleRow),
    Join(Join),
    Values(Values),
    GroupRef(GroupRef),
}

/// impl the `PlanNodeKind` enum and tag accessors for each node.
macro_rules! enum_plan_node_kind {
    ([], $( { $name:ident }),*) => {
        /// Each value represents a [`PlanNode`] variant, used for cheap rule
        /// dispatch and for transparent-kind sets in the searcher.
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
        pub enum PlanNodeKind {
            $( $name ),*
        }

        impl PlanNode {
            pub fn kind(&self) -> PlanNodeKind {
                match self {
                    $( PlanNode::$name(_) => PlanNodeKind::$name ),*
                }
            }

            pub fn id(&self) -> PlanNodeId {
                match self {
                    $( PlanNode::$name(node) => node.id() ),*
                }
            }
        }

        $(impl From<$name> for PlanNode {
            fn from(node: $name) -> Self {
                PlanNode::$name(node)
            }
        })*

        $(impl From<$name> for PlanRef {
            fn from(node: $name) -> Self {
                Rc::new(PlanNode::$name(node))
            }
        })*
    }
}

for_all_plan_nodes! { enum_plan_node_kind }

impl PlanNode {
    /// The direct children of this node, outer/left input first.
    pub fn inputs(&self) -> Vec<PlanRef> {
        match self {
            PlanNode::LateralJoin(node) => vec![node.input().clone(), node.subquery().clone()],
            PlanNode::Aggregation(node) => vec![node.input().clone()],
            PlanNode::Project(node) => vec![node.input().clone()],
            PlanNode::EnforceSingleRow(node) => vec![node.input().clone()],
            PlanNode::Join(node) => vec![node.left().clone(), node.right().clone()],
            PlanNode::Values(_) | PlanNode::GroupRef(_) => vec![],
        }
    }

    /// Clones this node with its children replaced, keeping the node id.
    ///
    /// `inputs` must have the same arity as [`Self::inputs`].
    pub fn clone_with_inputs(&self, inputs: &[PlanRef]) -> PlanNode {
        match self {
            PlanNode::LateralJoin(node) => {
                let [input, subquery] = inputs else {
                    panic!("lateral join expects two inputs, got {}", inputs.len());
                };
                LateralJoin::new(
                    node.id(),
                    input.clone(),
                    subquery.clone(),
                    node.correlation().to_vec(),
                    node.join_type(),
                )
                .into()
            }
            PlanNode::Aggregation(node) => {
                let [input] = inputs else {
                    panic!("aggregation expects one input, got {}", inputs.len());
                };
                Aggregation::new(
                    node.id(),
                    input.clone(),
                    node.group_keys().to_vec(),
                    node.aggregates().to_vec(),
                )
                .into()
            }
            PlanNode::Project(node) => {
                let [input] = inputs else {
                    panic!("project expects one input, got {}", inputs.len());
                };
                Project::new(node.id(), input.clone(), node.assignments().clone()).into()
            }
            PlanNode::EnforceSingleRow(node) => {
                let [input] = inputs else {
                    panic!("enforce single row expects one input, got {}", inputs.len());
                };
                EnforceSingleRow::new(node.id(), input.clone()).into()
            }
            PlanNode::Join(node) => {
                let [left, right] = inputs else {
                    panic!("join expects two inputs, got {}", inputs.len());
                };
                Join::new(
                    node.id(),
                    left.clone(),
                    right.clone(),
                    node.join_type(),
                    node.criteria().to_vec(),
                )
                .into()
            }
            PlanNode::Values(_) | PlanNode::GroupRef(_) => {
                assert!(inputs.is_empty(), "leaf node expects no inputs");
                self.clone()
            }
        }
    }

    /// The symbols this subtree outputs, in relation order.
    ///
    /// `GroupRef` children are resolved through `lookup`; plan trees are
    /// acyclic after resolution, so the recursion terminates.
    pub fn output_symbols(&self, lookup: &dyn Lookup) -> Vec<Symbol> {
        match self {
            PlanNode::LateralJoin(node) => {
                let mut symbols = resolve_output_symbols(node.input(), lookup);
                symbols.extend(resolve_output_symbols(node.subquery(), lookup));
                symbols
            }
            PlanNode::Aggregation(node) => node.output_symbols(),
            PlanNode::Project(node) => node.assignments().output_symbols(),
            PlanNode::EnforceSingleRow(node) => resolve_output_symbols(node.input(), lookup),
            PlanNode::Join(node) => {
                let mut symbols = resolve_output_symbols(node.left(), lookup);
                symbols.extend(resolve_output_symbols(node.right(), lookup));
                symbols
            }
            PlanNode::Values(node) => node.symbols().to_vec(),
            PlanNode::GroupRef(node) => lookup
                .resolve_group(node.group())
                .output_symbols(lookup),
        }
    }

    /// Writes an indented explain tree, one node per line.
    pub fn explain(&self, level: usize, f: &mut impl fmt::Write) -> fmt::Result {
        writeln!(f, "{}{}", " ".repeat(level * 2), self)?;
        for input in self.inputs() {
            input.explain(level + 1, f)?;
        }
        Ok(())
    }

    pub fn explain_to_string(&self) -> String {
        let mut output = String::new();
        self.explain(0, &mut output)
            .expect("writing to a string is infallible");
        output
    }
}

fn resolve_output_symbols(node: &PlanRef, lookup: &dyn Lookup) -> Vec<Symbol> {
    lookup.resolve(node).output_symbols(lookup)
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNode::LateralJoin(node) => node.fmt(f),
            PlanNode::Aggregation(node) => node.fmt(f),
            PlanNode::Project(node) => node.fmt(f),
            PlanNode::EnforceSingleRow(node) => node.fmt(f),
            PlanNode::Join(node) => node.fmt(f),
            PlanNode::Values(node) => node.fmt(f),
            PlanNode::GroupRef(node) => node.fmt(f),
        }
    }
}

/// Verifies that every symbol referenced by a node is produced by its
/// inputs, over the whole subtree.
///
/// Rewrites must never leave dangling references behind; the heuristic
/// driver runs this check on every applied rule in debug builds.
pub fn check_symbol_hygiene(plan: &PlanRef, lookup: &dyn Lookup) -> Result<()> {
    let node = lookup.resolve(plan);
    for input in node.inputs() {
        check_symbol_hygiene(&input, lookup)?;
    }
    match node.as_ref() {
        PlanNode::LateralJoin(lateral) => {
            let outer = resolve_output_symbols(lateral.input(), lookup);
            for symbol in lateral.correlation() {
                if !outer.contains(symbol) {
                    return Err(PlanError::UnresolvedCorrelation {
                        symbol: symbol.clone(),
                        node: lateral.id(),
                    });
                }
            }
        }
        PlanNode::Aggregation(agg) => {
            let input = resolve_output_symbols(agg.input(), lookup);
            for key in agg.group_keys() {
                if !input.contains(key) {
                    return Err(PlanError::UnresolvedGroupingKey {
                        symbol: key.clone(),
                        node: agg.id(),
                    });
                }
            }
            for (_, call) in agg.aggregates() {
                for symbol in call.referenced_symbols() {
                    if !input.contains(&symbol) {
                        return Err(PlanError::DanglingSymbol {
                            symbol,
                            node: agg.id(),
                        });
                    }
                }
            }
        }
        PlanNode::Project(project) => {
            let input = resolve_output_symbols(project.input(), lookup);
            for (_, expr) in project.assignments().iter() {
                for symbol in expr.referenced_symbols() {
                    if !input.contains(&symbol) {
                        return Err(PlanError::DanglingSymbol {
                            symbol,
                            node: project.id(),
                        });
                    }
                }
            }
        }
        PlanNode::Join(join) => {
            let left = resolve_output_symbols(join.left(), lookup);
            let right = resolve_output_symbols(join.right(), lookup);
            for (left_symbol, right_symbol) in join.criteria() {
                if !left.contains(left_symbol) {
                    return Err(PlanError::DanglingSymbol {
                        symbol: left_symbol.clone(),
                        node: join.id(),
                    });
                }
                if !right.contains(right_symbol) {
                    return Err(PlanError::DanglingSymbol {
                        symbol: right_symbol.clone(),
                        node: join.id(),
                    });
                }
            }
        }
        PlanNode::EnforceSingleRow(_) | PlanNode::Values(_) | PlanNode::GroupRef(_) => {}
    }
    Ok(())
}
