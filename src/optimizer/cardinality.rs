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

use crate::optimizer::lookup::Lookup;
use crate::optimizer::plan_node::{PlanNode, PlanRef};

/// Returns `true` iff every execution of the subtree is guaranteed to
/// produce at most one row.
///
/// Structural, not statistical: the answer is derived from node shapes
/// alone, and anything unrecognized is conservatively not scalar.
pub fn is_scalar(node: &PlanRef, lookup: &dyn Lookup) -> bool {
    let node = lookup.resolve(node);
    match node.as_ref() {
        // One row per group, and there is exactly one (global) group.
        PlanNode::Aggregation(agg) => agg.group_keys().is_empty(),
        // Scalar by construction: more than one row fails the query.
        PlanNode::EnforceSingleRow(_) => true,
        // Row-preserving wrapper over a scalar input.
        PlanNode::Project(project) => is_scalar(project.input(), lookup),
        PlanNode::Values(values) => values.rows().len() <= 1,
        PlanNode::LateralJoin(_) | PlanNode::Join(_) => false,
        // `resolve` above already unwrapped any group reference.
        PlanNode::GroupRef(_) => unreachable!("group reference survived resolution"),
    }
}
