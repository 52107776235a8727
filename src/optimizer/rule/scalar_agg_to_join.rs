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

use super::{Pattern, Rule, RuleContext};
use crate::error::Result;
use crate::optimizer::cardinality::is_scalar;
use crate::optimizer::lookup::Lookup;
use crate::optimizer::plan_node::{PlanNode, PlanNodeKind, PlanRef};
use crate::optimizer::plan_rewriter::ScalarAggRewriter;
use crate::optimizer::plan_searcher::PlanNodeSearcher;

/// Transforms a correlated lateral join over a scalar, ungrouped
/// aggregation into a plain left join.
///
/// Fires on [`LateralJoin`](crate::optimizer::plan_node::LateralJoin)
/// nodes only. Uncorrelated subqueries, non-scalar subqueries and grouped
/// aggregates are all handled by other rules and reported not applicable
/// here. A rewrite that leaves a lateral join on top made no progress and
/// is also reported not applicable, so the engine never re-fires this rule
/// on an unchanged shape.
pub struct ScalarAggToJoinRule {}

impl Rule for ScalarAggToJoinRule {
    fn pattern(&self) -> Pattern {
        Pattern::node(PlanNodeKind::LateralJoin)
    }

    fn apply(&self, node: &PlanRef, ctx: &RuleContext<'_>) -> Result<Option<PlanRef>> {
        let Some(lateral) = node.as_lateral_join() else {
            return Ok(None);
        };
        let subquery = ctx.lookup.resolve(lateral.subquery());

        if lateral.correlation().is_empty() || !is_scalar(&subquery, ctx.lookup) {
            return Ok(None);
        }

        let Some(found) = find_aggregation(subquery, ctx.lookup) else {
            return Ok(None);
        };
        let PlanNode::Aggregation(aggregation) = found.as_ref() else {
            unreachable!("searcher only matches aggregation nodes");
        };
        if !aggregation.group_keys().is_empty() {
            return Ok(None);
        }

        let rewriter = ScalarAggRewriter::new(ctx.lookup, ctx.ids, ctx.symbols);
        let rewritten = rewriter.rewrite_scalar_aggregation(lateral, aggregation)?;

        if rewritten.as_lateral_join().is_some() {
            return Ok(None);
        }
        Ok(Some(rewritten))
    }
}

impl ScalarAggToJoinRule {
    pub fn create() -> super::BoxedRule {
        Box::new(ScalarAggToJoinRule {})
    }
}

fn find_aggregation(root: PlanRef, lookup: &dyn Lookup) -> Option<PlanRef> {
    PlanNodeSearcher::search_from(root, lookup)
        .matching(|node| node.kind() == PlanNodeKind::Aggregation)
        .recurse_only_when(|node| {
            matches!(
                node.kind(),
                PlanNodeKind::Project | PlanNodeKind::EnforceSingleRow
            )
        })
        .find_first()
}
