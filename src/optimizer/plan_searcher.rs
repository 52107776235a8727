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

use tracing::trace;

use crate::optimizer::lookup::Lookup;
use crate::optimizer::plan_node::{PlanNode, PlanRef};

/// Bounded depth-first plan search.
///
/// The searcher descends from a root node, resolving memo references at
/// every step. A node matching the `matching` predicate is returned
/// immediately, without descending into it. Descent continues only through
/// nodes accepted by `recurse_only_when`; the first opaque, non-matching
/// node terminates the branch. This deliberately refuses to search through
/// arbitrary structure: callers whitelist the pass-through wrappers they
/// can reason about and nothing else.
///
/// ```ignore
/// PlanNodeSearcher::search_from(subquery, lookup)
///     .matching(|node| node.kind() == PlanNodeKind::Aggregation)
///     .recurse_only_when(|node| {
///         matches!(node.kind(), PlanNodeKind::Project | PlanNodeKind::EnforceSingleRow)
///     })
///     .find_first()
/// ```
pub struct PlanNodeSearcher<'a> {
    root: PlanRef,
    lookup: &'a dyn Lookup,
    matching: Box<dyn Fn(&PlanNode) -> bool + 'a>,
    recurse_only_when: Box<dyn Fn(&PlanNode) -> bool + 'a>,
}

impl<'a> PlanNodeSearcher<'a> {
    pub fn search_from(root: PlanRef, lookup: &'a dyn Lookup) -> Self {
        Self {
            root,
            lookup,
            matching: Box::new(|_| true),
            recurse_only_when: Box::new(|_| false),
        }
    }

    pub fn matching(mut self, predicate: impl Fn(&PlanNode) -> bool + 'a) -> Self {
        self.matching = Box::new(predicate);
        self
    }

    pub fn recurse_only_when(mut self, predicate: impl Fn(&PlanNode) -> bool + 'a) -> Self {
        self.recurse_only_when = Box::new(predicate);
        self
    }

    /// The first matching node along the transparent chain, if any.
    pub fn find_first(&self) -> Option<PlanRef> {
        self.find_first_from(&self.root)
    }

    fn find_first_from(&self, node: &PlanRef) -> Option<PlanRef> {
        let node = self.lookup.resolve(node);
        if (self.matching)(&node) {
            return Some(node);
        }
        if !(self.recurse_only_when)(&node) {
            trace!(node = %node, "search stopped at opaque node");
            return None;
        }
        node.inputs()
            .iter()
            .find_map(|input| self.find_first_from(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Datum;
    use crate::optimizer::lookup::NoLookup;
    use crate::optimizer::plan_node::{
        AggCall, Aggregation, Assignments, EnforceSingleRow, Join, JoinType, PlanNodeIdAllocator,
        PlanNodeKind, Project, Values,
    };
    use crate::symbol::Symbol;

    fn find_aggregation(root: PlanRef) -> Option<PlanRef> {
        PlanNodeSearcher::search_from(root, &NoLookup)
            .matching(|node| node.kind() == PlanNodeKind::Aggregation)
            .recurse_only_when(|node| {
                matches!(
                    node.kind(),
                    PlanNodeKind::Project | PlanNodeKind::EnforceSingleRow
                )
            })
            .find_first()
    }

    fn scalar_agg(ids: &PlanNodeIdAllocator) -> PlanRef {
        let source = Values::new(
            ids.next(),
            vec![Symbol::new("x")],
            vec![vec![Datum::Int64(1)]],
        )
        .into_ref();
        Aggregation::new(
            ids.next(),
            source,
            vec![],
            vec![(Symbol::new("c"), AggCall::count_star())],
        )
        .into()
    }

    #[test]
    fn test_finds_through_transparent_wrappers() {
        let ids = PlanNodeIdAllocator::new();
        let agg = scalar_agg(&ids);
        let wrapped: PlanRef = Project::new(
            ids.next(),
            EnforceSingleRow::new(ids.next(), agg.clone()).into(),
            Assignments::identity([Symbol::new("c")]),
        )
        .into();

        let found = find_aggregation(wrapped).expect("aggregation is reachable");
        assert_eq!(found, agg);
    }

    #[test]
    fn test_match_wins_without_descending() {
        let ids = PlanNodeIdAllocator::new();
        let inner = scalar_agg(&ids);
        let outer: PlanRef = Aggregation::new(
            ids.next(),
            inner,
            vec![],
            vec![(Symbol::new("c2"), AggCall::count_star())],
        )
        .into();

        // The outer aggregation matches first; the search never reaches the
        // inner one.
        let found = find_aggregation(outer.clone()).expect("outer aggregation matches");
        assert_eq!(found, outer);
    }

    #[test]
    fn test_stops_at_opaque_node() {
        let ids = PlanNodeIdAllocator::new();
        let agg = scalar_agg(&ids);
        let other_side = Values::new(
            ids.next(),
            vec![Symbol::new("y")],
            vec![vec![Datum::Int64(2)]],
        )
        .into_ref();
        // A join is not a transparent kind, so the aggregation beneath it is
        // out of reach.
        let join: PlanRef =
            Join::new(ids.next(), other_side, agg, JoinType::Inner, vec![]).into();

        assert!(find_aggregation(join).is_none());
    }
}
