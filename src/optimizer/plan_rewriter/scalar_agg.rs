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

use tracing::debug;

use crate::error::{PlanError, Result};
use crate::expr::{Datum, Expr};
use crate::optimizer::lookup::Lookup;
use crate::optimizer::plan_node::{
    Aggregation, Assignments, Join, JoinType, LateralJoin, PlanNode, PlanNodeIdAllocator, PlanRef,
    Project,
};
use crate::symbol::{Symbol, SymbolAllocator};

/// Decorrelates a lateral join over a scalar, ungrouped aggregation into a
/// plain left join.
///
/// The correlated per-outer-row aggregate
///
/// ```text
/// LateralJoin { correlation: [k] }
///   outer
///   Aggregation { group_keys: [], aggregates: [c := count(*), s := sum(x)] }
///     source            -- surfaces k per row
/// ```
///
/// becomes
///
/// ```text
/// Project { exprs: [.., c := coalesce(c', 0), s := s'] }
///   Join { type: Left, on: [k = k'] }
///     outer
///     Aggregation { group_keys: [k'], aggregates: [c' := count(*), s' := sum(x)] }
///       Project { exprs: [k' := k, x := x] }
///         source
/// ```
///
/// Grouping by the correlation symbols yields one aggregate row per
/// distinct outer-row identity present in the source; the left join keeps
/// outer rows with no matching group and the topmost projection splices in
/// each aggregate's default-on-empty-group value for them. Only counting
/// aggregates default to zero; everything else stays NULL.
pub struct ScalarAggRewriter<'a> {
    lookup: &'a dyn Lookup,
    ids: &'a PlanNodeIdAllocator,
    symbols: &'a SymbolAllocator,
}

/// A transparent wrapper found between the lateral join and its target
/// aggregation, to be re-applied on top of the rewritten join.
enum Wrapper {
    Project(Project),
    SingleRow,
}

impl<'a> ScalarAggRewriter<'a> {
    pub fn new(
        lookup: &'a dyn Lookup,
        ids: &'a PlanNodeIdAllocator,
        symbols: &'a SymbolAllocator,
    ) -> Self {
        Self {
            lookup,
            ids,
            symbols,
        }
    }

    /// Rewrites the lateral join, or returns it unchanged when the
    /// correlation cannot be eliminated ("no progress"). Callers must treat
    /// a returned lateral join as a failed rewrite attempt, not success.
    ///
    /// `aggregation` must be reachable from `lateral.subquery()` through
    /// transparent wrappers only and must have no grouping keys; the rule
    /// establishes both before calling in here.
    pub fn rewrite_scalar_aggregation(
        &self,
        lateral: &LateralJoin,
        aggregation: &Aggregation,
    ) -> Result<PlanRef> {
        let no_progress = || -> PlanRef { lateral.clone().into() };

        let outer_outputs = self.output_symbols(lateral.input());
        for symbol in lateral.correlation() {
            if !outer_outputs.contains(symbol) {
                return Err(PlanError::UnresolvedCorrelation {
                    symbol: symbol.clone(),
                    node: lateral.id(),
                });
            }
        }

        let source = self.lookup.resolve(aggregation.input());
        let source_outputs = source.output_symbols(self.lookup);
        for key in aggregation.group_keys() {
            if !source_outputs.contains(key) {
                return Err(PlanError::UnresolvedGroupingKey {
                    symbol: key.clone(),
                    node: aggregation.id(),
                });
            }
        }

        // Grouping by the correlation only works if the source actually
        // surfaces every correlation symbol; a correlated reference the
        // join predicate cannot satisfy means the correlation survives the
        // rewrite, so give up before touching anything.
        if lateral
            .correlation()
            .iter()
            .any(|symbol| !source_outputs.contains(symbol))
        {
            debug!(
                lateral = %lateral.id(),
                "correlation not satisfiable from the aggregation source, no progress"
            );
            return Ok(no_progress());
        }

        let Some(wrappers) = self.collect_wrappers(lateral.subquery(), aggregation) else {
            return Ok(no_progress());
        };

        // Rename the correlation symbols on the subquery side so the join
        // below never emits the same symbol from both inputs.
        let rename: Vec<(Symbol, Symbol)> = lateral
            .correlation()
            .iter()
            .map(|symbol| (symbol.clone(), self.symbols.new_symbol(symbol.name())))
            .collect();
        let renamed = |symbol: &Symbol| -> Symbol {
            rename
                .iter()
                .find(|(old, _)| old == symbol)
                .map(|(_, new)| new.clone())
                .unwrap_or_else(|| symbol.clone())
        };

        let mut source_assignments = Assignments::new();
        for symbol in &source_outputs {
            source_assignments.put(renamed(symbol), Expr::symbol(symbol.clone()));
        }
        let renamed_source: PlanRef =
            Project::new(self.ids.next(), source.clone(), source_assignments).into();

        // Regroup: one aggregate row per distinct correlation-symbol
        // combination instead of one global row.
        let group_keys: Vec<Symbol> = rename.iter().map(|(_, new)| new.clone()).collect();
        let mut rewritten_outputs = Vec::with_capacity(aggregation.aggregates().len());
        let aggregates = aggregation
            .aggregates()
            .iter()
            .map(|(output, call)| {
                let fresh = self.symbols.new_symbol(output.name());
                rewritten_outputs.push((output.clone(), call.kind().clone(), fresh.clone()));
                (fresh, call.map_symbols(renamed))
            })
            .collect();
        let regrouped: PlanRef = Aggregation::new(
            self.ids.next(),
            renamed_source,
            group_keys.clone(),
            aggregates,
        )
        .into();

        // The regrouped aggregation emits at most one row per key
        // combination and the join matches each outer row against one key
        // combination, so any single-row contract from the original subtree
        // holds per outer row exactly when the join covers every group key.
        // The criteria are the rename pairs, so coverage holds by
        // construction; the guard stays explicit so a change that breaks it
        // degrades to "no progress" instead of dropping a runtime check.
        let criteria = rename;
        let has_single_row = wrappers
            .iter()
            .any(|wrapper| matches!(wrapper, Wrapper::SingleRow));
        if has_single_row && !single_row_provable(&group_keys, &criteria) {
            return Ok(no_progress());
        }

        let join: PlanRef = Join::new(
            self.ids.next(),
            lateral.input().clone(),
            regrouped,
            JoinType::Left,
            criteria,
        )
        .into();

        // Restore the original aggregate output symbols, splicing in the
        // per-function default for outer rows with no matching group.
        let mut restore = Assignments::identity(outer_outputs.iter().cloned());
        for (original, kind, fresh) in rewritten_outputs {
            let expr = match kind.default_on_empty_group() {
                Datum::Null => Expr::symbol(fresh),
                default => Expr::Coalesce(vec![Expr::symbol(fresh), Expr::literal(default)]),
            };
            restore.put(original, expr);
        }
        let mut rebuilt: PlanRef = Project::new(self.ids.next(), join, restore).into();

        // Re-apply the wrappers bottom-up. Their expressions reference the
        // aggregation's original output symbols, which the restoring
        // projection re-establishes, so they carry over unchanged; the
        // outer columns are prepended to keep the join output visible.
        for wrapper in wrappers.iter().rev() {
            rebuilt = match wrapper {
                Wrapper::Project(project) => {
                    let mut assignments = Assignments::identity(outer_outputs.iter().cloned());
                    for (symbol, expr) in project.assignments().iter() {
                        assignments.put(symbol.clone(), expr.clone());
                    }
                    Project::new(self.ids.next(), rebuilt, assignments).into()
                }
                // Proven single-row per outer row above.
                Wrapper::SingleRow => rebuilt,
            };
        }

        debug!(
            lateral = %lateral.id(),
            aggregation = %aggregation.id(),
            "decorrelated scalar aggregation into a left join"
        );
        Ok(rebuilt)
    }

    /// The transparent wrappers between the subquery root and the target
    /// aggregation, top-down. `None` if the chain is broken, which means
    /// the aggregation is not actually reachable.
    fn collect_wrappers(&self, subquery: &PlanRef, aggregation: &Aggregation) -> Option<Vec<Wrapper>> {
        let mut wrappers = vec![];
        let mut node = self.lookup.resolve(subquery);
        loop {
            if node.id() == aggregation.id() {
                return Some(wrappers);
            }
            node = match node.as_ref() {
                PlanNode::Project(project) => {
                    wrappers.push(Wrapper::Project(project.clone()));
                    self.lookup.resolve(project.input())
                }
                PlanNode::EnforceSingleRow(single_row) => {
                    wrappers.push(Wrapper::SingleRow);
                    self.lookup.resolve(single_row.input())
                }
                _ => return None,
            };
        }
    }

    fn output_symbols(&self, node: &PlanRef) -> Vec<Symbol> {
        self.lookup.resolve(node).output_symbols(self.lookup)
    }
}

fn single_row_provable(group_keys: &[Symbol], criteria: &[(Symbol, Symbol)]) -> bool {
    group_keys
        .iter()
        .all(|key| criteria.iter().any(|(_, right)| right == key))
}
