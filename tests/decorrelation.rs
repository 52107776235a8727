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

//! End-to-end tests for scalar-aggregation decorrelation.
//!
//! The suite executes plans with a small row-at-a-time interpreter so the
//! pre-rewrite (correlated) and post-rewrite (join-based) plans can be
//! compared on actual rows, including the execution-time failure of
//! `EnforceSingleRow`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use planner_core::error::PlanError;
use planner_core::expr::{Datum, Expr};
use planner_core::optimizer::cardinality::is_scalar;
use planner_core::optimizer::heuristic::{ApplyOrder, HeuristicOptimizer};
use planner_core::optimizer::lookup::{Lookup, Memo, NoLookup};
use planner_core::optimizer::plan_node::{
    check_symbol_hygiene, AggCall, AggKind, Aggregation, Assignments, EnforceSingleRow, Join,
    JoinType, LateralJoin, PlanNode, PlanNodeIdAllocator, Project, Values,
};
use planner_core::optimizer::rule::{Rule, RuleContext, ScalarAggToJoinRule};
use planner_core::session::Session;
use planner_core::symbol::{Symbol, SymbolAllocator};
use planner_core::PlanRef;
use pretty_assertions::assert_eq;

// ---------------------------------------------------------------------
// A minimal interpreter over the plan tree.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Relation {
    columns: Vec<Symbol>,
    rows: Vec<Vec<Datum>>,
}

#[derive(Debug, PartialEq)]
enum ExecError {
    /// The `EnforceSingleRow` contract was violated at execution time.
    MoreThanOneRow,
}

fn execute(plan: &PlanRef, lookup: &dyn Lookup) -> Result<Relation, ExecError> {
    exec(plan, lookup, &HashMap::new())
}

/// `bindings` carries the current outer row of any enclosing lateral join:
/// a leaf relation that surfaces a bound symbol only produces the rows
/// matching the binding, which is how the correlated predicate of the
/// original plan is modeled.
fn exec(
    plan: &PlanRef,
    lookup: &dyn Lookup,
    bindings: &HashMap<Symbol, Datum>,
) -> Result<Relation, ExecError> {
    let node = lookup.resolve(plan);
    match node.as_ref() {
        PlanNode::Values(values) => {
            let columns = values.symbols().to_vec();
            let rows = values
                .rows()
                .iter()
                .filter(|row| {
                    columns.iter().zip(row.iter()).all(|(column, datum)| {
                        bindings.get(column).is_none_or(|bound| bound == datum)
                    })
                })
                .cloned()
                .collect();
            Ok(Relation { columns, rows })
        }
        PlanNode::Project(project) => {
            let input = exec(project.input(), lookup, bindings)?;
            let columns = project.assignments().output_symbols();
            let rows = input
                .rows
                .iter()
                .map(|row| {
                    let env = row_env(&input.columns, row);
                    project
                        .assignments()
                        .iter()
                        .map(|(_, expr)| eval(expr, &env))
                        .collect()
                })
                .collect();
            Ok(Relation { columns, rows })
        }
        PlanNode::EnforceSingleRow(single_row) => {
            let input = exec(single_row.input(), lookup, bindings)?;
            match input.rows.len() {
                0 => Ok(Relation {
                    rows: vec![vec![Datum::Null; input.columns.len()]],
                    ..input
                }),
                1 => Ok(input),
                _ => Err(ExecError::MoreThanOneRow),
            }
        }
        PlanNode::Aggregation(agg) => {
            let input = exec(agg.input(), lookup, bindings)?;
            let key_indices: Vec<usize> = agg
                .group_keys()
                .iter()
                .map(|key| column_index(&input.columns, key))
                .collect();

            let mut groups: BTreeMap<Vec<Datum>, Vec<Vec<Datum>>> = BTreeMap::new();
            if agg.group_keys().is_empty() {
                // A global aggregate has exactly one group, input or not.
                groups.insert(vec![], vec![]);
            }
            for row in &input.rows {
                let key: Vec<Datum> = key_indices.iter().map(|i| row[*i].clone()).collect();
                groups.entry(key).or_default().push(row.clone());
            }

            let columns = agg.output_symbols();
            let rows = groups
                .into_iter()
                .map(|(key, group_rows)| {
                    let mut row = key;
                    for (_, call) in agg.aggregates() {
                        row.push(eval_agg(call, &group_rows, &input.columns));
                    }
                    row
                })
                .collect();
            Ok(Relation { columns, rows })
        }
        PlanNode::Join(join) => {
            let left = exec(join.left(), lookup, bindings)?;
            let right = exec(join.right(), lookup, bindings)?;
            let mut columns = left.columns.clone();
            columns.extend(right.columns.clone());

            let mut rows = vec![];
            for left_row in &left.rows {
                let mut matched = false;
                for right_row in &right.rows {
                    let matches = join.criteria().iter().all(|(l, r)| {
                        let lv = &left_row[column_index(&left.columns, l)];
                        let rv = &right_row[column_index(&right.columns, r)];
                        // SQL equality: null never matches.
                        *lv != Datum::Null && lv == rv
                    });
                    if matches {
                        matched = true;
                        let mut row = left_row.clone();
                        row.extend(right_row.clone());
                        rows.push(row);
                    }
                }
                if !matched && join.join_type() == JoinType::Left {
                    let mut row = left_row.clone();
                    row.extend(vec![Datum::Null; right.columns.len()]);
                    rows.push(row);
                }
            }
            Ok(Relation { columns, rows })
        }
        PlanNode::LateralJoin(lateral) => {
            let outer = exec(lateral.input(), lookup, bindings)?;
            let subquery_columns = lookup
                .resolve(lateral.subquery())
                .output_symbols(lookup);
            let mut columns = outer.columns.clone();
            columns.extend(subquery_columns.clone());

            let mut rows = vec![];
            for outer_row in &outer.rows {
                let mut inner_bindings = bindings.clone();
                for symbol in lateral.correlation() {
                    let index = column_index(&outer.columns, symbol);
                    inner_bindings.insert(symbol.clone(), outer_row[index].clone());
                }
                let subquery = exec(lateral.subquery(), lookup, &inner_bindings)?;
                if subquery.rows.is_empty() && lateral.join_type() == JoinType::Left {
                    let mut row = outer_row.clone();
                    row.extend(vec![Datum::Null; subquery_columns.len()]);
                    rows.push(row);
                }
                for subquery_row in subquery.rows {
                    let mut row = outer_row.clone();
                    row.extend(subquery_row);
                    rows.push(row);
                }
            }
            Ok(Relation { columns, rows })
        }
        PlanNode::GroupRef(_) => unreachable!("group reference survived resolution"),
    }
}

fn column_index(columns: &[Symbol], symbol: &Symbol) -> usize {
    columns
        .iter()
        .position(|column| column == symbol)
        .unwrap_or_else(|| panic!("column {} not found", symbol))
}

fn row_env(columns: &[Symbol], row: &[Datum]) -> HashMap<Symbol, Datum> {
    columns.iter().cloned().zip(row.iter().cloned()).collect()
}

fn eval(expr: &Expr, env: &HashMap<Symbol, Datum>) -> Datum {
    match expr {
        Expr::SymbolRef(symbol) => env[symbol].clone(),
        Expr::Literal(datum) => datum.clone(),
        Expr::Coalesce(args) => args
            .iter()
            .map(|arg| eval(arg, env))
            .find(|datum| *datum != Datum::Null)
            .unwrap_or(Datum::Null),
    }
}

fn eval_agg(call: &AggCall, rows: &[Vec<Datum>], columns: &[Symbol]) -> Datum {
    let rows: Vec<&Vec<Datum>> = rows
        .iter()
        .filter(|row| match call.mask() {
            Some(mask) => row[column_index(columns, mask)] == Datum::Bool(true),
            None => true,
        })
        .collect();

    let input_values = || -> Vec<Datum> {
        let index = column_index(columns, &call.inputs()[0]);
        let values = rows
            .iter()
            .map(|row| row[index].clone())
            .filter(|datum| *datum != Datum::Null);
        if call.is_distinct() {
            values.collect::<BTreeSet<_>>().into_iter().collect()
        } else {
            values.collect()
        }
    };

    match call.kind() {
        AggKind::Count => {
            if call.inputs().is_empty() {
                Datum::Int64(rows.len() as i64)
            } else {
                Datum::Int64(input_values().len() as i64)
            }
        }
        AggKind::Sum => {
            let values = input_values();
            if values.is_empty() {
                Datum::Null
            } else {
                Datum::Int64(
                    values
                        .iter()
                        .map(|datum| *datum.as_int64().expect("sum over int64 columns"))
                        .sum(),
                )
            }
        }
        AggKind::Min => input_values().into_iter().min().unwrap_or(Datum::Null),
        AggKind::Max => input_values().into_iter().max().unwrap_or(Datum::Null),
        kind => unimplemented!("interpreter does not evaluate {}", kind),
    }
}

// ---------------------------------------------------------------------
// Plan builders.
// ---------------------------------------------------------------------

struct TestContext {
    ids: PlanNodeIdAllocator,
    symbols: SymbolAllocator,
    session: Session,
}

impl TestContext {
    fn new() -> Self {
        Self {
            ids: PlanNodeIdAllocator::new(),
            symbols: SymbolAllocator::new(),
            session: Session::new(),
        }
    }

    fn rule_ctx<'a>(&'a self, lookup: &'a dyn Lookup) -> RuleContext<'a> {
        RuleContext {
            lookup,
            ids: &self.ids,
            symbols: &self.symbols,
            session: &self.session,
        }
    }

    fn outer(&self, keys: &[i64]) -> PlanRef {
        Values::new(
            self.ids.next(),
            vec![Symbol::new("k")],
            keys.iter().map(|k| vec![Datum::Int64(*k)]).collect(),
        )
        .into_ref()
    }

    /// A correlated source over columns `(k, x)`.
    fn source(&self, rows: &[(i64, i64)]) -> PlanRef {
        Values::new(
            self.ids.next(),
            vec![Symbol::new("k"), Symbol::new("x")],
            rows.iter()
                .map(|(k, x)| vec![Datum::Int64(*k), Datum::Int64(*x)])
                .collect(),
        )
        .into_ref()
    }

    fn count_sum_agg(&self, input: PlanRef) -> PlanRef {
        Aggregation::new(
            self.ids.next(),
            input,
            vec![],
            vec![
                (Symbol::new("c"), AggCall::count_star()),
                (
                    Symbol::new("s"),
                    AggCall::new(AggKind::Sum, vec![Symbol::new("x")]),
                ),
            ],
        )
        .into()
    }

    fn lateral(&self, outer: PlanRef, subquery: PlanRef) -> PlanRef {
        LateralJoin::new(
            self.ids.next(),
            outer,
            subquery,
            vec![Symbol::new("k")],
            JoinType::Inner,
        )
        .into()
    }
}

fn apply_rule(ctx: &TestContext, lookup: &dyn Lookup, plan: &PlanRef) -> Option<PlanRef> {
    ScalarAggToJoinRule {}
        .apply(plan, &ctx.rule_ctx(lookup))
        .expect("no invariant violation expected")
}

// ---------------------------------------------------------------------
// Rewrite behavior.
// ---------------------------------------------------------------------

#[test]
fn test_count_and_sum_defaults_per_outer_row() {
    let ctx = TestContext::new();
    // Key 1 has no matching subquery rows, key 2 has one, key 3 has two.
    let source = ctx.source(&[(2, 10), (3, 20), (3, 30)]);
    let plan = ctx.lateral(ctx.outer(&[1, 2, 3]), ctx.count_sum_agg(source));

    let rewritten = apply_rule(&ctx, &NoLookup, &plan).expect("rule applies");
    assert!(rewritten.as_lateral_join().is_none());
    check_symbol_hygiene(&rewritten, &NoLookup).expect("no dangling symbols");

    let expected = Relation {
        columns: vec![Symbol::new("k"), Symbol::new("c"), Symbol::new("s")],
        rows: vec![
            vec![Datum::Int64(1), Datum::Int64(0), Datum::Null],
            vec![Datum::Int64(2), Datum::Int64(1), Datum::Int64(10)],
            vec![Datum::Int64(3), Datum::Int64(2), Datum::Int64(50)],
        ],
    };
    assert_eq!(execute(&plan, &NoLookup).unwrap(), expected);
    assert_eq!(execute(&rewritten, &NoLookup).unwrap(), expected);
}

#[test]
fn test_project_wrapper_is_reapplied() {
    let ctx = TestContext::new();
    let source = ctx.source(&[(2, 10), (3, 20), (3, 30)]);
    let agg = ctx.count_sum_agg(source);
    // The subquery exposes only `total := coalesce(s, 0)` above the
    // aggregation.
    let mut assignments = Assignments::new();
    assignments.put(
        Symbol::new("total"),
        Expr::Coalesce(vec![
            Expr::symbol(Symbol::new("s")),
            Expr::literal(Datum::Int64(0)),
        ]),
    );
    let subquery: PlanRef = Project::new(ctx.ids.next(), agg, assignments).into();
    let plan = ctx.lateral(ctx.outer(&[1, 2, 3]), subquery);

    let rewritten = apply_rule(&ctx, &NoLookup, &plan).expect("rule applies");
    check_symbol_hygiene(&rewritten, &NoLookup).expect("no dangling symbols");

    let expected = Relation {
        columns: vec![Symbol::new("k"), Symbol::new("total")],
        rows: vec![
            vec![Datum::Int64(1), Datum::Int64(0)],
            vec![Datum::Int64(2), Datum::Int64(10)],
            vec![Datum::Int64(3), Datum::Int64(50)],
        ],
    };
    assert_eq!(execute(&plan, &NoLookup).unwrap(), expected);
    assert_eq!(execute(&rewritten, &NoLookup).unwrap(), expected);
}

#[test]
fn test_resolves_subquery_through_memo() {
    let ctx = TestContext::new();
    let source = ctx.source(&[(2, 10)]);
    let agg = ctx.count_sum_agg(source);

    let mut memo = Memo::new();
    let subquery = memo.intern(agg, &ctx.ids);
    let plan = ctx.lateral(ctx.outer(&[1, 2]), subquery);

    let rewritten = apply_rule(&ctx, &memo, &plan).expect("rule applies through the memo");
    assert!(rewritten.as_lateral_join().is_none());

    let expected = Relation {
        columns: vec![Symbol::new("k"), Symbol::new("c"), Symbol::new("s")],
        rows: vec![
            vec![Datum::Int64(1), Datum::Int64(0), Datum::Null],
            vec![Datum::Int64(2), Datum::Int64(1), Datum::Int64(10)],
        ],
    };
    assert_eq!(execute(&plan, &memo).unwrap(), expected);
    assert_eq!(execute(&rewritten, &memo).unwrap(), expected);
}

// ---------------------------------------------------------------------
// Not-applicable verdicts.
// ---------------------------------------------------------------------

#[test]
fn test_not_applicable_without_correlation() {
    let ctx = TestContext::new();
    let source = ctx.source(&[(2, 10)]);
    let agg = ctx.count_sum_agg(source);
    let plan: PlanRef = LateralJoin::new(
        ctx.ids.next(),
        ctx.outer(&[1]),
        agg,
        vec![],
        JoinType::Inner,
    )
    .into();

    assert_eq!(apply_rule(&ctx, &NoLookup, &plan), None);
}

#[test]
fn test_not_applicable_for_non_scalar_subquery() {
    let ctx = TestContext::new();
    // Plain correlated rows, no aggregation: more than one row possible.
    let plan = ctx.lateral(ctx.outer(&[1]), ctx.source(&[(1, 10), (1, 20)]));

    assert_eq!(apply_rule(&ctx, &NoLookup, &plan), None);
}

#[test]
fn test_not_applicable_for_grouped_aggregation() {
    let ctx = TestContext::new();
    let grouped: PlanRef = Aggregation::new(
        ctx.ids.next(),
        ctx.source(&[(1, 10)]),
        vec![Symbol::new("x")],
        vec![(Symbol::new("c"), AggCall::count_star())],
    )
    .into();
    // Wrap in a single-row enforcer so the subquery still counts as scalar
    // and the verdict hinges on the grouping keys alone.
    let subquery: PlanRef = EnforceSingleRow::new(ctx.ids.next(), grouped).into();
    let plan = ctx.lateral(ctx.outer(&[1]), subquery);

    assert_eq!(apply_rule(&ctx, &NoLookup, &plan), None);
}

#[test]
fn test_not_applicable_when_join_hides_aggregation() {
    let ctx = TestContext::new();
    let agg = ctx.count_sum_agg(ctx.source(&[(1, 10)]));
    let other = Values::new(
        ctx.ids.next(),
        vec![Symbol::new("y")],
        vec![vec![Datum::Int64(7)]],
    )
    .into_ref();
    // A join is not a transparent wrapper: the aggregation beneath it must
    // not be found, even though the join output is scalar-looking.
    let subquery: PlanRef = EnforceSingleRow::new(
        ctx.ids.next(),
        Join::new(ctx.ids.next(), other, agg, JoinType::Inner, vec![]).into(),
    )
    .into();
    let plan = ctx.lateral(ctx.outer(&[1]), subquery);

    assert_eq!(apply_rule(&ctx, &NoLookup, &plan), None);
}

#[test]
fn test_no_progress_when_correlation_unsatisfiable() {
    let ctx = TestContext::new();
    // The aggregation source does not surface `k` at all, so grouping by
    // the correlation is impossible and the rewrite must not fire.
    let source = Values::new(
        ctx.ids.next(),
        vec![Symbol::new("x")],
        vec![vec![Datum::Int64(10)]],
    )
    .into_ref();
    let agg: PlanRef = Aggregation::new(
        ctx.ids.next(),
        source,
        vec![],
        vec![(Symbol::new("c"), AggCall::count_star())],
    )
    .into();
    let plan = ctx.lateral(ctx.outer(&[1]), agg);

    assert_eq!(apply_rule(&ctx, &NoLookup, &plan), None);
}

#[test]
fn test_retest_is_idempotent_and_consumes_nothing() {
    let ctx = TestContext::new();
    let plan = ctx.lateral(ctx.outer(&[1]), ctx.source(&[(1, 10), (1, 20)]));

    assert_eq!(apply_rule(&ctx, &NoLookup, &plan), None);
    assert_eq!(apply_rule(&ctx, &NoLookup, &plan), None);
    // A not-applicable verdict must not advance the symbol allocator.
    assert_eq!(ctx.symbols.new_symbol("probe").name(), "probe_0");
}

#[test]
fn test_invariant_violation_aborts() {
    let ctx = TestContext::new();
    let agg = ctx.count_sum_agg(ctx.source(&[(1, 10)]));
    // Correlation on a symbol the outer input does not produce.
    let plan: PlanRef = LateralJoin::new(
        ctx.ids.next(),
        ctx.outer(&[1]),
        agg,
        vec![Symbol::new("missing")],
        JoinType::Inner,
    )
    .into();

    let err = ScalarAggToJoinRule {}
        .apply(&plan, &ctx.rule_ctx(&NoLookup))
        .expect_err("dangling correlation symbol is fatal");
    assert_eq!(
        err,
        PlanError::UnresolvedCorrelation {
            symbol: Symbol::new("missing"),
            node: plan.id(),
        }
    );
}

// ---------------------------------------------------------------------
// EnforceSingleRow semantics.
// ---------------------------------------------------------------------

#[test]
fn test_single_row_contract_round_trip() {
    // 0, 1 and 2 matching source rows per outer key, with the single-row
    // check sitting between the lateral join and the aggregation. The
    // aggregation always collapses to one row, so neither plan fails, and
    // both deliver identical results.
    let ctx = TestContext::new();
    let source = ctx.source(&[(2, 10), (3, 20), (3, 30)]);
    let subquery: PlanRef =
        EnforceSingleRow::new(ctx.ids.next(), ctx.count_sum_agg(source)).into();
    let plan = ctx.lateral(ctx.outer(&[1, 2, 3]), subquery);

    let rewritten = apply_rule(&ctx, &NoLookup, &plan).expect("rule applies");
    assert_eq!(
        execute(&plan, &NoLookup).unwrap(),
        execute(&rewritten, &NoLookup).unwrap()
    );
}

#[test]
fn test_single_row_failure_is_preserved() {
    // Without an aggregation under the single-row check the rule must not
    // fire, leaving the runtime failure for the key with two rows intact.
    let ctx = TestContext::new();
    let subquery: PlanRef =
        EnforceSingleRow::new(ctx.ids.next(), ctx.source(&[(1, 10), (1, 20)])).into();
    let plan = ctx.lateral(ctx.outer(&[1]), subquery);

    assert_eq!(apply_rule(&ctx, &NoLookup, &plan), None);
    assert_eq!(
        execute(&plan, &NoLookup).unwrap_err(),
        ExecError::MoreThanOneRow
    );
}

// ---------------------------------------------------------------------
// Driving the rule through the heuristic engine.
// ---------------------------------------------------------------------

#[test]
fn test_fixpoint_applies_once_and_stops() {
    let ctx = TestContext::new();
    let source = ctx.source(&[(2, 10), (3, 20), (3, 30)]);
    let plan = ctx.lateral(ctx.outer(&[1, 2, 3]), ctx.count_sum_agg(source));

    let rules = vec![ScalarAggToJoinRule::create()];
    let mut optimizer =
        HeuristicOptimizer::new(&ApplyOrder::TopDown, &rules, ctx.rule_ctx(&NoLookup));
    let optimized = optimizer
        .optimize_to_fixpoint(plan.clone())
        .expect("optimization succeeds");

    assert!(optimizer.get_stats().has_applied_rule());
    assert_eq!(optimizer.get_stats().total_applied(), 1);
    assert_eq!(
        execute(&plan, &NoLookup).unwrap(),
        execute(&optimized, &NoLookup).unwrap()
    );
}

#[test]
fn test_fixpoint_leaves_unmatched_plans_alone() {
    let ctx = TestContext::new();
    let plan = ctx.lateral(ctx.outer(&[1]), ctx.source(&[(1, 10), (1, 20)]));

    let rules = vec![ScalarAggToJoinRule::create()];
    let mut optimizer =
        HeuristicOptimizer::new(&ApplyOrder::TopDown, &rules, ctx.rule_ctx(&NoLookup));
    let optimized = optimizer
        .optimize_to_fixpoint(plan.clone())
        .expect("optimization succeeds");

    assert!(!optimizer.get_stats().has_applied_rule());
    assert_eq!(
        execute(&plan, &NoLookup).unwrap(),
        execute(&optimized, &NoLookup).unwrap()
    );
}

// ---------------------------------------------------------------------
// Oracle sanity on whole subqueries.
// ---------------------------------------------------------------------

#[test]
fn test_scalar_oracle_matches_rule_verdict() {
    let ctx = TestContext::new();
    let scalar = ctx.count_sum_agg(ctx.source(&[(1, 10)]));
    assert!(is_scalar(&scalar, &NoLookup));

    let not_scalar = ctx.source(&[(1, 10), (1, 20)]);
    assert!(!is_scalar(&not_scalar, &NoLookup));
}
