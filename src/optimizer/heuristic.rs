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

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use tracing::debug;

use crate::error::Result;
use crate::optimizer::rule::{BoxedRule, RuleContext};
use crate::optimizer::PlanRef;

/// Traverse order of [`HeuristicOptimizer`].
pub enum ApplyOrder {
    TopDown,
    BottomUp,
}

/// A rule-based heuristic optimizer, which traverses every plan node and
/// tries to apply each rule on it.
///
/// Rewritten nodes are substituted in place and re-tested on the next
/// pass; [`optimize_to_fixpoint`](Self::optimize_to_fixpoint) repeats
/// whole passes until one applies no rule. Termination relies on every
/// rule rejecting no-progress rewrites, not on an iteration cap.
pub struct HeuristicOptimizer<'a> {
    apply_order: &'a ApplyOrder,
    rules: &'a [BoxedRule],
    ctx: RuleContext<'a>,
    stats: Stats,
}

impl<'a> HeuristicOptimizer<'a> {
    pub fn new(apply_order: &'a ApplyOrder, rules: &'a [BoxedRule], ctx: RuleContext<'a>) -> Self {
        Self {
            apply_order,
            rules,
            ctx,
            stats: Stats::new(),
        }
    }

    fn optimize_node(&mut self, mut plan: PlanRef) -> Result<PlanRef> {
        for rule in self.rules {
            if !rule.pattern().matches(&plan) {
                continue;
            }
            if let Some(applied) = rule.apply(&plan, &self.ctx)? {
                #[cfg(debug_assertions)]
                self.check_equivalent_plan(rule, &plan, &applied);

                debug!(rule = rule.description(), node = %plan.id(), "rule applied");
                plan = applied;
                self.stats.count_rule(rule);
            }
        }
        Ok(plan)
    }

    fn optimize_inputs(&mut self, plan: PlanRef) -> Result<PlanRef> {
        let inputs: Vec<_> = plan
            .inputs()
            .into_iter()
            .map(|sub_tree| self.optimize(sub_tree))
            .try_collect()?;
        Ok(plan.clone_with_inputs(&inputs).into())
    }

    /// A single traversal pass.
    pub fn optimize(&mut self, mut plan: PlanRef) -> Result<PlanRef> {
        match self.apply_order {
            ApplyOrder::TopDown => {
                plan = self.optimize_node(plan)?;
                self.optimize_inputs(plan)
            }
            ApplyOrder::BottomUp => {
                plan = self.optimize_inputs(plan)?;
                self.optimize_node(plan)
            }
        }
    }

    /// Repeats passes until one applies no rule.
    pub fn optimize_to_fixpoint(&mut self, mut plan: PlanRef) -> Result<PlanRef> {
        loop {
            let applied_before = self.stats.total_applied();
            plan = self.optimize(plan)?;
            if self.stats.total_applied() == applied_before {
                return Ok(plan);
            }
        }
    }

    pub fn get_stats(&self) -> &Stats {
        &self.stats
    }

    /// A rule must keep the output relation intact and must not leave
    /// dangling symbol references behind.
    #[cfg(debug_assertions)]
    fn check_equivalent_plan(&self, rule: &BoxedRule, input_plan: &PlanRef, output_plan: &PlanRef) {
        let before = input_plan.output_symbols(self.ctx.lookup);
        let after = output_plan.output_symbols(self.ctx.lookup);
        if before != after {
            panic!(
                "{} changed the output symbols.\nInput plan:\n{}Output plan:\n{}",
                rule.description(),
                input_plan.explain_to_string(),
                output_plan.explain_to_string(),
            );
        }
        if let Err(error) =
            crate::optimizer::plan_node::check_symbol_hygiene(output_plan, self.ctx.lookup)
        {
            panic!(
                "{} produced a plan with dangling symbols: {}\nOutput plan:\n{}",
                rule.description(),
                error,
                output_plan.explain_to_string(),
            );
        }
    }
}

pub struct Stats {
    rule_counter: HashMap<String, u32>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            rule_counter: HashMap::new(),
        }
    }

    pub fn count_rule(&mut self, rule: &BoxedRule) {
        match self.rule_counter.entry(rule.description().to_string()) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += 1;
            }
            Entry::Vacant(entry) => {
                entry.insert(1);
            }
        }
    }

    pub fn has_applied_rule(&self) -> bool {
        !self.rule_counter.is_empty()
    }

    pub fn total_applied(&self) -> u32 {
        self.rule_counter.values().sum()
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rule, count) in &self.rule_counter {
            writeln!(f, "apply {} {} time(s)", rule, count)?;
        }
        Ok(())
    }
}
