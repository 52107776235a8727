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

use itertools::Itertools;

use super::{PlanNodeId, PlanRef};
use crate::expr::Expr;
use crate::symbol::Symbol;

/// Ordered `output symbol -> expression` map of a [`Project`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignments {
    entries: Vec<(Symbol, Expr)>,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity assignments for `symbols`, in order.
    pub fn identity(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut assignments = Self::new();
        for symbol in symbols {
            assignments.put_identity(symbol);
        }
        assignments
    }

    pub fn put(&mut self, symbol: Symbol, expr: Expr) -> &mut Self {
        self.entries.push((symbol, expr));
        self
    }

    /// `symbol := symbol`, a plain pass-through column.
    pub fn put_identity(&mut self, symbol: Symbol) -> &mut Self {
        let expr = Expr::symbol(symbol.clone());
        self.put(symbol, expr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Symbol, Expr)> {
        self.entries.iter()
    }

    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.entries
            .iter()
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Symbol, Expr)> for Assignments {
    fn from_iter<T: IntoIterator<Item = (Symbol, Expr)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Per-row expression evaluation over a single input.
///
/// Structurally transparent for plan search: a `Project` never changes the
/// number of rows flowing through it.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    id: PlanNodeId,
    input: PlanRef,
    assignments: Assignments,
}

impl Project {
    pub fn new(id: PlanNodeId, input: PlanRef, assignments: Assignments) -> Self {
        Self {
            id,
            input,
            assignments,
        }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn input(&self) -> &PlanRef {
        &self.input
    }

    pub fn assignments(&self) -> &Assignments {
        &self.assignments
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Project {{ exprs: [{}] }}",
            self.assignments
                .iter()
                .format_with(", ", |(symbol, expr), f| {
                    f(&format_args!("{} := {}", symbol, expr))
                })
        )
    }
}
