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

use super::{PlanNodeId, PlanRef};
use crate::expr::Datum;
use crate::symbol::Symbol;

/// A leaf relation with literal rows.
///
/// This is the plan tree's opaque "other" node as far as the rewrite rules
/// are concerned: the searcher never descends into it and the cardinality
/// oracle only trusts it when it holds at most one row.
#[derive(Debug, Clone, PartialEq)]
pub struct Values {
    id: PlanNodeId,
    symbols: Vec<Symbol>,
    rows: Vec<Vec<Datum>>,
}

impl Values {
    /// Creates a literal relation. Every row must have one datum per
    /// declared symbol.
    pub fn new(id: PlanNodeId, symbols: Vec<Symbol>, rows: Vec<Vec<Datum>>) -> Self {
        for row in &rows {
            assert_eq!(
                row.len(),
                symbols.len(),
                "values row width must match the declared symbols"
            );
        }
        Self { id, symbols, rows }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn rows(&self) -> &[Vec<Datum>] {
        &self.rows
    }

    pub fn into_ref(self) -> PlanRef {
        self.into()
    }
}

impl fmt::Display for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Values {{ rows: {} }}", self.rows.len())
    }
}
