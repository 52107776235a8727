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
use crate::expr::Datum;
use crate::symbol::Symbol;

/// Aggregate function kinds known to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    ArrayAgg,
    BoolAnd,
    BoolOr,
    /// A user-defined or otherwise unrecognized aggregate.
    Other(String),
}

impl AggKind {
    /// The value an aggregate yields over an empty group.
    ///
    /// Only counting aggregates are defined over an empty group; everything
    /// else yields SQL NULL. Decorrelation splices this value in for outer
    /// rows that have no matching subquery group, so the distinction is per
    /// output column, never uniform. New kinds must take an explicit stance
    /// here rather than fall into a catch-all.
    pub fn default_on_empty_group(&self) -> Datum {
        match self {
            AggKind::Count => Datum::Int64(0),
            AggKind::Sum
            | AggKind::Avg
            | AggKind::Min
            | AggKind::Max
            | AggKind::ArrayAgg
            | AggKind::BoolAnd
            | AggKind::BoolOr
            | AggKind::Other(_) => Datum::Null,
        }
    }
}

impl fmt::Display for AggKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggKind::Count => write!(f, "count"),
            AggKind::Sum => write!(f, "sum"),
            AggKind::Avg => write!(f, "avg"),
            AggKind::Min => write!(f, "min"),
            AggKind::Max => write!(f, "max"),
            AggKind::ArrayAgg => write!(f, "array_agg"),
            AggKind::BoolAnd => write!(f, "bool_and"),
            AggKind::BoolOr => write!(f, "bool_or"),
            AggKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A single aggregate function call.
#[derive(Debug, Clone, PartialEq)]
pub struct AggCall {
    kind: AggKind,
    /// Input symbols; empty for `count(*)`.
    inputs: Vec<Symbol>,
    distinct: bool,
    /// Optional boolean mask symbol: only rows where the mask is true are
    /// accumulated.
    mask: Option<Symbol>,
}

impl AggCall {
    pub fn new(kind: AggKind, inputs: Vec<Symbol>) -> Self {
        Self {
            kind,
            inputs,
            distinct: false,
            mask: None,
        }
    }

    /// `count(*)`.
    pub fn count_star() -> Self {
        Self::new(AggKind::Count, vec![])
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn with_mask(mut self, mask: Symbol) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn kind(&self) -> &AggKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[Symbol] {
        &self.inputs
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn mask(&self) -> Option<&Symbol> {
        self.mask.as_ref()
    }

    /// All input-side symbols this call reads.
    pub fn referenced_symbols(&self) -> Vec<Symbol> {
        let mut symbols = self.inputs.clone();
        symbols.extend(self.mask.clone());
        symbols
    }

    /// The same call reading its inputs through a renaming.
    pub fn map_symbols(&self, mut rename: impl FnMut(&Symbol) -> Symbol) -> Self {
        Self {
            kind: self.kind.clone(),
            inputs: self.inputs.iter().map(&mut rename).collect(),
            distinct: self.distinct,
            mask: self.mask.as_ref().map(&mut rename),
        }
    }
}

impl fmt::Display for AggCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        if self.distinct {
            write!(f, "distinct ")?;
        }
        if self.inputs.is_empty() {
            write!(f, "*")?;
        } else {
            write!(f, "{}", self.inputs.iter().format(", "))?;
        }
        write!(f, ")")?;
        if let Some(mask) = &self.mask {
            write!(f, " filter {}", mask)?;
        }
        Ok(())
    }
}

/// Grouped or global aggregation.
///
/// An empty `group_keys` set means a global scalar aggregate: exactly one
/// output row over the whole input, even an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    id: PlanNodeId,
    input: PlanRef,
    group_keys: Vec<Symbol>,
    /// Output symbol and the call producing it, in output order after the
    /// group keys.
    aggregates: Vec<(Symbol, AggCall)>,
}

impl Aggregation {
    pub fn new(
        id: PlanNodeId,
        input: PlanRef,
        group_keys: Vec<Symbol>,
        aggregates: Vec<(Symbol, AggCall)>,
    ) -> Self {
        Self {
            id,
            input,
            group_keys,
            aggregates,
        }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn input(&self) -> &PlanRef {
        &self.input
    }

    pub fn group_keys(&self) -> &[Symbol] {
        &self.group_keys
    }

    pub fn aggregates(&self) -> &[(Symbol, AggCall)] {
        &self.aggregates
    }

    /// Group keys first, then aggregate outputs.
    pub fn output_symbols(&self) -> Vec<Symbol> {
        let mut symbols = self.group_keys.clone();
        symbols.extend(self.aggregates.iter().map(|(symbol, _)| symbol.clone()));
        symbols
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Aggregation {{ group_keys: [{}], aggregates: [{}] }}",
            self.group_keys.iter().format(", "),
            self.aggregates
                .iter()
                .format_with(", ", |(symbol, call), f| {
                    f(&format_args!("{} := {}", symbol, call))
                })
        )
    }
}
