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

use super::{JoinType, PlanNodeId, PlanRef};
use crate::symbol::Symbol;

/// A correlated (lateral/apply) join: the subquery on the right side may
/// reference columns of the current outer row.
///
/// `correlation` is the set of outer symbols visible inside the subquery.
/// An empty correlation means the subquery is in fact uncorrelated; such
/// joins are handled by other rules, not by decorrelation.
#[derive(Debug, Clone, PartialEq)]
pub struct LateralJoin {
    id: PlanNodeId,
    input: PlanRef,
    subquery: PlanRef,
    correlation: Vec<Symbol>,
    join_type: JoinType,
}

impl LateralJoin {
    pub fn new(
        id: PlanNodeId,
        input: PlanRef,
        subquery: PlanRef,
        correlation: Vec<Symbol>,
        join_type: JoinType,
    ) -> Self {
        Self {
            id,
            input,
            subquery,
            correlation,
            join_type,
        }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    /// The outer input.
    pub fn input(&self) -> &PlanRef {
        &self.input
    }

    /// The correlated subquery, possibly behind a memo reference.
    pub fn subquery(&self) -> &PlanRef {
        &self.subquery
    }

    pub fn correlation(&self) -> &[Symbol] {
        &self.correlation
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }
}

impl fmt::Display for LateralJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LateralJoin {{ type: {}, correlation: [{}] }}",
            self.join_type,
            self.correlation.iter().format(", ")
        )
    }
}
