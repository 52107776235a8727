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
use crate::symbol::Symbol;

/// Join type shared by [`Join`] and
/// [`LateralJoin`](super::LateralJoin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    /// Left outer: every left row is preserved, right columns are
    /// null-padded when no right row matches.
    Left,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "Inner"),
            JoinType::Left => write!(f, "Left"),
        }
    }
}

/// A plain equi-join. Output symbols are the left outputs followed by the
/// right outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    id: PlanNodeId,
    left: PlanRef,
    right: PlanRef,
    join_type: JoinType,
    /// Equality clauses, `(left symbol, right symbol)` each.
    criteria: Vec<(Symbol, Symbol)>,
}

impl Join {
    pub fn new(
        id: PlanNodeId,
        left: PlanRef,
        right: PlanRef,
        join_type: JoinType,
        criteria: Vec<(Symbol, Symbol)>,
    ) -> Self {
        Self {
            id,
            left,
            right,
            join_type,
            criteria,
        }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn left(&self) -> &PlanRef {
        &self.left
    }

    pub fn right(&self) -> &PlanRef {
        &self.right
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn criteria(&self) -> &[(Symbol, Symbol)] {
        &self.criteria
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Join {{ type: {}, on: [{}] }}",
            self.join_type,
            self.criteria
                .iter()
                .format_with(", ", |(l, r), f| f(&format_args!("{} = {}", l, r)))
        )
    }
}
