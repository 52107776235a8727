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

/// Runtime assertion that its input produces at most one row.
///
/// The check is not evaluated at planning time: it stays in the plan and
/// fails the query at execution time when violated, naming the offending
/// scalar subquery. On an empty input it emits a single null-padded row,
/// matching scalar-subquery semantics. Structurally transparent for plan
/// search, and scalar by construction for the cardinality oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct EnforceSingleRow {
    id: PlanNodeId,
    input: PlanRef,
}

impl EnforceSingleRow {
    pub fn new(id: PlanNodeId, input: PlanRef) -> Self {
        Self { id, input }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn input(&self) -> &PlanRef {
        &self.input
    }
}

impl fmt::Display for EnforceSingleRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnforceSingleRow")
    }
}
