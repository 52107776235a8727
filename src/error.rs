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

use thiserror::Error;

use crate::optimizer::plan_node::PlanNodeId;
use crate::symbol::Symbol;

/// Fatal planning errors.
///
/// A rule that does not match reports `Ok(None)`, never an error. Every
/// variant here is an invariant violation that aborts the whole planning
/// pass; no rule may catch or mask it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("correlation symbol `{symbol}` is not produced by the outer input of lateral join {node}")]
    UnresolvedCorrelation { symbol: Symbol, node: PlanNodeId },

    #[error("grouping key `{symbol}` is not produced by the input of aggregation {node}")]
    UnresolvedGroupingKey { symbol: Symbol, node: PlanNodeId },

    #[error("symbol `{symbol}` referenced by plan node {node} is not produced by its inputs")]
    DanglingSymbol { symbol: Symbol, node: PlanNodeId },
}

pub type Result<T, E = PlanError> = std::result::Result<T, E>;
