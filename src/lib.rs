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

//! Rule-based rewrite core of a SQL query planner.
//!
//! The crate provides an immutable plan-tree model, a memo-aware node
//! resolution layer, a bounded plan-tree searcher, and the rule that
//! decorrelates a correlated scalar aggregate into a plain join. Rules are
//! pure functions over the plan tree; the only mutable state is the pair of
//! allocators owned by a single planning session.

pub mod error;
pub mod expr;
pub mod optimizer;
pub mod session;
pub mod symbol;

pub use error::{PlanError, Result};
pub use optimizer::PlanRef;
