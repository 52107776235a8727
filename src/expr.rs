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

//! Scalar expressions carried by `Project` assignments.
//!
//! The rewrite core only needs symbol references, literals and `coalesce`
//! (for splicing default-on-empty-group values into a rewritten plan), so
//! the expression language is deliberately this small.

use std::collections::BTreeSet;
use std::fmt;

use enum_as_inner::EnumAsInner;
use itertools::Itertools;

use crate::symbol::Symbol;

/// A constant value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumAsInner)]
pub enum Datum {
    Null,
    Bool(bool),
    Int64(i64),
    Text(String),
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "null"),
            Datum::Bool(v) => write!(f, "{}", v),
            Datum::Int64(v) => write!(f, "{}", v),
            Datum::Text(v) => write!(f, "'{}'", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, EnumAsInner)]
pub enum Expr {
    /// Reference to a column of the input relation.
    SymbolRef(Symbol),
    Literal(Datum),
    /// First non-null argument, null if all arguments are null.
    Coalesce(Vec<Expr>),
}

impl Expr {
    pub fn symbol(symbol: Symbol) -> Self {
        Expr::SymbolRef(symbol)
    }

    pub fn literal(datum: Datum) -> Self {
        Expr::Literal(datum)
    }

    /// All symbols this expression reads from its input.
    pub fn referenced_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, symbols: &mut BTreeSet<Symbol>) {
        match self {
            Expr::SymbolRef(symbol) => {
                symbols.insert(symbol.clone());
            }
            Expr::Literal(_) => {}
            Expr::Coalesce(args) => {
                for arg in args {
                    arg.collect_symbols(symbols);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::SymbolRef(symbol) => write!(f, "{}", symbol),
            Expr::Literal(datum) => write!(f, "{}", datum),
            Expr::Coalesce(args) => {
                write!(f, "coalesce({})", args.iter().format(", "))
            }
        }
    }
}
